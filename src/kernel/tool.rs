//! Tool variant contract: one handler implementation per mode.
//!
//! Every handler may read/mutate the shared tool state, perform document
//! mutations through the raise helpers on [`ToolCtx`], push effects, and
//! request the next mode by writing `common_mut().next_mode`. The default
//! for every event is "stay in the current mode, event not consumed".

use crate::core::event::{EventResult, KeyInput, PriorEventMode};
use crate::core::geometry::Pt;

use super::context::ToolCtx;
use super::mode::ModeId;
use super::state::{ToolCommon, TransitionContext};

pub trait ToolVariant {
    fn common(&self) -> &ToolCommon;
    fn common_mut(&mut self) -> &mut ToolCommon;

    fn mode(&self) -> ModeId {
        self.common().mode
    }

    fn requested_next_mode(&self) -> ModeId {
        self.common().next_mode
    }

    /// True while the variant is mid-way through creating an annotation.
    fn is_creating_annotation(&self) -> bool {
        false
    }

    // ==================== lifecycle ====================

    fn on_create(&mut self, _ctx: &mut ToolCtx) {}

    /// Called exactly once when the dispatcher lets go of the variant.
    /// A closed variant never receives further events.
    fn on_close(&mut self, _ctx: &mut ToolCtx) {}

    // ==================== events ====================

    fn on_down(&mut self, _ctx: &mut ToolCtx, _at: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_move(&mut self, _ctx: &mut ToolCtx, _from: Pt, _to: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_up(&mut self, _ctx: &mut ToolCtx, _at: Pt, _prior: PriorEventMode) -> EventResult {
        EventResult::Ignored
    }

    fn on_long_press(&mut self, _ctx: &mut ToolCtx, _at: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_scale_begin(&mut self, _ctx: &mut ToolCtx, _focus: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_scale(&mut self, _ctx: &mut ToolCtx, _focus: Pt, _factor: f64) -> EventResult {
        EventResult::Ignored
    }

    fn on_scale_end(&mut self, _ctx: &mut ToolCtx, _focus: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_fling_stop(&mut self, _ctx: &mut ToolCtx) -> EventResult {
        EventResult::Ignored
    }

    fn on_double_tap_begin(&mut self, _ctx: &mut ToolCtx, _at: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_double_tap_event(&mut self, _ctx: &mut ToolCtx, _at: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_double_tap_end(&mut self, _ctx: &mut ToolCtx, _at: Pt) -> EventResult {
        EventResult::Ignored
    }

    fn on_key_up(&mut self, _ctx: &mut ToolCtx, _key: KeyInput) -> EventResult {
        EventResult::Ignored
    }

    fn on_scroll_changed(&mut self, _ctx: &mut ToolCtx, _left: f64, _top: f64) -> EventResult {
        EventResult::Ignored
    }

    fn on_layout(&mut self, _ctx: &mut ToolCtx, _changed: bool) -> EventResult {
        EventResult::Ignored
    }

    fn on_custom_event(&mut self, _ctx: &mut ToolCtx, _tag: &str) -> EventResult {
        EventResult::Ignored
    }
}

/// Minimal no-op variant; what the registry falls back to when everything
/// else goes wrong.
pub struct NullTool {
    common: ToolCommon,
}

impl NullTool {
    pub fn new(mode: ModeId, tc: &TransitionContext) -> Self {
        Self {
            common: ToolCommon::from_transition(mode, tc),
        }
    }
}

impl ToolVariant for NullTool {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }
}
