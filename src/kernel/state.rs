//! 工具状态与切换上下文
//!
//! 模式切换时不是整包拷贝状态，而是把一个固定的、强类型的字段子集
//! 显式搬进新变体（`TransitionContext`）。原型实现里这是一堆散落的
//! 逐字段赋值，这里收敛成一个值，构造新变体时一次性传入。

use crate::core::geometry::{PageIndex, Rect};
use crate::models::annot::AnnotId;

use super::mode::ModeId;

/// Opaque handle to a platform view attached to the selected annotation
/// (e.g. an inline editor overlay). The kernel only carries it across
/// transitions; it never dereferences it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotViewHandle(pub u64);

/// Shared per-variant state. Every tool variant embeds one.
#[derive(Debug, Clone)]
pub struct ToolCommon {
    pub mode: ModeId,
    pub next_mode: ModeId,
    pub annot: Option<AnnotId>,
    /// 0 when no selection.
    pub annot_page: PageIndex,
    /// Page-space bounding box of the selection.
    pub annot_bbox: Rect,
    /// False for locked annotations: they can be selected and inspected,
    /// never moved, resized or deleted.
    pub annot_can_edit: bool,
    /// The mode to fall back to when this variant lets go of the gesture.
    pub default_mode: ModeId,
    /// Continuous-annotation mode: creation variants stay in their mode
    /// after a release instead of switching to the editor.
    pub force_same_next_mode: bool,
    /// Only meaningful while `force_same_next_mode` is set.
    pub stylus_used: bool,
    /// One-shot latch: drop the next long-press instead of acting on it.
    pub avoid_long_press: bool,
    pub annot_view: Option<AnnotViewHandle>,
    /// One-shot guard against re-raising creation notifications when the
    /// same release event is replayed into the incoming editor variant.
    pub creation_event_raised: bool,
}

impl ToolCommon {
    pub fn from_transition(mode: ModeId, tc: &TransitionContext) -> Self {
        Self {
            mode,
            next_mode: mode,
            annot: tc.annot,
            annot_page: tc.annot_page,
            annot_bbox: tc.annot_bbox,
            annot_can_edit: tc.annot_can_edit,
            default_mode: tc.default_mode,
            force_same_next_mode: tc.force_same_next_mode,
            stylus_used: tc.stylus_used,
            avoid_long_press: tc.avoid_long_press,
            annot_view: tc.annot_view,
            creation_event_raised: tc.creation_event_raised,
        }
    }

    pub fn has_selection(&self) -> bool {
        self.annot.is_some()
    }

    pub fn clear_selection(&mut self) {
        self.annot = None;
        self.annot_page = 0;
        self.annot_bbox = Rect::default();
        self.annot_can_edit = true;
        self.annot_view = None;
    }

    /// Consumes the one-shot creation guard.
    pub fn take_creation_event_raised(&mut self) -> bool {
        std::mem::take(&mut self.creation_event_raised)
    }
}

/// The exhaustively-typed carry-over value copied from the outgoing variant
/// into the incoming one on every mode switch.
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub from_mode: ModeId,
    pub annot: Option<AnnotId>,
    pub annot_page: PageIndex,
    pub annot_bbox: Rect,
    pub annot_can_edit: bool,
    pub default_mode: ModeId,
    pub force_same_next_mode: bool,
    pub stylus_used: bool,
    pub avoid_long_press: bool,
    pub annot_view: Option<AnnotViewHandle>,
    pub creation_event_raised: bool,
    // 模式对专属的一次性提示
    /// Sticky-note creation → editor: open the note dialog, skip the menu.
    pub up_from_sticky_create: bool,
    /// Free-text/callout creation → editor: same dialog shortcut.
    pub up_from_free_text_create: bool,
    /// Eraser → neutral: swallow the next tap so it does not re-select.
    pub suppress_next_tap: bool,
}

impl TransitionContext {
    /// Blank context for the very first (default) variant.
    pub fn initial() -> Self {
        Self {
            from_mode: ModeId::NEUTRAL,
            annot: None,
            annot_page: 0,
            annot_bbox: Rect::default(),
            annot_can_edit: true,
            default_mode: ModeId::NEUTRAL,
            force_same_next_mode: false,
            stylus_used: false,
            avoid_long_press: false,
            annot_view: None,
            creation_event_raised: false,
            up_from_sticky_create: false,
            up_from_free_text_create: false,
            suppress_next_tap: false,
        }
    }

    /// Captures the fixed carry-over subset from the outgoing variant.
    /// The target mode decides two details (original behavior): the
    /// continuous-annotation default resets when entering the neutral mode,
    /// and the stylus flag only survives in continuous mode.
    pub fn capture(outgoing: &ToolCommon, target: ModeId) -> Self {
        Self {
            from_mode: outgoing.mode,
            annot: outgoing.annot,
            annot_page: outgoing.annot_page,
            annot_bbox: outgoing.annot_bbox,
            annot_can_edit: outgoing.annot_can_edit,
            default_mode: if target == ModeId::NEUTRAL {
                ModeId::NEUTRAL
            } else {
                outgoing.default_mode
            },
            force_same_next_mode: outgoing.force_same_next_mode,
            stylus_used: outgoing.force_same_next_mode && outgoing.stylus_used,
            avoid_long_press: outgoing.avoid_long_press,
            annot_view: outgoing.annot_view,
            creation_event_raised: outgoing.creation_event_raised,
            up_from_sticky_create: false,
            up_from_free_text_create: false,
            suppress_next_tap: false,
        }
    }

    pub fn with_selection(mut self, annot: AnnotId, page: PageIndex, bbox: Rect) -> Self {
        self.annot = Some(annot);
        self.annot_page = page;
        self.annot_bbox = bbox;
        self
    }

    pub fn clear_selection(&mut self) {
        self.annot = None;
        self.annot_page = 0;
        self.annot_bbox = Rect::default();
        self.annot_can_edit = true;
        self.annot_view = None;
    }
}
