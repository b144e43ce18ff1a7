//! 自由文本/标注框创建变体
//!
//! 与便签同一节奏：点击落框，进编辑态直接开编辑对话框。

use tracing::error;

use crate::core::event::{EventResult, PriorEventMode};
use crate::core::geometry::{Pt, Rect};
use crate::models::annot::{Annot, AnnotBatch, AnnotKind};

use super::super::context::ToolCtx;
use super::super::effect::Effect;
use super::super::mode::ModeId;
use super::super::state::{ToolCommon, TransitionContext};
use super::super::tool::ToolVariant;

pub struct FreeTextCreate {
    common: ToolCommon,
    callout: bool,
    pressed: bool,
}

impl FreeTextCreate {
    pub fn new(mode: ModeId, callout: bool, tc: TransitionContext, continuous: bool) -> Self {
        let mut common = ToolCommon::from_transition(mode, &tc);
        common.force_same_next_mode = common.force_same_next_mode || continuous;
        common.default_mode = mode;
        Self {
            common,
            callout,
            pressed: false,
        }
    }
}

impl ToolVariant for FreeTextCreate {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }

    fn is_creating_annotation(&self) -> bool {
        self.pressed
    }

    fn on_down(&mut self, _ctx: &mut ToolCtx, _at: Pt) -> EventResult {
        self.common.creation_event_raised = false;
        self.pressed = true;
        EventResult::Consumed
    }

    fn on_up(&mut self, ctx: &mut ToolCtx, at: Pt, _prior: PriorEventMode) -> EventResult {
        if !std::mem::take(&mut self.pressed) {
            return EventResult::Ignored;
        }
        let target = {
            let doc = ctx.doc.read();
            ctx.viewport.screen_to_page(&doc, at)
        };
        let Some((page, pt)) = target else {
            return EventResult::Ignored;
        };

        let kind = if self.callout {
            AnnotKind::Callout
        } else {
            AnnotKind::FreeText
        };
        let rect = Rect::new(
            pt.x,
            pt.y,
            pt.x + ctx.config.free_text_width,
            pt.y + ctx.config.free_text_height,
        );

        let mut doc = ctx.doc.write();
        match doc.add_annot(page, Annot::new(kind, rect)) {
            Ok(id) => {
                let batch = AnnotBatch::single(id, page);
                ctx.raise_annotations_added(&mut doc, &batch);
                drop(doc);

                self.common.annot = Some(id);
                self.common.annot_page = page;
                self.common.annot_bbox = rect;
                self.common.creation_event_raised = true;
                ctx.push_effect(Effect::Invalidate);

                if !self.common.force_same_next_mode {
                    self.common.next_mode = ModeId::Builtin(ctx.config.handler_mode(kind));
                }
                EventResult::Consumed
            }
            Err(e) => {
                error!(error = %e, "free text creation failed");
                drop(doc);
                ctx.raise_annotations_could_not_be_added(&e.to_string());
                self.common.next_mode = ModeId::NEUTRAL;
                EventResult::Ignored
            }
        }
    }
}
