//! 墨迹橡皮变体
//!
//! 按下到抬起之间扫过的墨迹批注整条删除；抬起后回到中性模式时，
//! 调度器会带上"吞掉下一次点按"的提示，避免刚擦完又选中别的批注。

use tracing::error;

use crate::core::event::{EventResult, PriorEventMode};
use crate::core::geometry::{PageIndex, Pt};
use crate::models::annot::{AnnotBatch, AnnotId, AnnotKind};

use super::super::context::ToolCtx;
use super::super::effect::Effect;
use super::super::mode::ModeId;
use super::super::state::{ToolCommon, TransitionContext};
use super::super::tool::ToolVariant;

pub struct Eraser {
    common: ToolCommon,
    stroke_active: bool,
    hits: Vec<(AnnotId, PageIndex)>,
}

impl Eraser {
    pub fn new(mode: ModeId, tc: TransitionContext, continuous: bool) -> Self {
        let mut common = ToolCommon::from_transition(mode, &tc);
        common.force_same_next_mode = common.force_same_next_mode || continuous;
        common.default_mode = mode;
        Self {
            common,
            stroke_active: false,
            hits: Vec::new(),
        }
    }

    /// Collects every ink annotation within the eraser radius of the
    /// touch point.
    fn collect_hit(&mut self, ctx: &ToolCtx, at: Pt) {
        let doc = ctx.doc.read();
        let Some((page, pt)) = ctx.viewport.screen_to_page(&doc, at) else {
            return;
        };
        let Some(p) = doc.page(page) else {
            return;
        };
        // 橡皮半径是屏幕尺寸，换算进页面坐标
        let reach = ctx.config.eraser_radius / ctx.viewport.scale();
        for &id in p.annots() {
            if self.hits.iter().any(|(h, _)| *h == id) {
                continue;
            }
            let is_ink = doc.annot(id).is_some_and(|a| a.kind == AnnotKind::Ink);
            if !is_ink {
                continue;
            }
            if let Some(rect) = doc.annot_rect(id) {
                if rect.inset(-reach).contains(pt) {
                    self.hits.push((id, page));
                }
            }
        }
    }
}

impl ToolVariant for Eraser {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }

    fn on_down(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        self.stroke_active = true;
        self.hits.clear();
        self.collect_hit(ctx, at);
        EventResult::Consumed
    }

    fn on_move(&mut self, ctx: &mut ToolCtx, _from: Pt, to: Pt) -> EventResult {
        if !self.stroke_active {
            return EventResult::Ignored;
        }
        self.collect_hit(ctx, to);
        ctx.push_effect(Effect::Invalidate);
        EventResult::Consumed
    }

    fn on_up(&mut self, ctx: &mut ToolCtx, _at: Pt, _prior: PriorEventMode) -> EventResult {
        if !std::mem::take(&mut self.stroke_active) {
            return EventResult::Ignored;
        }
        if !self.hits.is_empty() {
            let batch: AnnotBatch = self.hits.drain(..).collect();
            let mut doc = ctx.doc.write();
            ctx.raise_annotations_pre_remove(&doc, &batch);
            let mut removed_any = false;
            for (id, _) in batch.iter() {
                match doc.remove_annot(id) {
                    Ok(()) => removed_any = true,
                    Err(e) => error!(error = %e, "eraser failed to remove stroke"),
                }
            }
            if removed_any {
                ctx.raise_annotations_removed(&mut doc, &batch);
            }
            drop(doc);
            ctx.push_effect(Effect::Invalidate);
        }
        if !self.common.force_same_next_mode {
            self.common.next_mode = ModeId::NEUTRAL;
        }
        EventResult::Consumed
    }
}
