//! 形状创建变体
//!
//! 线/箭头/标尺/矩形/椭圆/折线/多边形/云线/墨迹共用一套拖拽创建流程，
//! 形状种类作为参数，差异收敛在 `ShapeKind` 上。

use tracing::error;

use crate::core::event::{EventResult, Key, KeyInput, PriorEventMode};
use crate::core::geometry::{PageIndex, Pt, Rect};
use crate::models::annot::{Annot, AnnotBatch, AnnotKind};

use super::super::context::ToolCtx;
use super::super::effect::Effect;
use super::super::mode::ModeId;
use super::super::state::{ToolCommon, TransitionContext};
use super::super::tool::ToolVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Line,
    Arrow,
    Ruler,
    Rect,
    Oval,
    Polyline,
    Polygon,
    Cloud,
    Ink,
}

impl ShapeKind {
    pub fn annot_kind(self) -> AnnotKind {
        match self {
            ShapeKind::Line | ShapeKind::Arrow | ShapeKind::Ruler => AnnotKind::Line,
            ShapeKind::Rect => AnnotKind::Square,
            ShapeKind::Oval => AnnotKind::Circle,
            ShapeKind::Polyline => AnnotKind::Polyline,
            ShapeKind::Polygon => AnnotKind::Polygon,
            ShapeKind::Cloud => AnnotKind::Cloud,
            ShapeKind::Ink => AnnotKind::Ink,
        }
    }

    /// Thin shapes are legitimate for stroke-like kinds.
    fn is_stroke(self) -> bool {
        matches!(
            self,
            ShapeKind::Line | ShapeKind::Arrow | ShapeKind::Ruler | ShapeKind::Ink
        )
    }
}

pub struct ShapeCreate {
    common: ToolCommon,
    shape: ShapeKind,
    anchor: Option<(PageIndex, Pt)>,
    cur: Option<Pt>,
}

impl ShapeCreate {
    pub fn new(mode: ModeId, shape: ShapeKind, tc: TransitionContext, continuous: bool) -> Self {
        let mut common = ToolCommon::from_transition(mode, &tc);
        common.force_same_next_mode = common.force_same_next_mode || continuous;
        // 选中创建工具即更新"当前默认工具"：编辑态放开手势后回到这里
        common.default_mode = mode;
        Self {
            common,
            shape,
            anchor: None,
            cur: None,
        }
    }
}

impl ToolVariant for ShapeCreate {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }

    fn is_creating_annotation(&self) -> bool {
        self.anchor.is_some()
    }

    fn on_down(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        // 新手势开始，上一次创建的重放守卫作废
        self.common.creation_event_raised = false;
        let doc = ctx.doc.read();
        let Some((page, pt)) = ctx.viewport.screen_to_page(&doc, at) else {
            return EventResult::Ignored;
        };
        self.anchor = Some((page, pt));
        self.cur = Some(pt);
        EventResult::Consumed
    }

    fn on_move(&mut self, ctx: &mut ToolCtx, _from: Pt, to: Pt) -> EventResult {
        let Some((page, _)) = self.anchor else {
            return EventResult::Ignored;
        };
        let doc = ctx.doc.read();
        if let Some((p, pt)) = ctx.viewport.screen_to_page(&doc, to) {
            if p == page {
                self.cur = Some(pt);
            }
        }
        drop(doc);
        ctx.push_effect(Effect::Invalidate);
        EventResult::Consumed
    }

    fn on_up(&mut self, ctx: &mut ToolCtx, _at: Pt, _prior: PriorEventMode) -> EventResult {
        let Some((page, start)) = self.anchor.take() else {
            return EventResult::Ignored;
        };
        let end = self.cur.take().unwrap_or(start);

        let min = ctx.config.min_shape_size;
        let too_small = if self.shape.is_stroke() {
            start.distance(end) < min
        } else {
            let r = Rect::from_points(start, end);
            r.width() < min || r.height() < min
        };
        if too_small {
            return EventResult::Consumed;
        }

        let mut rect = Rect::from_points(start, end);
        if self.shape.is_stroke() {
            // 笔画类保留最小包围盒即可
            if rect.width() < 1.0 {
                rect.x2 = rect.x1 + 1.0;
            }
            if rect.height() < 1.0 {
                rect.y2 = rect.y1 + 1.0;
            }
        }

        let kind = self.shape.annot_kind();
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
                error!(error = %e, "shape creation failed");
                drop(doc);
                ctx.raise_annotations_could_not_be_added(&e.to_string());
                self.common.next_mode = ModeId::NEUTRAL;
                EventResult::Ignored
            }
        }
    }

    fn on_key_up(&mut self, _ctx: &mut ToolCtx, key: KeyInput) -> EventResult {
        match key.key {
            Key::Escape if self.anchor.is_some() => {
                self.anchor = None;
                self.cur = None;
                EventResult::Consumed
            }
            Key::Escape => {
                self.common.next_mode = ModeId::NEUTRAL;
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }
}
