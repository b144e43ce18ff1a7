//! 文本标记创建变体（高亮/下划线/波浪线/删除线/遮盖）
//!
//! 拖选一段文本区域后落成标记批注。文本选区简化为矩形跨度。

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
pub enum MarkupKind {
    Highlight,
    Underline,
    Squiggly,
    Strikeout,
    Redaction,
}

impl MarkupKind {
    pub fn annot_kind(self) -> AnnotKind {
        match self {
            MarkupKind::Highlight => AnnotKind::Highlight,
            MarkupKind::Underline => AnnotKind::Underline,
            MarkupKind::Squiggly => AnnotKind::Squiggly,
            MarkupKind::Strikeout => AnnotKind::StrikeOut,
            MarkupKind::Redaction => AnnotKind::Redact,
        }
    }
}

pub struct TextMarkupCreate {
    common: ToolCommon,
    markup: MarkupKind,
    anchor: Option<(PageIndex, Pt)>,
    cur: Option<Pt>,
}

impl TextMarkupCreate {
    pub fn new(mode: ModeId, markup: MarkupKind, tc: TransitionContext, continuous: bool) -> Self {
        let mut common = ToolCommon::from_transition(mode, &tc);
        common.force_same_next_mode = common.force_same_next_mode || continuous;
        common.default_mode = mode;
        Self {
            common,
            markup,
            anchor: None,
            cur: None,
        }
    }
}

impl ToolVariant for TextMarkupCreate {
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
        if start.distance(end) < ctx.config.min_shape_size {
            return EventResult::Consumed;
        }

        // 行高近似：跨度矩形至少有一行字高
        let mut rect = Rect::from_points(start, end);
        if rect.height() < 12.0 {
            rect.y2 = rect.y1 + 12.0;
        }

        let kind = self.markup.annot_kind();
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
                error!(error = %e, "text markup creation failed");
                drop(doc);
                ctx.raise_annotations_could_not_be_added(&e.to_string());
                self.common.next_mode = ModeId::NEUTRAL;
                EventResult::Ignored
            }
        }
    }

    fn on_key_up(&mut self, _ctx: &mut ToolCtx, key: KeyInput) -> EventResult {
        if key.key == Key::Escape {
            self.anchor = None;
            self.cur = None;
            self.common.next_mode = ModeId::NEUTRAL;
            return EventResult::Consumed;
        }
        EventResult::Ignored
    }
}
