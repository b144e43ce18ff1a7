//! 中性模式（平移/浏览）
//!
//! 所有手势的兜底归宿：按下时做批注命中测试并切到对应编辑模式，
//! 链接直接触发打开效果，滚动与捏合归视口。

use compact_str::CompactString;
use tracing::debug;

use crate::core::event::{EventResult, Key, KeyInput, PriorEventMode};
use crate::core::geometry::Pt;
use crate::models::annot::AnnotKind;

use super::super::context::ToolCtx;
use super::super::effect::Effect;
use super::super::mode::{ModeId, ToolMode};
use super::super::state::{ToolCommon, TransitionContext};
use super::super::tool::ToolVariant;

pub struct Pan {
    common: ToolCommon,
    /// One-shot: swallow the tap that follows an eraser stroke.
    suppress_next_tap: bool,
}

impl Pan {
    pub fn new(tc: TransitionContext) -> Self {
        let mut common = ToolCommon::from_transition(ModeId::NEUTRAL, &tc);
        // 中性模式永远不保留选择；连续标注的会话也到此为止
        common.clear_selection();
        common.force_same_next_mode = false;
        Self {
            common,
            suppress_next_tap: tc.suppress_next_tap,
        }
    }

    /// Hit-tests the annotation under a screen point and requests the
    /// matching editor mode. Inspection only; shared lock.
    fn select_annot_at(&mut self, ctx: &mut ToolCtx, at: Pt) -> Option<AnnotKind> {
        let doc = ctx.doc.read();
        let (page, pt) = ctx.viewport.screen_to_page(&doc, at)?;
        let id = doc.annot_at(page, pt)?;
        let annot = doc.annot(id)?;
        let kind = annot.kind;

        if kind == AnnotKind::Ink && !ctx.config.edit_ink_annots {
            // 墨迹不可编辑时点按直接穿透
            return None;
        }
        if kind == AnnotKind::Link {
            // 链接不进入编辑模式，直接请求打开
            let url = if annot.contents.is_empty() {
                CompactString::new("about:blank")
            } else {
                annot.contents.clone()
            };
            drop(doc);
            ctx.push_effect(Effect::OpenLink { url });
            return Some(kind);
        }

        self.common.annot = Some(id);
        self.common.annot_page = page;
        self.common.annot_bbox = annot.rect;
        self.common.annot_can_edit = !annot.locked;
        self.common.next_mode = ModeId::Builtin(ctx.config.handler_mode(kind));
        debug!(mode = %self.common.next_mode, "pan selected annotation");
        Some(kind)
    }
}

impl ToolVariant for Pan {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }

    fn on_down(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        if self.suppress_next_tap {
            self.suppress_next_tap = false;
            return EventResult::Consumed;
        }
        if ctx.config.stylus_as_pen && self.common.stylus_used {
            // 手写笔落笔即画墨迹；事件重放给墨迹创建变体开始笔画
            self.common.force_same_next_mode = true;
            self.common.next_mode = ModeId::Builtin(ToolMode::InkCreate);
            return EventResult::Ignored;
        }
        match self.select_annot_at(ctx, at) {
            Some(AnnotKind::Link) => EventResult::Consumed,
            // 选中后不消费：同一事件会重放给新的编辑变体
            _ => EventResult::Ignored,
        }
    }

    fn on_up(&mut self, ctx: &mut ToolCtx, _at: Pt, prior: PriorEventMode) -> EventResult {
        if matches!(prior, PriorEventMode::Scrolling | PriorEventMode::Fling) {
            ctx.push_effect(Effect::ShowTransientPageNumber);
        }
        EventResult::Ignored
    }

    fn on_long_press(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        if self.common.avoid_long_press {
            self.common.avoid_long_press = false;
            return EventResult::Ignored;
        }
        self.select_annot_at(ctx, at);
        // 不上报已处理：重放把长按送进编辑变体，由它启动拖动
        EventResult::Ignored
    }

    fn on_scale_begin(&mut self, _ctx: &mut ToolCtx, _focus: Pt) -> EventResult {
        EventResult::Consumed
    }

    fn on_scale(&mut self, ctx: &mut ToolCtx, _focus: Pt, factor: f64) -> EventResult {
        let scale = ctx.viewport.scale() * factor;
        ctx.viewport.set_scale(scale);
        ctx.push_effect(Effect::Invalidate);
        EventResult::Consumed
    }

    fn on_scale_end(&mut self, _ctx: &mut ToolCtx, _focus: Pt) -> EventResult {
        EventResult::Consumed
    }

    fn on_scroll_changed(&mut self, ctx: &mut ToolCtx, left: f64, top: f64) -> EventResult {
        ctx.viewport.scroll_to(left, top);
        let doc = ctx.doc.read();
        ctx.viewport.sync_current_page(&doc);
        EventResult::Consumed
    }

    fn on_double_tap_begin(&mut self, ctx: &mut ToolCtx, _at: Pt) -> EventResult {
        if !ctx.config.double_tap_to_zoom {
            return EventResult::Ignored;
        }
        let scale = if ctx.viewport.scale() > 1.0 { 1.0 } else { 2.0 };
        ctx.viewport.set_scale(scale);
        ctx.push_effect(Effect::Invalidate);
        EventResult::Consumed
    }

    fn on_key_up(&mut self, _ctx: &mut ToolCtx, key: KeyInput) -> EventResult {
        if key.ctrl || key.alt {
            return EventResult::Ignored;
        }
        let mode = match key.key {
            Key::Char('l') => ToolMode::LineCreate,
            Key::Char('a') => ToolMode::ArrowCreate,
            Key::Char('r') => ToolMode::RectCreate,
            Key::Char('o') => ToolMode::OvalCreate,
            Key::Char('i') => ToolMode::InkCreate,
            Key::Char('n') => ToolMode::StickyNoteCreate,
            Key::Char('t') => ToolMode::FreeTextCreate,
            Key::Char('e') => ToolMode::InkEraser,
            _ => return EventResult::Ignored,
        };
        self.common.next_mode = ModeId::Builtin(mode);
        EventResult::Consumed
    }
}
