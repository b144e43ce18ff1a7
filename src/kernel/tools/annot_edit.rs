//! 批注编辑变体
//!
//! 选中批注的移动/缩放/删除与快捷菜单。线形、文本标记、高级形状的
//! 编辑模式共用这套实现，模式号不同但手势语义一致。

use tracing::{error, warn};

use crate::core::event::{EventResult, Key, KeyInput, PriorEventMode};
use crate::core::geometry::{Pt, Rect};
use crate::models::annot::AnnotBatch;

use super::super::context::ToolCtx;
use super::super::effect::Effect;
use super::super::mode::ModeId;
use super::super::quick_menu;
use super::super::state::{ToolCommon, TransitionContext};
use super::super::tool::ToolVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    Nw,
    Ne,
    Sw,
    Se,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleOp {
    Move,
    Resize(Corner),
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    op: HandleOp,
    start: Pt,
    last: Pt,
}

pub struct AnnotEdit {
    common: ToolCommon,
    opened_dialog: bool,
    drag: Option<Drag>,
}

impl AnnotEdit {
    pub fn new(mode: ModeId, tc: TransitionContext) -> Self {
        let open_dialog = tc.up_from_sticky_create || tc.up_from_free_text_create;
        Self {
            common: ToolCommon::from_transition(mode, &tc),
            opened_dialog: open_dialog,
            drag: None,
        }
    }

    fn screen_bbox(&self, ctx: &ToolCtx) -> Option<Rect> {
        let doc = ctx.doc.read();
        ctx.viewport
            .page_rect_to_screen(&doc, self.common.annot_page, self.common.annot_bbox)
    }

    fn corner_at(&self, ctx: &ToolCtx, at: Pt) -> Option<Corner> {
        let bbox = self.screen_bbox(ctx)?;
        let r = ctx.config.handle_radius;
        let corners = [
            (Corner::Nw, Pt::new(bbox.x1, bbox.y1)),
            (Corner::Ne, Pt::new(bbox.x2, bbox.y1)),
            (Corner::Sw, Pt::new(bbox.x1, bbox.y2)),
            (Corner::Se, Pt::new(bbox.x2, bbox.y2)),
        ];
        corners
            .into_iter()
            .find(|(_, pt)| pt.distance(at) <= r)
            .map(|(corner, _)| corner)
    }

    /// Dead handles mean the engine mutated the document behind our back;
    /// give the gesture back to the neutral mode.
    fn validate_selection(&mut self, ctx: &ToolCtx) -> bool {
        let Some(id) = self.common.annot else {
            return false;
        };
        let doc = ctx.doc.read();
        if !doc.is_valid(id) {
            warn!("selected annotation disappeared; dropping selection");
            drop(doc);
            self.common.clear_selection();
            self.common.next_mode = ModeId::NEUTRAL;
            return false;
        }
        if let Some(rect) = doc.annot_rect(id) {
            self.common.annot_bbox = rect;
        }
        true
    }

    fn show_menu(&mut self, ctx: &mut ToolCtx) {
        let Some(id) = self.common.annot else { return };
        let kind = {
            let doc = ctx.doc.read();
            doc.annot(id).map(|a| a.kind)
        };
        let Some(kind) = kind else { return };
        let anchor = self.screen_bbox(ctx).unwrap_or(self.common.annot_bbox);
        ctx.push_effect(Effect::ShowQuickMenu {
            anchor,
            entries: quick_menu::entries_for(kind).to_vec(),
        });
    }

    fn dragged_rect(&self, ctx: &ToolCtx, drag: Drag) -> Rect {
        let scale = ctx.viewport.scale();
        let dx = (drag.last.x - drag.start.x) / scale;
        let dy = (drag.last.y - drag.start.y) / scale;
        let bbox = self.common.annot_bbox;
        let min = ctx.config.min_shape_size;

        let mut rect = match drag.op {
            HandleOp::Move => bbox.translated(dx, dy),
            HandleOp::Resize(corner) => {
                let mut r = bbox;
                match corner {
                    Corner::Nw => {
                        r.x1 += dx;
                        r.y1 += dy;
                    }
                    Corner::Ne => {
                        r.x2 += dx;
                        r.y1 += dy;
                    }
                    Corner::Sw => {
                        r.x1 += dx;
                        r.y2 += dy;
                    }
                    Corner::Se => {
                        r.x2 += dx;
                        r.y2 += dy;
                    }
                }
                r.normalized()
            }
        };
        if rect.width() < min {
            rect.x2 = rect.x1 + min;
        }
        if rect.height() < min {
            rect.y2 = rect.y1 + min;
        }

        // clamp into the page
        let doc = ctx.doc.read();
        if let Some(page) = doc.page(self.common.annot_page) {
            let (w, h) = (rect.width(), rect.height());
            if rect.x1 < 0.0 {
                rect = Rect::new(0.0, rect.y1, w, rect.y2);
            }
            if rect.y1 < 0.0 {
                rect = Rect::new(rect.x1, 0.0, rect.x2, h);
            }
            if rect.x2 > page.width {
                rect = Rect::new(page.width - w, rect.y1, page.width, rect.y2);
            }
            if rect.y2 > page.height {
                rect = Rect::new(rect.x1, page.height - h, rect.x2, page.height);
            }
        }
        rect
    }

    fn commit_drag(&mut self, ctx: &mut ToolCtx, drag: Drag) {
        let Some(id) = self.common.annot else { return };
        let page = self.common.annot_page;
        let rect = self.dragged_rect(ctx, drag);
        let batch = AnnotBatch::single(id, page);

        let mut doc = ctx.doc.write();
        ctx.raise_annotations_pre_modify(&doc, &batch);
        if let Err(e) = doc.set_annot_rect(id, rect) {
            error!(error = %e, "annotation move failed");
            drop(doc);
            self.common.clear_selection();
            self.common.next_mode = ModeId::NEUTRAL;
            return;
        }
        ctx.raise_annotations_modified(&mut doc, &batch, None);
        drop(doc);

        self.common.annot_bbox = rect;
        ctx.push_effect(Effect::Invalidate);
    }

    fn delete_selected(&mut self, ctx: &mut ToolCtx) -> EventResult {
        if !self.validate_selection(ctx) {
            return EventResult::Ignored;
        }
        if !self.common.annot_can_edit {
            warn!("delete refused for locked annotation");
            return EventResult::Ignored;
        }
        let Some(id) = self.common.annot else {
            return EventResult::Ignored;
        };
        let batch = AnnotBatch::single(id, self.common.annot_page);

        let mut doc = ctx.doc.write();
        ctx.raise_annotations_pre_remove(&doc, &batch);
        match doc.remove_annot(id) {
            Ok(()) => {
                ctx.raise_annotations_removed(&mut doc, &batch);
                drop(doc);
                self.common.clear_selection();
                self.common.next_mode = self.common.default_mode;
                ctx.push_effect(Effect::CloseQuickMenu);
                ctx.push_effect(Effect::Invalidate);
                EventResult::Consumed
            }
            Err(e) => {
                error!(error = %e, "annotation delete failed");
                drop(doc);
                self.common.clear_selection();
                self.common.next_mode = ModeId::NEUTRAL;
                EventResult::Ignored
            }
        }
    }
}

impl ToolVariant for AnnotEdit {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }

    fn on_create(&mut self, ctx: &mut ToolCtx) {
        if !self.validate_selection(ctx) {
            return;
        }
        if self.opened_dialog {
            // 创建路径直达属性对话框，跳过中间菜单
            if let Some(id) = self.common.annot {
                ctx.push_effect(Effect::ShowNoteDialog {
                    annot: id,
                    page: self.common.annot_page,
                });
            }
        }
    }

    fn on_close(&mut self, ctx: &mut ToolCtx) {
        ctx.push_effect(Effect::CloseQuickMenu);
    }

    fn on_down(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        if !self.validate_selection(ctx) {
            return EventResult::Ignored;
        }
        if !self.common.annot_can_edit {
            // 锁定的批注只能点按看菜单，不能拖
            let inside = self
                .screen_bbox(ctx)
                .is_some_and(|bbox| bbox.contains(at));
            if inside {
                return EventResult::Consumed;
            }
            self.common.next_mode = self.common.default_mode;
            return EventResult::Ignored;
        }
        if let Some(corner) = self.corner_at(ctx, at) {
            self.drag = Some(Drag {
                op: HandleOp::Resize(corner),
                start: at,
                last: at,
            });
            return EventResult::Consumed;
        }
        let inside = self
            .screen_bbox(ctx)
            .is_some_and(|bbox| bbox.contains(at));
        if inside {
            self.drag = Some(Drag {
                op: HandleOp::Move,
                start: at,
                last: at,
            });
            return EventResult::Consumed;
        }
        // 点在选区外：把手势还给默认模式，同一事件会重放过去
        self.common.next_mode = self.common.default_mode;
        EventResult::Ignored
    }

    fn on_move(&mut self, ctx: &mut ToolCtx, _from: Pt, to: Pt) -> EventResult {
        let Some(drag) = &mut self.drag else {
            return EventResult::Ignored;
        };
        drag.last = to;
        ctx.push_effect(Effect::Invalidate);
        EventResult::Consumed
    }

    fn on_up(&mut self, ctx: &mut ToolCtx, _at: Pt, _prior: PriorEventMode) -> EventResult {
        // 同一抬起事件跨变体重放的守卫：创建事件已在上一个变体里上报
        if self.common.take_creation_event_raised() {
            if !self.opened_dialog {
                self.show_menu(ctx);
            }
            return EventResult::Consumed;
        }
        if !self.common.annot_can_edit {
            self.show_menu(ctx);
            return EventResult::Consumed;
        }
        let Some(drag) = self.drag.take() else {
            return EventResult::Ignored;
        };
        if drag.start.distance(drag.last) <= ctx.config.tap_slop {
            self.show_menu(ctx);
            return EventResult::Consumed;
        }
        self.commit_drag(ctx, drag);
        EventResult::Consumed
    }

    fn on_long_press(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        if self.common.avoid_long_press {
            self.common.avoid_long_press = false;
            return EventResult::Ignored;
        }
        if !self.validate_selection(ctx) || !self.common.annot_can_edit {
            return EventResult::Ignored;
        }
        let inside = self
            .screen_bbox(ctx)
            .is_some_and(|bbox| bbox.contains(at));
        if inside {
            // 长按直接进入移动
            self.drag = Some(Drag {
                op: HandleOp::Move,
                start: at,
                last: at,
            });
            return EventResult::Consumed;
        }
        EventResult::Ignored
    }

    fn on_key_up(&mut self, ctx: &mut ToolCtx, key: KeyInput) -> EventResult {
        match key.key {
            Key::Delete | Key::Backspace => self.delete_selected(ctx),
            Key::Escape => {
                self.common.next_mode = self.common.default_mode;
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }

    fn on_layout(&mut self, ctx: &mut ToolCtx, changed: bool) -> EventResult {
        if changed {
            ctx.push_effect(Effect::CloseQuickMenu);
            return EventResult::Consumed;
        }
        EventResult::Ignored
    }
}
