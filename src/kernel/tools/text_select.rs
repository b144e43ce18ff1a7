//! 文本选择变体
//!
//! 拖出一段选区，抬起时弹出文本菜单。选区本身简化为矩形跨度。

use crate::core::event::{EventResult, Key, KeyInput, PriorEventMode};
use crate::core::geometry::{PageIndex, Pt, Rect};

use super::super::context::ToolCtx;
use super::super::effect::Effect;
use super::super::mode::ModeId;
use super::super::quick_menu;
use super::super::state::{ToolCommon, TransitionContext};
use super::super::tool::ToolVariant;

pub struct TextSelect {
    common: ToolCommon,
    anchor: Option<(PageIndex, Pt)>,
    selection: Option<(PageIndex, Rect)>,
}

impl TextSelect {
    pub fn new(mode: ModeId, tc: TransitionContext) -> Self {
        let mut common = ToolCommon::from_transition(mode, &tc);
        common.default_mode = mode;
        Self {
            common,
            anchor: None,
            selection: None,
        }
    }

    pub fn selection(&self) -> Option<(PageIndex, Rect)> {
        self.selection
    }
}

impl ToolVariant for TextSelect {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }

    fn on_down(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        self.selection = None;
        let doc = ctx.doc.read();
        let Some((page, pt)) = ctx.viewport.screen_to_page(&doc, at) else {
            return EventResult::Ignored;
        };
        self.anchor = Some((page, pt));
        EventResult::Consumed
    }

    fn on_move(&mut self, ctx: &mut ToolCtx, _from: Pt, to: Pt) -> EventResult {
        let Some((page, start)) = self.anchor else {
            return EventResult::Ignored;
        };
        let doc = ctx.doc.read();
        if let Some((p, pt)) = ctx.viewport.screen_to_page(&doc, to) {
            if p == page {
                self.selection = Some((page, Rect::from_points(start, pt)));
            }
        }
        drop(doc);
        ctx.push_effect(Effect::Invalidate);
        EventResult::Consumed
    }

    fn on_up(&mut self, ctx: &mut ToolCtx, _at: Pt, _prior: PriorEventMode) -> EventResult {
        if self.anchor.take().is_none() {
            return EventResult::Ignored;
        }
        let Some((page, rect)) = self.selection else {
            return EventResult::Consumed;
        };
        let anchor = {
            let doc = ctx.doc.read();
            ctx.viewport.page_rect_to_screen(&doc, page, rect)
        }
        .unwrap_or(rect);
        ctx.push_effect(Effect::ShowQuickMenu {
            anchor,
            entries: quick_menu::text_select_entries().to_vec(),
        });
        EventResult::Consumed
    }

    fn on_key_up(&mut self, ctx: &mut ToolCtx, key: KeyInput) -> EventResult {
        if key.key == Key::Escape {
            if self.selection.take().is_some() {
                ctx.push_effect(Effect::Invalidate);
            } else {
                self.common.next_mode = ModeId::NEUTRAL;
            }
            return EventResult::Consumed;
        }
        EventResult::Ignored
    }
}
