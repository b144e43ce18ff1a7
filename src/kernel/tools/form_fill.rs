//! 表单填写变体
//!
//! 点击控件选中，抬起切换复选值，按键写入文本字段。
//! 每次值变更都走完整的 pre/post 通知流程。

use serde_json::json;
use tracing::error;

use crate::core::event::{EventResult, Key, KeyInput, PriorEventMode};
use crate::core::geometry::Pt;
use crate::models::annot::{AnnotBatch, AnnotKind};

use super::super::context::ToolCtx;
use super::super::effect::Effect;
use super::super::mode::ModeId;
use super::super::state::{ToolCommon, TransitionContext};
use super::super::tool::ToolVariant;

pub struct FormFill {
    common: ToolCommon,
    pressed_on_field: bool,
}

impl FormFill {
    pub fn new(mode: ModeId, tc: TransitionContext) -> Self {
        Self {
            common: ToolCommon::from_transition(mode, &tc),
            pressed_on_field: false,
        }
    }

    fn write_contents(&mut self, ctx: &mut ToolCtx, contents: &str, field: &str) -> EventResult {
        let Some(id) = self.common.annot else {
            return EventResult::Ignored;
        };
        let page = self.common.annot_page;
        let batch = AnnotBatch::single(id, page);

        let mut doc = ctx.doc.write();
        ctx.raise_annotations_pre_modify(&doc, &batch);
        if let Err(e) = doc.set_annot_contents(id, contents) {
            error!(error = %e, "form field update failed");
            drop(doc);
            self.common.clear_selection();
            self.common.next_mode = ModeId::NEUTRAL;
            return EventResult::Ignored;
        }
        let extra = json!({ "field": field });
        ctx.raise_annotations_modified(&mut doc, &batch, Some(&extra));
        drop(doc);
        ctx.push_effect(Effect::Invalidate);
        EventResult::Consumed
    }
}

impl ToolVariant for FormFill {
    fn common(&self) -> &ToolCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut ToolCommon {
        &mut self.common
    }

    fn on_down(&mut self, ctx: &mut ToolCtx, at: Pt) -> EventResult {
        self.pressed_on_field = false;
        let doc = ctx.doc.read();
        let Some((page, pt)) = ctx.viewport.screen_to_page(&doc, at) else {
            self.common.next_mode = self.common.default_mode;
            return EventResult::Ignored;
        };
        let hit = doc
            .annot_at(page, pt)
            .filter(|&id| doc.annot(id).is_some_and(|a| a.kind == AnnotKind::Widget));
        match hit {
            Some(id) => {
                let rect = doc.annot_rect(id).unwrap_or_default();
                drop(doc);
                self.common.annot = Some(id);
                self.common.annot_page = page;
                self.common.annot_bbox = rect;
                self.pressed_on_field = true;
                EventResult::Consumed
            }
            None => {
                drop(doc);
                // 点在表单外：交还默认模式处理
                self.common.next_mode = self.common.default_mode;
                EventResult::Ignored
            }
        }
    }

    fn on_up(&mut self, ctx: &mut ToolCtx, _at: Pt, _prior: PriorEventMode) -> EventResult {
        if !std::mem::take(&mut self.pressed_on_field) {
            return EventResult::Ignored;
        }
        let Some(id) = self.common.annot else {
            return EventResult::Ignored;
        };
        // 复选语义：点按在 Yes/Off 之间翻转
        let toggled = {
            let doc = ctx.doc.read();
            match doc.annot(id) {
                Some(a) if a.contents == "Yes" => "Off",
                Some(_) => "Yes",
                None => return EventResult::Ignored,
            }
        };
        self.write_contents(ctx, toggled, "checkbox")
    }

    fn on_key_up(&mut self, ctx: &mut ToolCtx, key: KeyInput) -> EventResult {
        match key.key {
            Key::Char(c) if !key.ctrl && !key.alt => {
                let Some(id) = self.common.annot else {
                    return EventResult::Ignored;
                };
                let mut text = {
                    let doc = ctx.doc.read();
                    match doc.annot(id) {
                        Some(a) => a.contents.to_string(),
                        None => return EventResult::Ignored,
                    }
                };
                text.push(c);
                self.write_contents(ctx, &text, "text")
            }
            Key::Escape => {
                self.common.next_mode = self.common.default_mode;
                EventResult::Consumed
            }
            _ => EventResult::Ignored,
        }
    }
}
