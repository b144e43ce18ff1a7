//! 内建工具变体
//!
//! 原型的 40 余个工具类收敛成几个参数化家族；模式 → 构造的映射
//! 全部走 [`builtin_tool`]，禁用集合兜住没有实现的模式。

pub mod annot_edit;
pub mod eraser;
pub mod form_fill;
pub mod free_text;
pub mod pan;
pub mod shape_create;
pub mod sticky_note;
pub mod text_markup;
pub mod text_select;

pub use annot_edit::AnnotEdit;
pub use eraser::Eraser;
pub use form_fill::FormFill;
pub use free_text::FreeTextCreate;
pub use pan::Pan;
pub use shape_create::{ShapeCreate, ShapeKind};
pub use sticky_note::StickyNoteCreate;
pub use text_markup::{MarkupKind, TextMarkupCreate};
pub use text_select::TextSelect;

use crate::services::config::ToolConfig;

use super::mode::{ModeId, ToolCreateError, ToolMode};
use super::state::TransitionContext;
use super::tool::ToolVariant;

/// Instantiates the built-in variant for a mode. Modes without a built-in
/// handler report [`ToolCreateError::NoHandler`]; the registry keeps them
/// default-disabled so this is only reachable after explicit re-enabling.
pub fn builtin_tool(
    mode: ToolMode,
    tc: TransitionContext,
    config: &ToolConfig,
) -> Result<Box<dyn ToolVariant>, ToolCreateError> {
    use ToolMode::*;

    let id = ModeId::Builtin(mode);
    let continuous = config.continuous_annotation;
    let tool: Box<dyn ToolVariant> = match mode {
        Pan => Box::new(pan::Pan::new(tc)),
        AnnotEdit | AnnotEditLine | AnnotEditTextMarkup | AnnotEditRectGroup
        | AnnotEditAdvancedShape => Box::new(annot_edit::AnnotEdit::new(id, tc)),
        TextSelect => Box::new(text_select::TextSelect::new(id, tc)),
        FormFill => Box::new(form_fill::FormFill::new(id, tc)),
        LineCreate => shape(id, ShapeKind::Line, tc, continuous),
        ArrowCreate => shape(id, ShapeKind::Arrow, tc, continuous),
        RulerCreate => shape(id, ShapeKind::Ruler, tc, continuous),
        RectCreate => shape(id, ShapeKind::Rect, tc, continuous),
        OvalCreate => shape(id, ShapeKind::Oval, tc, continuous),
        PolylineCreate => shape(id, ShapeKind::Polyline, tc, continuous),
        PolygonCreate => shape(id, ShapeKind::Polygon, tc, continuous),
        CloudCreate => shape(id, ShapeKind::Cloud, tc, continuous),
        InkCreate => shape(id, ShapeKind::Ink, tc, continuous),
        InkEraser => Box::new(eraser::Eraser::new(id, tc, continuous)),
        StickyNoteCreate => Box::new(sticky_note::StickyNoteCreate::new(id, tc, continuous)),
        FreeTextCreate => Box::new(free_text::FreeTextCreate::new(id, false, tc, continuous)),
        CalloutCreate => Box::new(free_text::FreeTextCreate::new(id, true, tc, continuous)),
        TextHighlightCreate | FreeHighlighter => {
            markup(id, MarkupKind::Highlight, tc, continuous)
        }
        TextUnderlineCreate => markup(id, MarkupKind::Underline, tc, continuous),
        TextSquigglyCreate => markup(id, MarkupKind::Squiggly, tc, continuous),
        TextStrikeoutCreate => markup(id, MarkupKind::Strikeout, tc, continuous),
        TextRedactionCreate => markup(id, MarkupKind::Redaction, tc, continuous),
        LinkAction | TextHighlighter | TextLinkCreate | RectLinkCreate | Signature | Stamper
        | RubberStamper | SoundCreate | FileAttachmentCreate | FormTextFieldCreate
        | FormCheckboxCreate | FormRadioGroupCreate | FormSignatureCreate | RichMedia
        | DigitalSignature => return Err(ToolCreateError::NoHandler(id)),
    };
    Ok(tool)
}

fn shape(
    id: ModeId,
    kind: ShapeKind,
    tc: TransitionContext,
    continuous: bool,
) -> Box<dyn ToolVariant> {
    Box::new(shape_create::ShapeCreate::new(id, kind, tc, continuous))
}

fn markup(
    id: ModeId,
    kind: MarkupKind,
    tc: TransitionContext,
    continuous: bool,
) -> Box<dyn ToolVariant> {
    Box::new(text_markup::TextMarkupCreate::new(id, kind, tc, continuous))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::{EventResult, PriorEventMode};
    use crate::core::geometry::{Pt, Rect};
    use crate::kernel::effect::Effect;
    use crate::kernel::tool::ToolVariant;
    use crate::models::annot::{Annot, AnnotKind};
    use crate::models::undo_entry::{UndoActionKind, UndoEntry};
    use harness::Harness;

    #[test]
    fn test_builtin_tool_covers_enabled_modes() {
        let config = ToolConfig::default();
        for mode in [
            ToolMode::Pan,
            ToolMode::AnnotEdit,
            ToolMode::RectCreate,
            ToolMode::InkEraser,
            ToolMode::StickyNoteCreate,
            ToolMode::TextHighlightCreate,
            ToolMode::FormFill,
            ToolMode::TextSelect,
        ] {
            let tool = builtin_tool(mode, TransitionContext::initial(), &config).unwrap();
            assert_eq!(tool.mode(), ModeId::Builtin(mode));
        }
    }

    #[test]
    fn test_out_of_scope_modes_have_no_handler() {
        let config = ToolConfig::default();
        for mode in [ToolMode::RichMedia, ToolMode::DigitalSignature, ToolMode::Stamper] {
            assert!(builtin_tool(mode, TransitionContext::initial(), &config).is_err());
        }
    }

    #[test]
    fn test_shape_create_drag_creates_annot_once() {
        let mut h = Harness::new(1);
        let mut tool = ShapeCreate::new(
            ModeId::Builtin(ToolMode::RectCreate),
            ShapeKind::Rect,
            TransitionContext::initial(),
            false,
        );

        let mut ctx = h.ctx();
        assert_eq!(tool.on_down(&mut ctx, Pt::new(10.0, 10.0)), EventResult::Consumed);
        assert!(tool.is_creating_annotation());
        tool.on_move(&mut ctx, Pt::new(10.0, 10.0), Pt::new(90.0, 70.0));
        assert_eq!(
            tool.on_up(&mut ctx, Pt::new(90.0, 70.0), PriorEventMode::None),
            EventResult::Consumed
        );
        drop(ctx);

        let doc = h.doc.read();
        assert_eq!(doc.page(1).unwrap().annots().len(), 1);
        // 创建即入撤销链
        let entry = UndoEntry::from_json(doc.next_undo_info().unwrap());
        assert_eq!(entry.action, UndoActionKind::Add);
        assert_eq!(entry.label, "Add Square");
        drop(doc);

        // 请求切往编辑态，守卫置位
        assert_eq!(
            tool.requested_next_mode(),
            ModeId::Builtin(ToolMode::AnnotEdit)
        );
        assert!(tool.common().creation_event_raised);
    }

    #[test]
    fn test_shape_create_discards_tiny_shapes() {
        let mut h = Harness::new(1);
        let mut tool = ShapeCreate::new(
            ModeId::Builtin(ToolMode::OvalCreate),
            ShapeKind::Oval,
            TransitionContext::initial(),
            false,
        );

        let mut ctx = h.ctx();
        tool.on_down(&mut ctx, Pt::new(10.0, 10.0));
        tool.on_up(&mut ctx, Pt::new(11.0, 11.0), PriorEventMode::None);
        drop(ctx);

        assert!(h.doc.read().page(1).unwrap().annots().is_empty());
        // 丢弃后留在本模式
        assert_eq!(tool.requested_next_mode(), tool.mode());
    }

    #[test]
    fn test_continuous_mode_stays_in_creation() {
        let mut h = Harness::new(1);
        h.config.continuous_annotation = true;
        let mut tool = ShapeCreate::new(
            ModeId::Builtin(ToolMode::RectCreate),
            ShapeKind::Rect,
            TransitionContext::initial(),
            h.config.continuous_annotation,
        );

        let mut ctx = h.ctx();
        tool.on_down(&mut ctx, Pt::new(10.0, 10.0));
        tool.on_up(&mut ctx, Pt::new(80.0, 80.0), PriorEventMode::None);
        drop(ctx);

        assert_eq!(tool.requested_next_mode(), tool.mode());
        assert_eq!(h.doc.read().page(1).unwrap().annots().len(), 1);
    }

    #[test]
    fn test_eraser_removes_only_ink() {
        let mut h = Harness::new(1);
        let (ink, square) = {
            let mut doc = h.doc.write();
            let ink = doc
                .add_annot(1, Annot::new(AnnotKind::Ink, Rect::new(0.0, 0.0, 50.0, 50.0)))
                .unwrap();
            let square = doc
                .add_annot(
                    1,
                    Annot::new(AnnotKind::Square, Rect::new(100.0, 100.0, 150.0, 150.0)),
                )
                .unwrap();
            (ink, square)
        };

        let mut tool = Eraser::new(
            ModeId::Builtin(ToolMode::InkEraser),
            TransitionContext::initial(),
            false,
        );
        let mut ctx = h.ctx();
        tool.on_down(&mut ctx, Pt::new(10.0, 10.0));
        tool.on_move(&mut ctx, Pt::new(10.0, 10.0), Pt::new(120.0, 120.0));
        tool.on_up(&mut ctx, Pt::new(120.0, 120.0), PriorEventMode::None);
        drop(ctx);

        let doc = h.doc.read();
        assert!(!doc.is_valid(ink));
        assert!(doc.is_valid(square));
        drop(doc);

        assert_eq!(tool.requested_next_mode(), ModeId::NEUTRAL);
    }

    #[test]
    fn test_form_fill_toggles_checkbox() {
        let mut h = Harness::new(1);
        let widget = {
            let mut doc = h.doc.write();
            doc.add_annot(
                1,
                Annot::new(AnnotKind::Widget, Rect::new(10.0, 10.0, 40.0, 30.0)),
            )
            .unwrap()
        };

        let mut tool = FormFill::new(
            ModeId::Builtin(ToolMode::FormFill),
            TransitionContext::initial(),
        );
        let mut ctx = h.ctx();
        assert_eq!(tool.on_down(&mut ctx, Pt::new(20.0, 20.0)), EventResult::Consumed);
        tool.on_up(&mut ctx, Pt::new(20.0, 20.0), PriorEventMode::None);
        drop(ctx);

        assert_eq!(h.doc.read().annot(widget).unwrap().contents, "Yes");
        assert!(h.effects.contains(&Effect::Invalidate));
    }

    #[test]
    fn test_text_select_pops_menu_on_release() {
        let mut h = Harness::new(1);
        let mut tool = TextSelect::new(
            ModeId::Builtin(ToolMode::TextSelect),
            TransitionContext::initial(),
        );

        let mut ctx = h.ctx();
        tool.on_down(&mut ctx, Pt::new(10.0, 10.0));
        tool.on_move(&mut ctx, Pt::new(10.0, 10.0), Pt::new(200.0, 30.0));
        tool.on_up(&mut ctx, Pt::new(200.0, 30.0), PriorEventMode::None);
        drop(ctx);

        assert!(tool.selection().is_some());
        assert!(h
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ShowQuickMenu { .. })));
    }
}
