//! 端到端场景：从输入事件到撤销链的完整链路

use std::cell::RefCell;
use std::rc::Rc;

use zmark::core::event::{InputEvent, Key, KeyInput, PriorEventMode};
use zmark::core::geometry::{PageIndex, Pt, Rect};
use zmark::doc::PdfDoc;
use zmark::kernel::quick_menu::QuickMenuEntry;
use zmark::kernel::{
    AnnotationListener, Dispatcher, DocStructureListener, Effect, ModeId, ModifyExtra, ToolCommon,
    ToolMode, ToolVariant, TransitionContext,
};
use zmark::models::annot::{Annot, AnnotBatch, AnnotKind};
use zmark::models::undo_entry::{UndoActionKind, UndoEntry};
use zmark::services::config::ToolConfig;

fn press(x: f64, y: f64) -> InputEvent {
    InputEvent::Down { at: Pt::new(x, y) }
}

fn drag(fx: f64, fy: f64, tx: f64, ty: f64) -> InputEvent {
    InputEvent::Move {
        from: Pt::new(fx, fy),
        to: Pt::new(tx, ty),
    }
}

fn release(x: f64, y: f64) -> InputEvent {
    InputEvent::Up {
        at: Pt::new(x, y),
        prior: PriorEventMode::None,
    }
}

/// Screen y of a page-space y in the default 1-scale vertical layout.
fn on_page_y(page: PageIndex, y: f64) -> f64 {
    (page - 1) as f64 * 800.0 + y
}

#[derive(Default)]
struct Counts {
    added: usize,
    modified: usize,
    removed: usize,
    pages_added: usize,
}

struct CountListener(Rc<RefCell<Counts>>);

impl AnnotationListener for CountListener {
    fn on_added(&mut self, _batch: &AnnotBatch) {
        self.0.borrow_mut().added += 1;
    }
    fn on_modified(&mut self, _batch: &AnnotBatch, _extra: Option<&ModifyExtra>) {
        self.0.borrow_mut().modified += 1;
    }
    fn on_removed(&mut self, _batch: &AnnotBatch) {
        self.0.borrow_mut().removed += 1;
    }
}

impl DocStructureListener for CountListener {
    fn on_pages_added(&mut self, _pages: &[PageIndex]) {
        self.0.borrow_mut().pages_added += 1;
    }
}

fn counted_dispatcher(pages: u32) -> (Dispatcher, Rc<RefCell<Counts>>) {
    let mut d = Dispatcher::new(PdfDoc::new(pages), ToolConfig::default());
    let counts = Rc::new(RefCell::new(Counts::default()));
    d.add_annotation_listener(Box::new(CountListener(counts.clone())));
    d.add_doc_listener(Box::new(CountListener(counts.clone())));
    (d, counts)
}

/// Marks the current document content as the undo floor, the way an
/// opened file's loaded state would be.
fn snapshot_base(d: &Dispatcher) {
    let meta = UndoEntry::new("Open", UndoActionKind::GenericAction).to_json();
    d.doc().write().take_undo_snapshot(&meta);
}

#[test]
fn test_press_inside_then_outside_round_trip() {
    let (mut d, _counts) = counted_dispatcher(5);
    let id = {
        let mut doc = d.doc().write();
        doc.add_annot(
            3,
            Annot::new(AnnotKind::Square, Rect::new(100.0, 100.0, 200.0, 200.0)),
        )
        .unwrap()
    };

    // 第 3 页批注内按下：落入编辑模式并携带选择
    d.dispatch(&press(150.0, on_page_y(3, 150.0)));
    assert_eq!(d.mode(), ModeId::Builtin(ToolMode::AnnotEdit));
    assert_eq!(d.selection(), Some((id, 3)));
    d.dispatch(&release(150.0, on_page_y(3, 150.0)));

    // 批注外按下：回到中性模式，选择清空
    d.dispatch(&press(400.0, on_page_y(1, 40.0)));
    assert_eq!(d.mode(), ModeId::NEUTRAL);
    assert_eq!(d.selection(), None);
}

#[test]
fn test_creation_replay_fires_added_exactly_once() {
    let (mut d, counts) = counted_dispatcher(1);
    d.set_tool(ModeId::Builtin(ToolMode::RectCreate));

    d.dispatch(&press(20.0, 20.0));
    d.dispatch(&drag(20.0, 20.0, 150.0, 120.0));
    let result = d.dispatch(&release(150.0, 120.0));

    // 抬起事件跨创建/编辑两个变体重放，通知只许一次
    assert_eq!(counts.borrow().added, 1);
    assert_eq!(d.mode(), ModeId::Builtin(ToolMode::AnnotEdit));
    assert!(d.selection().is_some());
    assert!(result
        .effects
        .iter()
        .any(|e| matches!(e, Effect::ShowQuickMenu { .. })));
    assert_eq!(d.peek_next_undo_label(), "Undo: Add Square");
}

#[test]
fn test_sticky_note_creation_opens_dialog_directly() {
    let (mut d, counts) = counted_dispatcher(1);
    d.set_tool(ModeId::Builtin(ToolMode::StickyNoteCreate));

    d.dispatch(&press(80.0, 90.0));
    let result = d.dispatch(&release(80.0, 90.0));

    assert_eq!(counts.borrow().added, 1);
    assert_eq!(d.mode(), ModeId::Builtin(ToolMode::AnnotEdit));
    // 创建直达笔记对话框，不经过快捷菜单
    assert!(result
        .effects
        .iter()
        .any(|e| matches!(e, Effect::ShowNoteDialog { .. })));
    assert!(!result
        .effects
        .iter()
        .any(|e| matches!(e, Effect::ShowQuickMenu { .. })));
}

#[test]
fn test_undo_redo_round_trip_restores_selection_geometry() {
    let (mut d, _counts) = counted_dispatcher(1);
    // 经由创建手势落一个矩形，撤销链里有它的新增快照
    d.set_tool(ModeId::Builtin(ToolMode::RectCreate));
    d.dispatch(&press(100.0, 100.0));
    d.dispatch(&drag(100.0, 100.0, 200.0, 200.0));
    d.dispatch(&release(200.0, 200.0));
    let (id, _) = d.selection().expect("creation selects the new annotation");

    // 整体拖动 50,50
    d.dispatch(&press(150.0, 150.0));
    d.dispatch(&drag(150.0, 150.0, 200.0, 200.0));
    d.dispatch(&release(200.0, 200.0));
    let moved = Rect::new(150.0, 150.0, 250.0, 250.0);
    assert_eq!(d.doc().read().annot_rect(id), Some(moved));
    d.take_effects();

    let entry = d.undo().unwrap();
    assert_eq!(entry.action, UndoActionKind::Modify);
    let original = Rect::new(100.0, 100.0, 200.0, 200.0);
    assert_eq!(d.doc().read().annot_rect(id), Some(original));
    // 选择仍在，几何已随撤销恢复
    assert_eq!(d.selection(), Some((id, 1)));
    let fx = d.take_effects();
    assert!(fx.iter().any(|e| matches!(
        e,
        Effect::AnimateRect { page: 1, rect } if *rect == original
    )));

    let entry = d.redo().unwrap();
    assert_eq!(entry.action, UndoActionKind::Modify);
    assert_eq!(d.doc().read().annot_rect(id), Some(moved));
}

#[test]
fn test_safety_markers_invisible_and_discarded() {
    let (mut d, _counts) = counted_dispatcher(1);
    d.set_tool(ModeId::Builtin(ToolMode::InkCreate));
    d.dispatch(&press(10.0, 10.0));
    d.dispatch(&drag(10.0, 10.0, 90.0, 40.0));
    d.dispatch(&release(90.0, 40.0));

    // 两次保存前快照，叠在真实编辑之上
    d.doc().write().add_bookmark("scratch", 1);
    d.prepare_save();
    d.doc().write().add_bookmark("scratch2", 1);
    d.prepare_save();

    // peek 永远跳过安全标记
    assert_eq!(d.peek_next_undo_label(), "Undo: Add Ink");

    // 单次 undo 丢弃全部安全标记并撤销真实编辑
    let entry = d.undo().unwrap();
    assert_eq!(entry.action, UndoActionKind::Add);
    assert!(!entry.safety);
    assert_eq!(d.doc().read().page(1).unwrap().annots().len(), 0);
    assert!(!d.can_undo());
}

#[test]
fn test_prepare_save_is_noop_when_clean() {
    let (mut d, _counts) = counted_dispatcher(1);
    d.prepare_save();
    assert!(!d.can_undo());
    assert_eq!(d.peek_next_undo_label(), "");
}

#[test]
fn test_continuous_annotation_keeps_creation_mode() {
    let mut config = ToolConfig::default();
    config.continuous_annotation = true;
    let mut d = Dispatcher::new(PdfDoc::new(1), config);
    let counts = Rc::new(RefCell::new(Counts::default()));
    d.add_annotation_listener(Box::new(CountListener(counts.clone())));

    d.set_tool(ModeId::Builtin(ToolMode::OvalCreate));
    d.dispatch(&press(10.0, 10.0));
    d.dispatch(&drag(10.0, 10.0, 60.0, 60.0));
    d.dispatch(&release(60.0, 60.0));
    assert_eq!(d.mode(), ModeId::Builtin(ToolMode::OvalCreate));

    d.dispatch(&press(100.0, 100.0));
    d.dispatch(&drag(100.0, 100.0, 160.0, 160.0));
    d.dispatch(&release(160.0, 160.0));
    assert_eq!(d.mode(), ModeId::Builtin(ToolMode::OvalCreate));

    assert_eq!(counts.borrow().added, 2);
    assert_eq!(d.doc().read().page(1).unwrap().annots().len(), 2);
}

#[test]
fn test_read_only_blocks_selection_and_restores() {
    let (mut d, _counts) = counted_dispatcher(1);
    let id = {
        let mut doc = d.doc().write();
        doc.add_annot(
            1,
            Annot::new(AnnotKind::Square, Rect::new(100.0, 100.0, 200.0, 200.0)),
        )
        .unwrap()
    };

    d.registry_mut().set_read_only(true);
    d.dispatch(&press(150.0, 150.0));
    assert_eq!(d.mode(), ModeId::NEUTRAL);
    assert_eq!(d.selection(), None);
    d.dispatch(&release(150.0, 150.0));

    d.registry_mut().set_read_only(false);
    d.dispatch(&press(150.0, 150.0));
    assert_eq!(d.selection(), Some((id, 1)));
}

#[test]
fn test_quick_menu_matches_annotation_type() {
    let (mut d, _counts) = counted_dispatcher(1);
    {
        let mut doc = d.doc().write();
        doc.add_annot(
            1,
            Annot::new(AnnotKind::Sound, Rect::new(50.0, 50.0, 80.0, 80.0)),
        )
        .unwrap();
    }

    d.dispatch(&press(60.0, 60.0));
    let result = d.dispatch(&release(60.0, 60.0));

    let menu = result.effects.iter().find_map(|e| match e {
        Effect::ShowQuickMenu { entries, .. } => Some(entries.clone()),
        _ => None,
    });
    let entries = menu.expect("tap on sound annotation should pop a menu");
    assert!(entries.contains(&QuickMenuEntry::PlaySound));
    assert!(!entries.contains(&QuickMenuEntry::Note));
}

#[test]
fn test_form_fill_toggle_is_undoable() {
    let (mut d, counts) = counted_dispatcher(1);
    let id = {
        let mut doc = d.doc().write();
        doc.add_annot(
            1,
            Annot::new(AnnotKind::Widget, Rect::new(40.0, 40.0, 90.0, 70.0)),
        )
        .unwrap()
    };
    snapshot_base(&d);

    d.dispatch(&press(60.0, 55.0));
    assert_eq!(d.mode(), ModeId::Builtin(ToolMode::FormFill));
    d.dispatch(&release(60.0, 55.0));

    assert_eq!(counts.borrow().modified, 1);
    assert_eq!(d.doc().read().annot(id).unwrap().contents, "Yes");
    assert_eq!(d.peek_next_undo_label(), "Undo: Modify Form Field");

    d.undo().unwrap();
    assert_eq!(d.doc().read().annot(id).unwrap().contents, "");
}

#[test]
fn test_delete_key_removes_selected_annotation() {
    let (mut d, counts) = counted_dispatcher(1);
    let id = {
        let mut doc = d.doc().write();
        doc.add_annot(
            1,
            Annot::new(AnnotKind::Circle, Rect::new(100.0, 100.0, 180.0, 180.0)),
        )
        .unwrap()
    };
    snapshot_base(&d);

    d.dispatch(&press(140.0, 140.0));
    d.dispatch(&release(140.0, 140.0));
    d.dispatch(&InputEvent::KeyUp(KeyInput::plain(Key::Delete)));

    assert_eq!(counts.borrow().removed, 1);
    assert!(!d.doc().read().is_valid(id));
    assert_eq!(d.mode(), ModeId::NEUTRAL);
    assert_eq!(d.selection(), None);
    assert_eq!(d.peek_next_undo_label(), "Undo: Remove Circle");

    // 撤销删除后句柄重新生效
    d.undo().unwrap();
    assert!(d.doc().read().is_valid(id));
}

#[test]
fn test_locked_annotation_selects_but_refuses_edits() {
    let (mut d, counts) = counted_dispatcher(1);
    let id = {
        let mut doc = d.doc().write();
        let mut annot = Annot::new(AnnotKind::Square, Rect::new(100.0, 100.0, 200.0, 200.0));
        annot.locked = true;
        doc.add_annot(1, annot).unwrap()
    };
    snapshot_base(&d);

    d.dispatch(&press(150.0, 150.0));
    assert_eq!(d.selection(), Some((id, 1)));

    // 点按弹菜单，拖动不落成任何修改
    let result = d.dispatch(&release(150.0, 150.0));
    assert!(result
        .effects
        .iter()
        .any(|e| matches!(e, Effect::ShowQuickMenu { .. })));

    d.dispatch(&press(150.0, 150.0));
    d.dispatch(&drag(150.0, 150.0, 250.0, 250.0));
    d.dispatch(&release(250.0, 250.0));
    assert_eq!(
        d.doc().read().annot_rect(id),
        Some(Rect::new(100.0, 100.0, 200.0, 200.0))
    );

    // Delete 键同样被拒绝
    d.dispatch(&InputEvent::KeyUp(KeyInput::plain(Key::Delete)));
    assert!(d.doc().read().is_valid(id));
    assert_eq!(counts.borrow().modified, 0);
    assert_eq!(counts.borrow().removed, 0);
}

#[test]
fn test_custom_variant_registration_and_dispatch() {
    let (mut d, _counts) = counted_dispatcher(1);
    let mode = d.registry_mut().register_mode();

    struct Echo {
        common: ToolCommon,
        seen: Rc<RefCell<Vec<String>>>,
    }
    impl ToolVariant for Echo {
        fn common(&self) -> &ToolCommon {
            &self.common
        }
        fn common_mut(&mut self) -> &mut ToolCommon {
            &mut self.common
        }
        fn on_custom_event(
            &mut self,
            _ctx: &mut zmark::kernel::ToolCtx,
            tag: &str,
        ) -> zmark::core::event::EventResult {
            self.seen.borrow_mut().push(tag.to_string());
            zmark::core::event::EventResult::Consumed
        }
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_factory = seen.clone();
    d.registry_mut().register_variant(
        mode,
        Box::new(move |tc: TransitionContext, _cfg: &ToolConfig| {
            Ok(Box::new(Echo {
                common: ToolCommon::from_transition(mode, &tc),
                seen: seen_factory.clone(),
            }) as Box<dyn ToolVariant>)
        }),
    );

    d.set_tool(mode);
    assert_eq!(d.mode(), mode);
    let result = d.dispatch(&InputEvent::Custom("annotate.begin".into()));
    assert!(result.handled);
    assert_eq!(seen.borrow().as_slice(), ["annotate.begin"]);
}

#[test]
fn test_page_add_notifies_doc_listeners() {
    let (mut d, counts) = counted_dispatcher(2);
    let pages = d.add_pages(1, 1);
    assert_eq!(pages, vec![1]);
    assert_eq!(counts.borrow().pages_added, 1);
    assert_eq!(d.peek_next_undo_label(), "Undo: Add Pages");

    d.undo().unwrap();
    assert_eq!(d.doc().read().page_count(), 2);
    let fx = d.take_effects();
    assert!(fx.contains(&Effect::RebuildPageLayout));
}

#[test]
fn test_pinch_zoom_owned_by_neutral_mode() {
    let (mut d, _counts) = counted_dispatcher(1);
    let focus = Pt::new(100.0, 100.0);
    assert!(d.dispatch(&InputEvent::ScaleBegin { focus }).handled);
    assert!(d
        .dispatch(&InputEvent::Scale { focus, factor: 2.0 })
        .handled);
    assert!(d.dispatch(&InputEvent::ScaleEnd { focus }).handled);
    assert_eq!(d.viewport().scale(), 2.0);
}

#[test]
fn test_background_fonts_arrive_on_dispatch_thread() {
    let (mut d, _counts) = counted_dispatcher(1);
    // 完成消息只在分发循环里被取走
    for _ in 0..200 {
        d.dispatch(&InputEvent::FlingStop);
        if d.loaded_fonts().is_some() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    let fonts = d.loaded_fonts().expect("font tables should load");
    assert!(!fonts.is_empty());
}

#[test]
fn test_escape_from_creation_returns_to_neutral() {
    let (mut d, _counts) = counted_dispatcher(1);
    d.set_tool(ModeId::Builtin(ToolMode::ArrowCreate));
    let result = d.dispatch(&InputEvent::KeyUp(KeyInput::plain(Key::Escape)));
    assert!(result.handled);
    assert_eq!(d.mode(), ModeId::NEUTRAL);
    assert!(result.effects.iter().any(|e| matches!(
        e,
        Effect::ToolChanged {
            from: ModeId::Builtin(ToolMode::ArrowCreate),
            to: ModeId::NEUTRAL,
        }
    )));
}

#[test]
fn test_text_markup_creation_over_span() {
    let (mut d, counts) = counted_dispatcher(1);
    d.set_tool(ModeId::Builtin(ToolMode::TextHighlightCreate));
    d.dispatch(&press(50.0, 300.0));
    d.dispatch(&drag(50.0, 300.0, 260.0, 306.0));
    d.dispatch(&release(260.0, 306.0));

    assert_eq!(counts.borrow().added, 1);
    assert_eq!(d.peek_next_undo_label(), "Undo: Add Highlight");
    let doc = d.doc().read();
    let page = doc.page(1).unwrap();
    let rect = doc.annot_rect(page.annots()[0]).unwrap();
    // 行高下限保证标记可见
    assert!(rect.height() >= 12.0);
}
