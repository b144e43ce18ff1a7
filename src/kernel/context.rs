//! 工具上下文
//!
//! 原型实现里工具通过全局单例反查管理器；这里改为一个显式的上下文对象，
//! 随每次事件分发传入。raise_* 系列把"通知监听者 → 喂撤销栈"的顺序
//! 固定下来，工具自己不直接碰通知器或撤销管理器。
//!
//! 约定：raise_* 的 `doc` 参数是调用方已持有的写守卫，不持独占锁
//! 就无法构造出 `&mut PdfDoc`，前置条件由类型系统兜底。

use tracing::warn;

use crate::core::geometry::PageIndex;
use crate::doc::{DocLock, PdfDoc};
use crate::models::annot::AnnotBatch;
use crate::services::config::ToolConfig;

use super::effect::Effect;
use super::mode::ModeRegistry;
use super::notifier::{ModifyExtra, MutationNotifier};
use super::undo::UndoRedoManager;
use super::viewport::Viewport;

pub struct ToolCtx<'a> {
    pub doc: &'a DocLock,
    pub viewport: &'a mut Viewport,
    pub config: &'a ToolConfig,
    pub registry: &'a ModeRegistry,
    pub(crate) notifier: &'a mut MutationNotifier,
    pub(crate) undo: &'a mut UndoRedoManager,
    pub(crate) effects: &'a mut Vec<Effect>,
}

impl ToolCtx<'_> {
    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    // ==================== annotation mutations ====================

    pub fn raise_annotations_added(&mut self, doc: &mut PdfDoc, batch: &AnnotBatch) {
        if batch.is_empty() {
            warn!("raise_annotations_added with empty batch");
            return;
        }
        self.notifier.annotations_added(batch);
        self.undo.on_annotations_added(doc, batch);
    }

    pub fn raise_annotations_pre_modify(&mut self, doc: &PdfDoc, batch: &AnnotBatch) {
        if batch.is_empty() {
            warn!("raise_annotations_pre_modify with empty batch");
            return;
        }
        self.notifier.annotations_pre_modify(batch);
        self.undo.on_annotations_pre_modify(doc, batch);
    }

    pub fn raise_annotations_modified(
        &mut self,
        doc: &mut PdfDoc,
        batch: &AnnotBatch,
        extra: Option<&ModifyExtra>,
    ) {
        if batch.is_empty() {
            warn!("raise_annotations_modified with empty batch");
            return;
        }
        self.notifier.annotations_modified(batch, extra);
        self.undo.on_annotations_modified(doc, batch);
    }

    pub fn raise_annotations_pre_remove(&mut self, doc: &PdfDoc, batch: &AnnotBatch) {
        if batch.is_empty() {
            warn!("raise_annotations_pre_remove with empty batch");
            return;
        }
        self.notifier.annotations_pre_remove(batch);
        self.undo.on_annotations_pre_remove(doc, batch);
    }

    pub fn raise_annotations_removed(&mut self, doc: &mut PdfDoc, batch: &AnnotBatch) {
        if batch.is_empty() {
            warn!("raise_annotations_removed with empty batch");
            return;
        }
        self.notifier.annotations_removed(batch);
        self.undo.on_annotations_removed(doc, batch);
    }

    pub fn raise_annotations_removed_on_page(&mut self, doc: &mut PdfDoc, page: PageIndex) {
        self.notifier.annotations_removed_on_page(page);
        self.undo.on_annotations_removed_on_page(doc, page);
    }

    pub fn raise_all_annotations_removed(&mut self, doc: &mut PdfDoc) {
        self.notifier.all_annotations_removed();
        self.undo.on_all_annotations_removed(doc);
    }

    pub fn raise_annotations_could_not_be_added(&mut self, message: &str) {
        self.notifier.annotations_could_not_be_added(message);
    }

    // ==================== document structure ====================

    pub fn raise_pages_added(&mut self, doc: &mut PdfDoc, pages: &[PageIndex]) {
        self.notifier.pages_added(pages);
        self.undo.on_pages_added(doc, pages);
    }

    pub fn raise_pages_deleted(&mut self, doc: &mut PdfDoc, pages: &[PageIndex]) {
        self.notifier.pages_deleted(pages);
        self.undo.on_pages_deleted(doc, pages);
    }

    pub fn raise_pages_rotated(&mut self, doc: &mut PdfDoc, pages: &[PageIndex]) {
        self.notifier.pages_rotated(pages);
        self.undo.on_pages_rotated(doc, pages);
    }

    pub fn raise_page_moved(&mut self, doc: &mut PdfDoc, from: PageIndex, to: PageIndex) {
        self.notifier.page_moved(from, to);
        self.undo.on_page_moved(doc, from, to);
    }

    pub fn raise_pages_cropped(&mut self, doc: &mut PdfDoc) {
        self.notifier.pages_cropped();
        self.undo.on_pages_cropped(doc);
    }

    pub fn raise_bookmark_modified(&mut self, doc: &mut PdfDoc) {
        self.notifier.bookmark_modified();
        self.undo.on_bookmark_modified(doc);
    }

    pub fn raise_annotation_action(&mut self, doc: &mut PdfDoc) {
        self.notifier.annotation_action();
        self.undo.on_annotation_action(doc);
    }
}
