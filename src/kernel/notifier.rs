//! 变更通知器
//!
//! 每次批注/文档结构变更都以 pre/post 钩子成对包裹，扇出给监听者。
//! 监听者只拿到"句柄 → 页码"的批次，不拿文档本体。

use crate::core::geometry::PageIndex;
use crate::models::annot::AnnotBatch;

/// Optional extra payload attached to a modification (which property
/// changed, dialog result, ...).
pub type ModifyExtra = serde_json::Value;

#[allow(unused_variables)]
pub trait AnnotationListener {
    fn on_added(&mut self, batch: &AnnotBatch) {}
    fn on_pre_modify(&mut self, batch: &AnnotBatch) {}
    fn on_modified(&mut self, batch: &AnnotBatch, extra: Option<&ModifyExtra>) {}
    fn on_pre_remove(&mut self, batch: &AnnotBatch) {}
    fn on_removed(&mut self, batch: &AnnotBatch) {}
    fn on_removed_on_page(&mut self, page: PageIndex) {}
    fn on_could_not_be_added(&mut self, message: &str) {}
}

#[allow(unused_variables)]
pub trait DocStructureListener {
    fn on_pages_added(&mut self, pages: &[PageIndex]) {}
    fn on_pages_deleted(&mut self, pages: &[PageIndex]) {}
    fn on_pages_rotated(&mut self, pages: &[PageIndex]) {}
    fn on_page_moved(&mut self, from: PageIndex, to: PageIndex) {}
    fn on_pages_cropped(&mut self) {}
    fn on_bookmark_modified(&mut self) {}
    fn on_all_annotations_removed(&mut self) {}
    fn on_annotation_action(&mut self) {}
}

#[derive(Default)]
pub struct MutationNotifier {
    annot_listeners: Vec<Box<dyn AnnotationListener>>,
    doc_listeners: Vec<Box<dyn DocStructureListener>>,
}

impl MutationNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_annotation_listener(&mut self, listener: Box<dyn AnnotationListener>) {
        self.annot_listeners.push(listener);
    }

    pub fn add_doc_listener(&mut self, listener: Box<dyn DocStructureListener>) {
        self.doc_listeners.push(listener);
    }

    pub fn annotations_added(&mut self, batch: &AnnotBatch) {
        for l in &mut self.annot_listeners {
            l.on_added(batch);
        }
    }

    pub fn annotations_pre_modify(&mut self, batch: &AnnotBatch) {
        for l in &mut self.annot_listeners {
            l.on_pre_modify(batch);
        }
    }

    pub fn annotations_modified(&mut self, batch: &AnnotBatch, extra: Option<&ModifyExtra>) {
        for l in &mut self.annot_listeners {
            l.on_modified(batch, extra);
        }
    }

    pub fn annotations_pre_remove(&mut self, batch: &AnnotBatch) {
        for l in &mut self.annot_listeners {
            l.on_pre_remove(batch);
        }
    }

    pub fn annotations_removed(&mut self, batch: &AnnotBatch) {
        for l in &mut self.annot_listeners {
            l.on_removed(batch);
        }
    }

    pub fn annotations_removed_on_page(&mut self, page: PageIndex) {
        for l in &mut self.annot_listeners {
            l.on_removed_on_page(page);
        }
    }

    pub fn annotations_could_not_be_added(&mut self, message: &str) {
        for l in &mut self.annot_listeners {
            l.on_could_not_be_added(message);
        }
    }

    pub fn pages_added(&mut self, pages: &[PageIndex]) {
        for l in &mut self.doc_listeners {
            l.on_pages_added(pages);
        }
    }

    pub fn pages_deleted(&mut self, pages: &[PageIndex]) {
        for l in &mut self.doc_listeners {
            l.on_pages_deleted(pages);
        }
    }

    pub fn pages_rotated(&mut self, pages: &[PageIndex]) {
        for l in &mut self.doc_listeners {
            l.on_pages_rotated(pages);
        }
    }

    pub fn page_moved(&mut self, from: PageIndex, to: PageIndex) {
        for l in &mut self.doc_listeners {
            l.on_page_moved(from, to);
        }
    }

    pub fn pages_cropped(&mut self) {
        for l in &mut self.doc_listeners {
            l.on_pages_cropped();
        }
    }

    pub fn bookmark_modified(&mut self) {
        for l in &mut self.doc_listeners {
            l.on_bookmark_modified();
        }
    }

    pub fn all_annotations_removed(&mut self) {
        for l in &mut self.doc_listeners {
            l.on_all_annotations_removed();
        }
    }

    pub fn annotation_action(&mut self) {
        for l in &mut self.doc_listeners {
            l.on_annotation_action();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counts {
        added: usize,
        pre_modify: usize,
        modified: usize,
        removed: usize,
    }

    struct Counter(Rc<RefCell<Counts>>);

    impl AnnotationListener for Counter {
        fn on_added(&mut self, _batch: &AnnotBatch) {
            self.0.borrow_mut().added += 1;
        }
        fn on_pre_modify(&mut self, _batch: &AnnotBatch) {
            self.0.borrow_mut().pre_modify += 1;
        }
        fn on_modified(&mut self, _batch: &AnnotBatch, _extra: Option<&ModifyExtra>) {
            self.0.borrow_mut().modified += 1;
        }
        fn on_removed(&mut self, _batch: &AnnotBatch) {
            self.0.borrow_mut().removed += 1;
        }
    }

    #[test]
    fn test_fan_out_to_all_listeners() {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut notifier = MutationNotifier::new();
        notifier.add_annotation_listener(Box::new(Counter(counts.clone())));
        notifier.add_annotation_listener(Box::new(Counter(counts.clone())));

        let batch = AnnotBatch::new();
        notifier.annotations_added(&batch);
        notifier.annotations_pre_modify(&batch);
        notifier.annotations_modified(&batch, None);
        notifier.annotations_removed(&batch);

        let c = counts.borrow();
        assert_eq!(c.added, 2);
        assert_eq!(c.pre_modify, 2);
        assert_eq!(c.modified, 2);
        assert_eq!(c.removed, 2);
    }

    #[test]
    fn test_doc_listener_defaults_are_noops() {
        struct Silent;
        impl DocStructureListener for Silent {}

        let mut notifier = MutationNotifier::new();
        notifier.add_doc_listener(Box::new(Silent));
        notifier.pages_added(&[1, 2]);
        notifier.page_moved(1, 2);
        notifier.annotation_action();
    }
}
