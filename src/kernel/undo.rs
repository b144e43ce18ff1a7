//! Undo/redo manager: descriptive metadata over the engine's snapshot chain.
//!
//! The engine owns the authoritative linear history; this manager builds the
//! labels and geometry that ride along with each snapshot, filters safety
//! markers out of everything user-visible, and classifies entries so the
//! view knows whether page layout must be rebuilt.
//!
//! Every snapshot-taking method takes `&mut PdfDoc`: the caller must already
//! hold the exclusive document lock, there is no way to call these from a
//! read guard.

use compact_str::CompactString;
use tracing::{debug, warn};

use crate::core::geometry::{PageIndex, Rect};
use crate::doc::PdfDoc;
use crate::models::annot::{AnnotBatch, AnnotKind};
use crate::models::undo_entry::{UndoActionKind, UndoEntry};

use super::effect::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UndoState {
    Idle,
    Snapshotting,
    Undoing,
    Redoing,
}

pub struct UndoRedoManager {
    state: UndoState,
    /// Union rect + page captured by the pre-modify hook; discarded when the
    /// batch spans more than one page.
    pre_modify: Option<(PageIndex, Rect)>,
    /// Geometry and kinds captured by the pre-remove hook, keyed by batch
    /// order; the post-remove hook can no longer read them from the engine.
    pre_remove: Vec<(PageIndex, Rect)>,
    pre_remove_kinds: Vec<AnnotKind>,
}

impl Default for UndoRedoManager {
    fn default() -> Self {
        Self {
            state: UndoState::Idle,
            pre_modify: None,
            pre_remove: Vec::new(),
            pre_remove_kinds: Vec::new(),
        }
    }
}

impl UndoRedoManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&mut self, next: UndoState) -> bool {
        if self.state != UndoState::Idle {
            warn!(?next, current = ?self.state, "undo manager re-entered; ignoring");
            return false;
        }
        self.state = next;
        true
    }

    // ==================== annotation hooks ====================

    pub fn on_annotations_added(&mut self, doc: &mut PdfDoc, batch: &AnnotBatch) {
        if batch.is_empty() {
            warn!("annotations_added with empty batch");
            return;
        }
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        let mut entry = UndoEntry::new(
            batch_label("Add", doc, batch),
            UndoActionKind::Add,
        );
        (entry.pages, entry.rects) = collect_geometry(doc, batch);
        doc.take_undo_snapshot(&entry.to_json());
        debug!(label = %entry.label, "undo snapshot");
        self.state = UndoState::Idle;
    }

    /// Captures pre-modify geometry so undo can animate back to the edited
    /// region. Batches spanning multiple pages discard the union rect (the
    /// documented edge case, not an error).
    pub fn on_annotations_pre_modify(&mut self, doc: &PdfDoc, batch: &AnnotBatch) {
        self.pre_modify = None;
        let mut page = 0;
        let mut union: Option<Rect> = None;
        for (id, p) in batch.iter() {
            if page != 0 && page != p {
                return;
            }
            page = p;
            match doc.annot_rect(id) {
                Some(rect) => {
                    union = Some(match union {
                        Some(u) => u.union(rect),
                        None => rect,
                    });
                }
                None => warn!("pre_modify with dead annotation handle"),
            }
        }
        if page != 0 {
            if let Some(rect) = union {
                self.pre_modify = Some((page, rect));
            }
        }
    }

    pub fn on_annotations_modified(&mut self, doc: &mut PdfDoc, batch: &AnnotBatch) {
        if batch.is_empty() {
            warn!("annotations_modified with empty batch");
            return;
        }
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        let mut entry = UndoEntry::new(
            batch_label("Modify", doc, batch),
            UndoActionKind::Modify,
        );
        (entry.pages, entry.rects) = collect_geometry(doc, batch);
        if let Some((page, rect)) = self.pre_modify.take() {
            entry.pre_page = Some(page);
            entry.pre_rect = Some(rect.to_quad());
        }
        doc.take_undo_snapshot(&entry.to_json());
        debug!(label = %entry.label, "undo snapshot");
        self.state = UndoState::Idle;
    }

    /// Remembers geometry and kinds of annotations about to disappear.
    pub fn on_annotations_pre_remove(&mut self, doc: &PdfDoc, batch: &AnnotBatch) {
        self.pre_remove.clear();
        self.pre_remove_kinds.clear();
        for (id, page) in batch.iter() {
            match doc.annot(id) {
                Some(annot) => {
                    self.pre_remove.push((page, annot.rect));
                    self.pre_remove_kinds.push(annot.kind);
                }
                None => warn!("pre_remove with dead annotation handle"),
            }
        }
    }

    pub fn on_annotations_removed(&mut self, doc: &mut PdfDoc, batch: &AnnotBatch) {
        if batch.is_empty() {
            warn!("annotations_removed with empty batch");
            return;
        }
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        let kinds = std::mem::take(&mut self.pre_remove_kinds);
        let mut entry = UndoEntry::new(
            kinds_label("Remove", &kinds, batch.len()),
            UndoActionKind::Remove,
        );
        for (page, rect) in self.pre_remove.drain(..) {
            entry.pages.push(page);
            entry.rects.push(rect.to_quad());
        }
        doc.take_undo_snapshot(&entry.to_json());
        debug!(label = %entry.label, "undo snapshot");
        self.state = UndoState::Idle;
    }

    pub fn on_annotations_removed_on_page(&mut self, doc: &mut PdfDoc, page: PageIndex) {
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        let mut entry = UndoEntry::new(
            format!("Remove Annotations from Page {}", page),
            UndoActionKind::Remove,
        );
        entry.pages = vec![page];
        doc.take_undo_snapshot(&entry.to_json());
        self.state = UndoState::Idle;
    }

    pub fn on_all_annotations_removed(&mut self, doc: &mut PdfDoc) {
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        let entry = UndoEntry::new("Remove All Annotations", UndoActionKind::Remove);
        doc.take_undo_snapshot(&entry.to_json());
        self.state = UndoState::Idle;
    }

    // ==================== document-structure hooks ====================

    pub fn on_pages_added(&mut self, doc: &mut PdfDoc, pages: &[PageIndex]) {
        self.page_list_snapshot(doc, "Add Pages", UndoActionKind::PageAdd, pages);
    }

    pub fn on_pages_deleted(&mut self, doc: &mut PdfDoc, pages: &[PageIndex]) {
        self.page_list_snapshot(doc, "Delete Pages", UndoActionKind::PageDelete, pages);
    }

    pub fn on_pages_rotated(&mut self, doc: &mut PdfDoc, pages: &[PageIndex]) {
        self.page_list_snapshot(doc, "Rotate Pages", UndoActionKind::PageRotate, pages);
    }

    fn page_list_snapshot(
        &mut self,
        doc: &mut PdfDoc,
        label: &str,
        action: UndoActionKind,
        pages: &[PageIndex],
    ) {
        if pages.is_empty() {
            warn!(label, "page snapshot with empty page list");
            return;
        }
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        let mut entry = UndoEntry::new(label, action);
        entry.pages = pages.to_vec();
        doc.take_undo_snapshot(&entry.to_json());
        self.state = UndoState::Idle;
    }

    pub fn on_page_moved(&mut self, doc: &mut PdfDoc, from: PageIndex, to: PageIndex) {
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        let mut entry = UndoEntry::new("Move Page", UndoActionKind::PageMove);
        entry.page_from = Some(from);
        entry.page_to = Some(to);
        doc.take_undo_snapshot(&entry.to_json());
        self.state = UndoState::Idle;
    }

    pub fn on_pages_cropped(&mut self, doc: &mut PdfDoc) {
        self.plain_snapshot(doc, "Crop Pages", UndoActionKind::Crop);
    }

    pub fn on_bookmark_modified(&mut self, doc: &mut PdfDoc) {
        self.plain_snapshot(doc, "Modify Bookmarks", UndoActionKind::Bookmark);
    }

    pub fn on_annotation_action(&mut self, doc: &mut PdfDoc) {
        self.plain_snapshot(doc, "Execute Action", UndoActionKind::GenericAction);
    }

    fn plain_snapshot(&mut self, doc: &mut PdfDoc, label: &str, action: UndoActionKind) {
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        doc.take_undo_snapshot(&UndoEntry::new(label, action).to_json());
        self.state = UndoState::Idle;
    }

    // ==================== safety markers ====================

    /// Taken before persisting so a partial save never becomes undoable.
    /// No-op when nothing changed since the last snapshot.
    pub fn take_snapshot_for_safety(&mut self, doc: &mut PdfDoc) {
        if !doc.has_changes_since_snapshot() {
            return;
        }
        if !self.enter(UndoState::Snapshotting) {
            return;
        }
        doc.take_undo_snapshot(&UndoEntry::safety_marker().to_json());
        debug!("snapshot for safety");
        self.state = UndoState::Idle;
    }

    fn discard_trailing_safety(doc: &mut PdfDoc, is_undo: bool) {
        loop {
            let meta = if is_undo {
                doc.next_undo_info()
            } else {
                doc.next_redo_info()
            };
            let Ok(meta) = meta else { break };
            if !UndoEntry::from_json(meta).safety {
                break;
            }
            let dropped = if is_undo { doc.undo() } else { doc.redo() };
            if dropped.is_err() {
                break;
            }
        }
    }

    // ==================== undo / redo ====================

    /// Undoes the last real edit. Trailing safety markers are silently
    /// dropped first. Returns the undone entry, or `None` when the chain is
    /// exhausted.
    pub fn undo(&mut self, doc: &mut PdfDoc) -> Option<UndoEntry> {
        if !self.enter(UndoState::Undoing) {
            return None;
        }
        Self::discard_trailing_safety(doc, true);
        let result = match doc.undo() {
            Ok(meta) => Some(UndoEntry::from_json(&meta)),
            Err(e) => {
                debug!(error = %e, "undo");
                None
            }
        };
        self.pre_modify = None;
        self.state = UndoState::Idle;
        result
    }

    pub fn redo(&mut self, doc: &mut PdfDoc) -> Option<UndoEntry> {
        if !self.enter(UndoState::Redoing) {
            return None;
        }
        Self::discard_trailing_safety(doc, false);
        let result = match doc.redo() {
            Ok(meta) => Some(UndoEntry::from_json(&meta)),
            Err(e) => {
                debug!(error = %e, "redo");
                None
            }
        };
        self.pre_modify = None;
        self.state = UndoState::Idle;
        result
    }

    // ==================== peeks ====================

    /// User-visible label of the next undoable action. Safety markers are
    /// skipped; absent or malformed metadata yields an empty label.
    pub fn peek_next_undo_label(&self, doc: &PdfDoc) -> CompactString {
        Self::peek_label(doc.undo_history(), "Undo")
    }

    pub fn peek_next_redo_label(&self, doc: &PdfDoc) -> CompactString {
        Self::peek_label(doc.redo_history(), "Redo")
    }

    fn peek_label<'a>(
        metas: impl Iterator<Item = &'a str>,
        prefix: &str,
    ) -> CompactString {
        for meta in metas {
            let entry = UndoEntry::from_json(meta);
            if entry.safety {
                continue;
            }
            if entry.label.is_empty() {
                return CompactString::new("");
            }
            return CompactString::from(format!("{}: {}", prefix, entry.label));
        }
        CompactString::new("")
    }

    pub fn can_undo(&self, doc: &PdfDoc) -> bool {
        !self.peek_next_undo_label(doc).is_empty()
    }

    pub fn can_redo(&self, doc: &PdfDoc) -> bool {
        !self.peek_next_redo_label(doc).is_empty()
    }

    /// Whether the next undoable action is a page edit (layout rebuild).
    pub fn is_next_undo_page_edit(&self, doc: &PdfDoc) -> bool {
        doc.undo_history()
            .map(UndoEntry::from_json)
            .find(|e| !e.safety)
            .is_some_and(|e| e.action.is_page_edit())
    }

    pub fn is_next_redo_page_edit(&self, doc: &PdfDoc) -> bool {
        doc.redo_history()
            .map(UndoEntry::from_json)
            .find(|e| !e.safety)
            .is_some_and(|e| e.action.is_page_edit())
    }
}

/// View restoration after undo/redo: which page to show, what to animate.
pub fn jump_effects(entry: &UndoEntry, is_undo: bool, current_page: PageIndex) -> Vec<Effect> {
    let mut effects = Vec::new();
    if entry.action.is_page_edit() {
        effects.push(Effect::RebuildPageLayout);
        let min_page = entry.pages.iter().copied().min();
        match entry.action {
            UndoActionKind::PageDelete => {
                if let Some(min) = min_page {
                    let page = if is_undo { min } else { min.saturating_sub(1).max(1) };
                    effects.push(Effect::ScrollToPage(page));
                }
            }
            UndoActionKind::PageAdd => {
                if let Some(min) = min_page {
                    let page = if is_undo { min.saturating_sub(1).max(1) } else { min };
                    effects.push(Effect::ScrollToPage(page));
                }
            }
            UndoActionKind::PageRotate => {
                if let Some(min) = min_page {
                    if !entry.pages.contains(&current_page) {
                        effects.push(Effect::ScrollToPage(min));
                    }
                }
            }
            UndoActionKind::PageMove => {
                let target = if is_undo { entry.page_from } else { entry.page_to };
                if let Some(page) = target {
                    effects.push(Effect::ScrollToPage(page));
                }
            }
            _ => {}
        }
        return effects;
    }

    // annotation edit: animate back to the edited region
    if entry.action == UndoActionKind::Modify && is_undo {
        if let (Some(page), Some(rect)) = (entry.pre_page, entry.pre_rect) {
            effects.push(Effect::AnimateRect {
                page,
                rect: Rect::from_quad(rect),
            });
            return effects;
        }
    }
    for (page, rect) in entry.pages.iter().zip(entry.rects.iter()) {
        effects.push(Effect::AnimateRect {
            page: *page,
            rect: Rect::from_quad(*rect),
        });
    }
    effects
}

fn collect_geometry(doc: &PdfDoc, batch: &AnnotBatch) -> (Vec<PageIndex>, Vec<[f64; 4]>) {
    let mut pages = Vec::with_capacity(batch.len());
    let mut rects = Vec::with_capacity(batch.len());
    for (id, page) in batch.iter() {
        match doc.annot_rect(id) {
            Some(rect) => {
                pages.push(page);
                rects.push(rect.to_quad());
            }
            None => warn!("snapshot geometry skipped dead annotation handle"),
        }
    }
    (pages, rects)
}

fn batch_label(action: &str, doc: &PdfDoc, batch: &AnnotBatch) -> String {
    let kinds: Vec<AnnotKind> = batch
        .iter()
        .filter_map(|(id, _)| doc.annot(id).map(|a| a.kind))
        .collect();
    kinds_label(action, &kinds, batch.len())
}

fn kinds_label(action: &str, kinds: &[AnnotKind], count: usize) -> String {
    let Some(&first) = kinds.first() else {
        return format!("{} Annotations", action);
    };
    if kinds.iter().any(|&k| k != first) {
        return format!("{} Annotations", action);
    }
    if count > 1 {
        format!("{} {}", action, first.plural_label())
    } else {
        format!("{} {}", action, first.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annot::Annot;

    fn doc_with_annot(kind: AnnotKind, page: PageIndex, rect: Rect) -> (PdfDoc, AnnotBatch) {
        let mut doc = PdfDoc::new(5);
        let id = doc.add_annot(page, Annot::new(kind, rect)).unwrap();
        (doc, AnnotBatch::single(id, page))
    }

    #[test]
    fn test_add_snapshot_label_and_geometry() {
        let rect = Rect::new(10.0, 10.0, 60.0, 60.0);
        let (mut doc, batch) = doc_with_annot(AnnotKind::Square, 3, rect);

        let mut undo = UndoRedoManager::new();
        undo.on_annotations_added(&mut doc, &batch);

        assert_eq!(undo.peek_next_undo_label(&doc), "Undo: Add Square");
        let entry = UndoEntry::from_json(doc.next_undo_info().unwrap());
        assert_eq!(entry.pages, vec![3]);
        assert_eq!(entry.rects, vec![rect.to_quad()]);
    }

    #[test]
    fn test_mixed_kinds_label() {
        let mut doc = PdfDoc::new(1);
        let a = doc
            .add_annot(1, Annot::new(AnnotKind::Square, Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        let b = doc
            .add_annot(1, Annot::new(AnnotKind::Circle, Rect::new(5.0, 5.0, 9.0, 9.0)))
            .unwrap();
        let mut batch = AnnotBatch::new();
        batch.push(a, 1);
        batch.push(b, 1);

        let mut undo = UndoRedoManager::new();
        undo.on_annotations_added(&mut doc, &batch);
        assert_eq!(undo.peek_next_undo_label(&doc), "Undo: Add Annotations");
    }

    #[test]
    fn test_undo_redo_round_trip_restores_content() {
        let rect = Rect::new(10.0, 10.0, 60.0, 60.0);
        let (mut doc, batch) = doc_with_annot(AnnotKind::Square, 2, rect);
        let (id, _) = batch.single_entry().unwrap();
        doc.take_undo_snapshot(&UndoEntry::new("base", UndoActionKind::GenericAction).to_json());

        let mut undo = UndoRedoManager::new();
        let moved = Rect::new(100.0, 100.0, 150.0, 150.0);
        undo.on_annotations_pre_modify(&doc, &batch);
        doc.set_annot_rect(id, moved).unwrap();
        undo.on_annotations_modified(&mut doc, &batch);

        let entry = undo.undo(&mut doc).unwrap();
        assert_eq!(entry.action, UndoActionKind::Modify);
        assert_eq!(entry.pre_page, Some(2));
        assert_eq!(entry.pre_rect, Some(rect.to_quad()));
        assert_eq!(doc.annot_rect(id), Some(rect));

        let entry = undo.redo(&mut doc).unwrap();
        assert_eq!(entry.action, UndoActionKind::Modify);
        assert_eq!(doc.annot_rect(id), Some(moved));
    }

    #[test]
    fn test_pre_modify_union_discarded_across_pages() {
        let mut doc = PdfDoc::new(3);
        let a = doc
            .add_annot(1, Annot::new(AnnotKind::Square, Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        let b = doc
            .add_annot(2, Annot::new(AnnotKind::Square, Rect::new(0.0, 0.0, 5.0, 5.0)))
            .unwrap();
        let mut batch = AnnotBatch::new();
        batch.push(a, 1);
        batch.push(b, 2);

        let mut undo = UndoRedoManager::new();
        undo.on_annotations_pre_modify(&doc, &batch);
        undo.on_annotations_modified(&mut doc, &batch);

        let entry = UndoEntry::from_json(doc.next_undo_info().unwrap());
        assert_eq!(entry.pre_page, None);
        assert_eq!(entry.pre_rect, None);
    }

    #[test]
    fn test_single_undo_discards_trailing_safety_markers() {
        let (mut doc, batch) = doc_with_annot(AnnotKind::Ink, 1, Rect::new(0.0, 0.0, 9.0, 9.0));
        let (id, _) = batch.single_entry().unwrap();

        let mut undo = UndoRedoManager::new();
        undo.on_annotations_added(&mut doc, &batch);

        // 两个安全标记叠在真实编辑之上
        doc.add_bookmark("scratch", 1);
        undo.take_snapshot_for_safety(&mut doc);
        doc.add_bookmark("scratch2", 1);
        undo.take_snapshot_for_safety(&mut doc);

        // peek 永远不暴露安全标记
        assert_eq!(undo.peek_next_undo_label(&doc), "Undo: Add Ink");

        let entry = undo.undo(&mut doc).unwrap();
        assert_eq!(entry.action, UndoActionKind::Add);
        assert!(!entry.safety);
        assert!(!doc.is_valid(id));
    }

    #[test]
    fn test_remove_uses_pre_captured_geometry() {
        let rect = Rect::new(5.0, 5.0, 25.0, 25.0);
        let (mut doc, batch) = doc_with_annot(AnnotKind::Note, 4, rect);
        let (id, _) = batch.single_entry().unwrap();

        let mut undo = UndoRedoManager::new();
        undo.on_annotations_pre_remove(&doc, &batch);
        doc.remove_annot(id).unwrap();
        undo.on_annotations_removed(&mut doc, &batch);

        assert_eq!(undo.peek_next_undo_label(&doc), "Undo: Remove Note");
        let entry = UndoEntry::from_json(doc.next_undo_info().unwrap());
        assert_eq!(entry.pages, vec![4]);
        assert_eq!(entry.rects, vec![rect.to_quad()]);
    }

    #[test]
    fn test_safety_snapshot_skipped_when_clean() {
        let mut doc = PdfDoc::new(1);
        let mut undo = UndoRedoManager::new();
        undo.take_snapshot_for_safety(&mut doc);
        assert!(doc.next_undo_info().is_err());
    }

    #[test]
    fn test_peek_tolerates_malformed_metadata() {
        let mut doc = PdfDoc::new(1);
        doc.add_bookmark("x", 1);
        doc.take_undo_snapshot("{{{ not json");

        let undo = UndoRedoManager::new();
        assert_eq!(undo.peek_next_undo_label(&doc), "");
        assert!(!undo.can_undo(&doc));
    }

    #[test]
    fn test_empty_chain_undo_is_none() {
        let mut doc = PdfDoc::new(1);
        let mut undo = UndoRedoManager::new();
        assert!(undo.undo(&mut doc).is_none());
        assert!(undo.redo(&mut doc).is_none());
    }

    #[test]
    fn test_page_edit_classification_via_peek() {
        let mut doc = PdfDoc::new(2);
        let mut undo = UndoRedoManager::new();
        let pages = doc.add_pages(3, 1);
        undo.on_pages_added(&mut doc, &pages);

        assert!(undo.is_next_undo_page_edit(&doc));
        assert_eq!(undo.peek_next_undo_label(&doc), "Undo: Add Pages");
    }

    #[test]
    fn test_jump_effects_for_page_delete() {
        let mut entry = UndoEntry::new("Delete Pages", UndoActionKind::PageDelete);
        entry.pages = vec![4, 5];

        let undo_fx = jump_effects(&entry, true, 1);
        assert!(undo_fx.contains(&Effect::RebuildPageLayout));
        assert!(undo_fx.contains(&Effect::ScrollToPage(4)));

        let redo_fx = jump_effects(&entry, false, 1);
        assert!(redo_fx.contains(&Effect::ScrollToPage(3)));
    }

    #[test]
    fn test_jump_effects_for_modify_uses_pre_rect_on_undo() {
        let mut entry = UndoEntry::new("Modify Square", UndoActionKind::Modify);
        entry.pages = vec![2];
        entry.rects = vec![[50.0, 50.0, 90.0, 90.0]];
        entry.pre_page = Some(2);
        entry.pre_rect = Some([10.0, 10.0, 40.0, 40.0]);

        let fx = jump_effects(&entry, true, 1);
        assert_eq!(
            fx,
            vec![Effect::AnimateRect {
                page: 2,
                rect: Rect::new(10.0, 10.0, 40.0, 40.0)
            }]
        );

        let fx = jump_effects(&entry, false, 1);
        assert_eq!(
            fx,
            vec![Effect::AnimateRect {
                page: 2,
                rect: Rect::new(50.0, 50.0, 90.0, 90.0)
            }]
        );
    }

    #[test]
    fn test_rotate_keeps_view_when_current_page_rotated() {
        let mut entry = UndoEntry::new("Rotate Pages", UndoActionKind::PageRotate);
        entry.pages = vec![2, 3];

        let fx = jump_effects(&entry, true, 2);
        assert_eq!(fx, vec![Effect::RebuildPageLayout]);

        let fx = jump_effects(&entry, true, 5);
        assert!(fx.contains(&Effect::ScrollToPage(2)));
    }
}
