//! 文档引擎
//!
//! 规格里的"外部协作者"：持有页面、批注与权威的线性快照历史。
//! 内核只通过这里的公开接口触碰文档；真实产品中这一层换成引擎绑定。
//!
//! 页码从 1 开始。批注句柄是代际键，undo/redo 恢复旧状态后，
//! 被撤销的新增批注查询即失效，重做后同一句柄恢复有效。

mod history;
pub mod lock;

use std::fmt;

use compact_str::CompactString;
use slotmap::SlotMap;

use crate::core::geometry::{PageIndex, Pt, Rect};
use crate::models::annot::{Annot, AnnotId};

use history::SnapshotChain;
pub use lock::DocLock;

pub const DEFAULT_PAGE_WIDTH: f64 = 612.0;
pub const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

#[derive(Debug)]
pub enum DocError {
    InvalidPage(PageIndex),
    InvalidAnnot,
    NothingToUndo,
    NothingToRedo,
}

impl fmt::Display for DocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocError::InvalidPage(page) => write!(f, "invalid page number: {}", page),
            DocError::InvalidAnnot => write!(f, "annotation handle is no longer valid"),
            DocError::NothingToUndo => write!(f, "undo state not found"),
            DocError::NothingToRedo => write!(f, "redo state not found"),
        }
    }
}

impl std::error::Error for DocError {}

#[derive(Debug, Clone)]
pub struct Page {
    pub width: f64,
    pub height: f64,
    /// Quarter turns, 0..=3.
    pub rotation: u8,
    pub crop: Option<Rect>,
    annots: Vec<AnnotId>,
}

impl Page {
    fn letter() -> Self {
        Self {
            width: DEFAULT_PAGE_WIDTH,
            height: DEFAULT_PAGE_HEIGHT,
            rotation: 0,
            crop: None,
            annots: Vec::new(),
        }
    }

    pub fn annots(&self) -> &[AnnotId] {
        &self.annots
    }
}

#[derive(Clone)]
pub(crate) struct DocCore {
    pages: Vec<Page>,
    annots: SlotMap<AnnotId, Annot>,
    bookmarks: Vec<(CompactString, PageIndex)>,
}

impl DocCore {
    pub(crate) fn with_pages(count: u32) -> Self {
        Self {
            pages: (0..count).map(|_| Page::letter()).collect(),
            annots: SlotMap::with_key(),
            bookmarks: Vec::new(),
        }
    }
}

pub struct PdfDoc {
    core: DocCore,
    history: SnapshotChain,
    dirty_since_snapshot: bool,
}

impl PdfDoc {
    pub fn new(page_count: u32) -> Self {
        let core = DocCore::with_pages(page_count);
        Self {
            history: SnapshotChain::new(core.clone()),
            core,
            dirty_since_snapshot: false,
        }
    }

    // ==================== 页面 ====================

    pub fn page_count(&self) -> u32 {
        self.core.pages.len() as u32
    }

    pub fn page(&self, page: PageIndex) -> Option<&Page> {
        if page == 0 {
            return None;
        }
        self.core.pages.get(page as usize - 1)
    }

    fn page_mut(&mut self, page: PageIndex) -> Result<&mut Page, DocError> {
        if page == 0 {
            return Err(DocError::InvalidPage(page));
        }
        self.core
            .pages
            .get_mut(page as usize - 1)
            .ok_or(DocError::InvalidPage(page))
    }

    /// Inserts `count` blank pages before `at` (clamped to the end).
    /// Returns the new page numbers.
    pub fn add_pages(&mut self, at: PageIndex, count: u32) -> Vec<PageIndex> {
        let at = (at.max(1) as usize - 1).min(self.core.pages.len());
        for i in 0..count {
            self.core.pages.insert(at + i as usize, Page::letter());
        }
        self.dirty_since_snapshot = true;
        (0..count).map(|i| at as PageIndex + i + 1).collect()
    }

    /// Removes the listed pages and every annotation on them.
    pub fn delete_pages(&mut self, pages: &[PageIndex]) -> Result<(), DocError> {
        let mut sorted: Vec<PageIndex> = pages.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &page in &sorted {
            if self.page(page).is_none() {
                return Err(DocError::InvalidPage(page));
            }
        }
        for &page in sorted.iter().rev() {
            let removed = self.core.pages.remove(page as usize - 1);
            for id in removed.annots {
                self.core.annots.remove(id);
            }
        }
        self.dirty_since_snapshot = true;
        Ok(())
    }

    pub fn rotate_pages(&mut self, pages: &[PageIndex]) -> Result<(), DocError> {
        for &page in pages {
            let p = self.page_mut(page)?;
            p.rotation = (p.rotation + 1) % 4;
        }
        self.dirty_since_snapshot = true;
        Ok(())
    }

    pub fn move_page(&mut self, from: PageIndex, to: PageIndex) -> Result<(), DocError> {
        if self.page(from).is_none() {
            return Err(DocError::InvalidPage(from));
        }
        if self.page(to).is_none() {
            return Err(DocError::InvalidPage(to));
        }
        let page = self.core.pages.remove(from as usize - 1);
        self.core.pages.insert(to as usize - 1, page);
        self.dirty_since_snapshot = true;
        Ok(())
    }

    pub fn crop_page(&mut self, page: PageIndex, crop: Rect) -> Result<(), DocError> {
        self.page_mut(page)?.crop = Some(crop.normalized());
        self.dirty_since_snapshot = true;
        Ok(())
    }

    // ==================== 书签 ====================

    pub fn add_bookmark(&mut self, label: &str, page: PageIndex) {
        self.core
            .bookmarks
            .push((CompactString::from(label), page));
        self.dirty_since_snapshot = true;
    }

    pub fn bookmarks(&self) -> &[(CompactString, PageIndex)] {
        &self.core.bookmarks
    }

    // ==================== 批注 ====================

    pub fn add_annot(&mut self, page: PageIndex, annot: Annot) -> Result<AnnotId, DocError> {
        if self.page(page).is_none() {
            return Err(DocError::InvalidPage(page));
        }
        let id = self.core.annots.insert(annot);
        self.core.pages[page as usize - 1].annots.push(id);
        self.dirty_since_snapshot = true;
        Ok(id)
    }

    /// Liveness check; the engine may have dropped the handle independently.
    pub fn is_valid(&self, id: AnnotId) -> bool {
        self.core.annots.contains_key(id)
    }

    pub fn annot(&self, id: AnnotId) -> Option<&Annot> {
        self.core.annots.get(id)
    }

    pub fn annot_rect(&self, id: AnnotId) -> Option<Rect> {
        self.core.annots.get(id).map(|a| a.rect)
    }

    pub fn annot_page(&self, id: AnnotId) -> Option<PageIndex> {
        self.core
            .pages
            .iter()
            .position(|p| p.annots.contains(&id))
            .map(|i| i as PageIndex + 1)
    }

    pub fn set_annot_rect(&mut self, id: AnnotId, rect: Rect) -> Result<(), DocError> {
        let annot = self.core.annots.get_mut(id).ok_or(DocError::InvalidAnnot)?;
        annot.rect = rect.normalized();
        self.dirty_since_snapshot = true;
        Ok(())
    }

    pub fn set_annot_contents(&mut self, id: AnnotId, contents: &str) -> Result<(), DocError> {
        let annot = self.core.annots.get_mut(id).ok_or(DocError::InvalidAnnot)?;
        annot.contents = CompactString::from(contents);
        self.dirty_since_snapshot = true;
        Ok(())
    }

    pub fn remove_annot(&mut self, id: AnnotId) -> Result<(), DocError> {
        if self.core.annots.remove(id).is_none() {
            return Err(DocError::InvalidAnnot);
        }
        for page in &mut self.core.pages {
            page.annots.retain(|a| *a != id);
        }
        self.dirty_since_snapshot = true;
        Ok(())
    }

    pub fn remove_annots_on_page(&mut self, page: PageIndex) -> Result<Vec<AnnotId>, DocError> {
        if self.page(page).is_none() {
            return Err(DocError::InvalidPage(page));
        }
        let removed = std::mem::take(&mut self.core.pages[page as usize - 1].annots);
        for &id in &removed {
            self.core.annots.remove(id);
        }
        self.dirty_since_snapshot = true;
        Ok(removed)
    }

    pub fn remove_all_annots(&mut self) {
        self.core.annots.clear();
        for page in &mut self.core.pages {
            page.annots.clear();
        }
        self.dirty_since_snapshot = true;
    }

    /// Topmost annotation under a page-space point.
    pub fn annot_at(&self, page: PageIndex, pt: Pt) -> Option<AnnotId> {
        let page = self.page(page)?;
        page.annots
            .iter()
            .rev()
            .copied()
            .find(|&id| {
                self.core
                    .annots
                    .get(id)
                    .is_some_and(|a| a.rect.contains(pt))
            })
    }

    // ==================== 快照历史 ====================

    /// Marks the current state with `meta` and appends it to the linear
    /// history, truncating any redo tail.
    pub fn take_undo_snapshot(&mut self, meta: &str) {
        self.history.take(meta, &self.core);
        self.dirty_since_snapshot = false;
    }

    pub fn undo(&mut self) -> Result<String, DocError> {
        let (meta, core) = self.history.undo().ok_or(DocError::NothingToUndo)?;
        self.core = core;
        self.dirty_since_snapshot = false;
        Ok(meta)
    }

    pub fn redo(&mut self) -> Result<String, DocError> {
        let (meta, core) = self.history.redo().ok_or(DocError::NothingToRedo)?;
        self.core = core;
        self.dirty_since_snapshot = false;
        Ok(meta)
    }

    pub fn next_undo_info(&self) -> Result<&str, DocError> {
        self.history.next_undo_meta().ok_or(DocError::NothingToUndo)
    }

    pub fn next_redo_info(&self) -> Result<&str, DocError> {
        self.history.next_redo_meta().ok_or(DocError::NothingToRedo)
    }

    /// Undoable snapshot metas, newest first.
    pub fn undo_history(&self) -> impl Iterator<Item = &str> {
        self.history.undo_metas()
    }

    /// Redoable snapshot metas, nearest first.
    pub fn redo_history(&self) -> impl Iterator<Item = &str> {
        self.history.redo_metas()
    }

    pub fn has_changes_since_snapshot(&self) -> bool {
        self.dirty_since_snapshot
    }
}
