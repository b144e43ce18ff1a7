//! 视口：屏幕坐标与页面坐标的换算
//!
//! 页面按纵向排列，统一缩放。这里只承担内核需要的最小几何职责：
//! 命中测试、选择框、撤销动画矩形都要经过这两个变换。

use crate::core::geometry::{PageIndex, Pt, Rect};
use crate::doc::PdfDoc;

const MIN_SCALE: f64 = 0.1;
const MAX_SCALE: f64 = 8.0;

#[derive(Debug, Clone)]
pub struct Viewport {
    scale: f64,
    scroll_x: f64,
    scroll_y: f64,
    page_gap: f64,
    current_page: PageIndex,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
            page_gap: 8.0,
            current_page: 1,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll_x = x;
        self.scroll_y = y;
    }

    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.scroll_x += dx;
        self.scroll_y += dy;
    }

    pub fn current_page(&self) -> PageIndex {
        self.current_page
    }

    /// Document-space top edge of a page (unscaled).
    fn page_top(&self, doc: &PdfDoc, page: PageIndex) -> Option<f64> {
        if page == 0 || page > doc.page_count() {
            return None;
        }
        let mut top = 0.0;
        for i in 1..page {
            top += doc.page(i)?.height + self.page_gap;
        }
        Some(top)
    }

    pub fn screen_to_page(&self, doc: &PdfDoc, pt: Pt) -> Option<(PageIndex, Pt)> {
        let doc_x = (pt.x + self.scroll_x) / self.scale;
        let doc_y = (pt.y + self.scroll_y) / self.scale;

        let mut top = 0.0;
        for page in 1..=doc.page_count() {
            let p = doc.page(page)?;
            if doc_y >= top && doc_y <= top + p.height && doc_x >= 0.0 && doc_x <= p.width {
                return Some((page, Pt::new(doc_x, doc_y - top)));
            }
            top += p.height + self.page_gap;
        }
        None
    }

    pub fn page_pt_to_screen(&self, doc: &PdfDoc, page: PageIndex, pt: Pt) -> Option<Pt> {
        let top = self.page_top(doc, page)?;
        Some(Pt::new(
            pt.x * self.scale - self.scroll_x,
            (pt.y + top) * self.scale - self.scroll_y,
        ))
    }

    pub fn page_rect_to_screen(&self, doc: &PdfDoc, page: PageIndex, rect: Rect) -> Option<Rect> {
        let a = self.page_pt_to_screen(doc, page, Pt::new(rect.x1, rect.y1))?;
        let b = self.page_pt_to_screen(doc, page, Pt::new(rect.x2, rect.y2))?;
        Some(Rect::from_points(a, b))
    }

    /// Jumps the viewport so the given page starts at the top edge.
    pub fn set_current_page(&mut self, doc: &PdfDoc, page: PageIndex) {
        let page = page.clamp(1, doc.page_count().max(1));
        if let Some(top) = self.page_top(doc, page) {
            self.scroll_y = top * self.scale;
            self.scroll_x = 0.0;
            self.current_page = page;
        }
    }

    /// Recomputes which page owns the current scroll position.
    pub fn sync_current_page(&mut self, doc: &PdfDoc) {
        let doc_y = self.scroll_y / self.scale;
        let mut top = 0.0;
        for page in 1..=doc.page_count() {
            let Some(p) = doc.page(page) else { break };
            if doc_y < top + p.height + self.page_gap {
                self.current_page = page;
                return;
            }
            top += p.height + self.page_gap;
        }
        self.current_page = doc.page_count().max(1);
    }
}
