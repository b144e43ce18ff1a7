//! 批注数据模型
//!
//! `AnnotId` 是 slotmap 的代际键：文档引擎可能独立地增删批注，
//! 持有者在每次使用前都要重新验证存活性，代际查询天然给出这一语义。

use compact_str::CompactString;
use slotmap::new_key_type;

use crate::core::geometry::{PageIndex, Rect};

new_key_type! {
    /// Borrowed handle into the document engine. Never owns the annotation.
    pub struct AnnotId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotKind {
    Note,
    Link,
    FreeText,
    Callout,
    Line,
    Square,
    Circle,
    Polygon,
    Polyline,
    Cloud,
    Highlight,
    Underline,
    Squiggly,
    StrikeOut,
    Redact,
    Ink,
    Stamp,
    Sound,
    FileAttachment,
    Widget,
}

impl AnnotKind {
    pub const ALL: [AnnotKind; 20] = [
        AnnotKind::Note,
        AnnotKind::Link,
        AnnotKind::FreeText,
        AnnotKind::Callout,
        AnnotKind::Line,
        AnnotKind::Square,
        AnnotKind::Circle,
        AnnotKind::Polygon,
        AnnotKind::Polyline,
        AnnotKind::Cloud,
        AnnotKind::Highlight,
        AnnotKind::Underline,
        AnnotKind::Squiggly,
        AnnotKind::StrikeOut,
        AnnotKind::Redact,
        AnnotKind::Ink,
        AnnotKind::Stamp,
        AnnotKind::Sound,
        AnnotKind::FileAttachment,
        AnnotKind::Widget,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AnnotKind::Note => "Note",
            AnnotKind::Link => "Link",
            AnnotKind::FreeText => "Free Text",
            AnnotKind::Callout => "Callout",
            AnnotKind::Line => "Line",
            AnnotKind::Square => "Square",
            AnnotKind::Circle => "Circle",
            AnnotKind::Polygon => "Polygon",
            AnnotKind::Polyline => "Polyline",
            AnnotKind::Cloud => "Cloud",
            AnnotKind::Highlight => "Highlight",
            AnnotKind::Underline => "Underline",
            AnnotKind::Squiggly => "Squiggly",
            AnnotKind::StrikeOut => "Strikeout",
            AnnotKind::Redact => "Redaction",
            AnnotKind::Ink => "Ink",
            AnnotKind::Stamp => "Stamp",
            AnnotKind::Sound => "Sound",
            AnnotKind::FileAttachment => "File Attachment",
            AnnotKind::Widget => "Form Field",
        }
    }

    pub fn plural_label(self) -> &'static str {
        match self {
            AnnotKind::Note => "Notes",
            AnnotKind::Link => "Links",
            AnnotKind::FreeText => "Free Texts",
            AnnotKind::Callout => "Callouts",
            AnnotKind::Line => "Lines",
            AnnotKind::Square => "Squares",
            AnnotKind::Circle => "Circles",
            AnnotKind::Polygon => "Polygons",
            AnnotKind::Polyline => "Polylines",
            AnnotKind::Cloud => "Clouds",
            AnnotKind::Highlight => "Highlights",
            AnnotKind::Underline => "Underlines",
            AnnotKind::Squiggly => "Squigglies",
            AnnotKind::StrikeOut => "Strikeouts",
            AnnotKind::Redact => "Redactions",
            AnnotKind::Ink => "Ink Strokes",
            AnnotKind::Stamp => "Stamps",
            AnnotKind::Sound => "Sounds",
            AnnotKind::FileAttachment => "File Attachments",
            AnnotKind::Widget => "Form Fields",
        }
    }

    /// Markup annotations carry user content (note, appearance).
    pub fn is_markup(self) -> bool {
        !matches!(self, AnnotKind::Link | AnnotKind::Widget)
    }

    pub fn is_text_markup(self) -> bool {
        matches!(
            self,
            AnnotKind::Highlight
                | AnnotKind::Underline
                | AnnotKind::Squiggly
                | AnnotKind::StrikeOut
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annot {
    pub kind: AnnotKind,
    pub rect: Rect,
    pub contents: CompactString,
    pub locked: bool,
}

impl Annot {
    pub fn new(kind: AnnotKind, rect: Rect) -> Self {
        Self {
            kind,
            rect: rect.normalized(),
            contents: CompactString::new(""),
            locked: false,
        }
    }

    pub fn with_contents(mut self, contents: &str) -> Self {
        self.contents = CompactString::from(contents);
        self
    }
}

/// Ordered annotation-handle → page batch handed to mutation hooks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotBatch {
    entries: Vec<(AnnotId, PageIndex)>,
}

impl AnnotBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(id: AnnotId, page: PageIndex) -> Self {
        Self {
            entries: vec![(id, page)],
        }
    }

    pub fn push(&mut self, id: AnnotId, page: PageIndex) {
        self.entries.push((id, page));
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnnotId, PageIndex)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The only entry, if the batch holds exactly one.
    pub fn single_entry(&self) -> Option<(AnnotId, PageIndex)> {
        if self.entries.len() == 1 {
            Some(self.entries[0])
        } else {
            None
        }
    }
}

impl FromIterator<(AnnotId, PageIndex)> for AnnotBatch {
    fn from_iter<T: IntoIterator<Item = (AnnotId, PageIndex)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_markup_kinds() {
        assert!(AnnotKind::Highlight.is_text_markup());
        assert!(AnnotKind::StrikeOut.is_text_markup());
        assert!(!AnnotKind::Square.is_text_markup());
    }

    #[test]
    fn test_markup_excludes_link_and_widget() {
        for kind in AnnotKind::ALL {
            let expected = !matches!(kind, AnnotKind::Link | AnnotKind::Widget);
            assert_eq!(kind.is_markup(), expected, "{:?}", kind);
        }
    }

    #[test]
    fn test_labels_nonempty() {
        for kind in AnnotKind::ALL {
            assert!(!kind.label().is_empty());
            assert!(!kind.plural_label().is_empty());
        }
    }

    #[test]
    fn test_annot_rect_normalized() {
        let a = Annot::new(AnnotKind::Square, Rect::new(10.0, 10.0, 0.0, 0.0));
        assert_eq!(a.rect, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_batch_single_entry() {
        let mut batch = AnnotBatch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.single_entry(), None);

        let id = AnnotId::default();
        batch.push(id, 3);
        assert_eq!(batch.single_entry(), Some((id, 3)));

        batch.push(id, 4);
        assert_eq!(batch.single_entry(), None);
    }
}
