//! 撤销记录元数据
//!
//! 每个快照附带一条可序列化的描述：标签、动作类别、涉及的页码与矩形、
//! 单批注修改前的页码与矩形（用于撤销后的视图动画）、安全标记位。
//! 引擎只保存这串 JSON，二进制差异由引擎自己管理。

use serde::{Deserialize, Serialize};

use crate::core::geometry::PageIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndoActionKind {
    Add,
    Modify,
    Remove,
    PageAdd,
    PageDelete,
    PageRotate,
    PageMove,
    Bookmark,
    Crop,
    #[default]
    GenericAction,
}

impl UndoActionKind {
    /// Page edits force the view to rebuild page layout after undo/redo.
    /// Generic actions count as page edits (original behavior).
    pub fn is_page_edit(self) -> bool {
        matches!(
            self,
            UndoActionKind::PageAdd
                | UndoActionKind::PageDelete
                | UndoActionKind::PageRotate
                | UndoActionKind::PageMove
                | UndoActionKind::Crop
                | UndoActionKind::GenericAction
        )
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UndoEntry {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub action: UndoActionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<PageIndex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rects: Vec<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_page: Option<PageIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_rect: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_from: Option<PageIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_to: Option<PageIndex>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub safety: bool,
}

impl UndoEntry {
    pub fn new(label: impl Into<String>, action: UndoActionKind) -> Self {
        Self {
            label: label.into(),
            action,
            ..Self::default()
        }
    }

    /// The invisible marker taken before persistence to guard partial saves.
    pub fn safety_marker() -> Self {
        Self {
            safety: true,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Malformed metadata degrades to a blank entry, never an error.
    pub fn from_json(meta: &str) -> Self {
        serde_json::from_str(meta).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip() {
        let mut entry = UndoEntry::new("Add Square", UndoActionKind::Add);
        entry.pages = vec![3];
        entry.rects = vec![[10.0, 20.0, 30.0, 40.0]];

        let json = entry.to_json();
        assert_eq!(UndoEntry::from_json(&json), entry);
    }

    #[test]
    fn test_malformed_metadata_degrades() {
        let entry = UndoEntry::from_json("not json at all");
        assert!(entry.label.is_empty());
        assert!(!entry.safety);

        let entry = UndoEntry::from_json("");
        assert!(entry.label.is_empty());
    }

    #[test]
    fn test_safety_marker_round_trip() {
        let json = UndoEntry::safety_marker().to_json();
        assert!(UndoEntry::from_json(&json).safety);
    }

    #[test]
    fn test_page_edit_classification() {
        assert!(UndoActionKind::PageAdd.is_page_edit());
        assert!(UndoActionKind::PageDelete.is_page_edit());
        assert!(UndoActionKind::PageRotate.is_page_edit());
        assert!(UndoActionKind::PageMove.is_page_edit());
        assert!(UndoActionKind::Crop.is_page_edit());
        assert!(UndoActionKind::GenericAction.is_page_edit());

        assert!(!UndoActionKind::Add.is_page_edit());
        assert!(!UndoActionKind::Modify.is_page_edit());
        assert!(!UndoActionKind::Remove.is_page_edit());
        assert!(!UndoActionKind::Bookmark.is_page_edit());
    }
}
