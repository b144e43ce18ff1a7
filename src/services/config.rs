//! 配置服务：工具行为配置
//!
//! 支持从 JSON 反序列化，运行时可改。

use serde::{Deserialize, Serialize};

use crate::kernel::mode::ToolMode;
use crate::models::annot::AnnotKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// 创建完批注后停留在创建模式（连续标注）
    pub continuous_annotation: bool,
    /// 手写笔落笔即视为墨迹笔
    pub stylus_as_pen: bool,
    pub edit_ink_annots: bool,
    pub double_tap_to_zoom: bool,
    /// Screen-space pick radius for resize handles.
    pub handle_radius: f64,
    /// Movement below this is treated as a tap, not a drag.
    pub tap_slop: f64,
    /// Shapes smaller than this on release are discarded.
    pub min_shape_size: f64,
    pub eraser_radius: f64,
    /// Default page-space size for sticky notes.
    pub note_size: f64,
    /// Default page-space size for new free-text boxes.
    pub free_text_width: f64,
    pub free_text_height: f64,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            continuous_annotation: false,
            stylus_as_pen: false,
            edit_ink_annots: true,
            double_tap_to_zoom: true,
            handle_radius: 12.0,
            tap_slop: 4.0,
            min_shape_size: 4.0,
            eraser_radius: 8.0,
            note_size: 20.0,
            free_text_width: 120.0,
            free_text_height: 40.0,
        }
    }
}

impl ToolConfig {
    /// Which editor variant handles a tapped annotation of this kind.
    pub fn handler_mode(&self, kind: AnnotKind) -> ToolMode {
        match kind {
            AnnotKind::Line => ToolMode::AnnotEditLine,
            AnnotKind::Highlight
            | AnnotKind::Underline
            | AnnotKind::Squiggly
            | AnnotKind::StrikeOut => ToolMode::AnnotEditTextMarkup,
            AnnotKind::Polyline | AnnotKind::Polygon | AnnotKind::Cloud | AnnotKind::Callout => {
                ToolMode::AnnotEditAdvancedShape
            }
            AnnotKind::Widget => ToolMode::FormFill,
            AnnotKind::Link => ToolMode::LinkAction,
            _ => ToolMode::AnnotEdit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::default();
        assert!(!config.continuous_annotation);
        assert!(config.edit_ink_annots);
        assert_eq!(config.handle_radius, 12.0);
    }

    #[test]
    fn test_handler_mode_table() {
        let config = ToolConfig::default();
        assert_eq!(config.handler_mode(AnnotKind::Line), ToolMode::AnnotEditLine);
        assert_eq!(
            config.handler_mode(AnnotKind::Highlight),
            ToolMode::AnnotEditTextMarkup
        );
        assert_eq!(config.handler_mode(AnnotKind::Widget), ToolMode::FormFill);
        assert_eq!(config.handler_mode(AnnotKind::Square), ToolMode::AnnotEdit);
        assert_eq!(config.handler_mode(AnnotKind::Note), ToolMode::AnnotEdit);
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: ToolConfig =
            serde_json::from_str(r#"{"continuous_annotation": true}"#).unwrap();
        assert!(config.continuous_annotation);
        assert_eq!(config.tap_slop, 4.0);
    }
}
