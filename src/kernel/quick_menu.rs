//! 快捷菜单填充表
//!
//! 每种批注类型对应的菜单项是一张静态数据表，不是一串类型判断；
//! 新增类型时漏配会被测试直接点名。

use crate::models::annot::AnnotKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickMenuEntry {
    Note,
    Appearance,
    Delete,
    Copy,
    PlaySound,
    OpenAttachment,
    EditText,
    EditInk,
    FillField,
    ResetField,
    OpenLink,
    CopyLink,
    ApplyRedaction,
    TypeHighlight,
    TypeUnderline,
    TypeSquiggly,
    TypeStrikeout,
}

const MARKUP_SHAPE: &[QuickMenuEntry] = &[
    QuickMenuEntry::Note,
    QuickMenuEntry::Appearance,
    QuickMenuEntry::Delete,
];

const TEXT_MARKUP: &[QuickMenuEntry] = &[
    QuickMenuEntry::Note,
    QuickMenuEntry::Appearance,
    QuickMenuEntry::TypeHighlight,
    QuickMenuEntry::TypeUnderline,
    QuickMenuEntry::TypeSquiggly,
    QuickMenuEntry::TypeStrikeout,
    QuickMenuEntry::Delete,
];

const FREE_TEXT: &[QuickMenuEntry] = &[
    QuickMenuEntry::EditText,
    QuickMenuEntry::Appearance,
    QuickMenuEntry::Delete,
];

const GENERIC: &[QuickMenuEntry] = &[QuickMenuEntry::Note, QuickMenuEntry::Delete];

/// Per-kind menu rows. Kinds not listed fall back to [`GENERIC`].
const MENU_TABLE: &[(AnnotKind, &[QuickMenuEntry])] = &[
    (AnnotKind::Note, &[
        QuickMenuEntry::Note,
        QuickMenuEntry::Appearance,
        QuickMenuEntry::Delete,
    ]),
    (AnnotKind::Link, &[
        QuickMenuEntry::OpenLink,
        QuickMenuEntry::CopyLink,
        QuickMenuEntry::Delete,
    ]),
    (AnnotKind::FreeText, FREE_TEXT),
    (AnnotKind::Callout, FREE_TEXT),
    (AnnotKind::Line, MARKUP_SHAPE),
    (AnnotKind::Square, MARKUP_SHAPE),
    (AnnotKind::Circle, MARKUP_SHAPE),
    (AnnotKind::Polygon, MARKUP_SHAPE),
    (AnnotKind::Polyline, MARKUP_SHAPE),
    (AnnotKind::Cloud, MARKUP_SHAPE),
    (AnnotKind::Highlight, TEXT_MARKUP),
    (AnnotKind::Underline, TEXT_MARKUP),
    (AnnotKind::Squiggly, TEXT_MARKUP),
    (AnnotKind::StrikeOut, TEXT_MARKUP),
    (AnnotKind::Redact, &[
        QuickMenuEntry::ApplyRedaction,
        QuickMenuEntry::Appearance,
        QuickMenuEntry::Delete,
    ]),
    (AnnotKind::Ink, &[
        QuickMenuEntry::Note,
        QuickMenuEntry::Appearance,
        QuickMenuEntry::EditInk,
        QuickMenuEntry::Delete,
    ]),
    (AnnotKind::Stamp, &[
        QuickMenuEntry::Appearance,
        QuickMenuEntry::Delete,
    ]),
    (AnnotKind::Sound, &[
        QuickMenuEntry::PlaySound,
        QuickMenuEntry::Delete,
    ]),
    (AnnotKind::FileAttachment, &[
        QuickMenuEntry::OpenAttachment,
        QuickMenuEntry::Note,
        QuickMenuEntry::Delete,
    ]),
    (AnnotKind::Widget, &[
        QuickMenuEntry::FillField,
        QuickMenuEntry::ResetField,
    ]),
];

pub fn entries_for(kind: AnnotKind) -> &'static [QuickMenuEntry] {
    MENU_TABLE
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, entries)| *entries)
        .unwrap_or(GENERIC)
}

/// Menu shown over a plain text selection (no annotation involved).
pub fn text_select_entries() -> &'static [QuickMenuEntry] {
    &[
        QuickMenuEntry::Copy,
        QuickMenuEntry::TypeHighlight,
        QuickMenuEntry::TypeUnderline,
        QuickMenuEntry::TypeSquiggly,
        QuickMenuEntry::TypeStrikeout,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_row() {
        // 表必须覆盖全部类型，fallback 只兜自定义扩展
        for kind in AnnotKind::ALL {
            assert!(
                MENU_TABLE.iter().any(|(k, _)| *k == kind),
                "missing menu row for {:?}",
                kind
            );
            assert!(!entries_for(kind).is_empty());
        }
    }

    #[test]
    fn test_sound_gets_playback() {
        assert!(entries_for(AnnotKind::Sound).contains(&QuickMenuEntry::PlaySound));
    }

    #[test]
    fn test_widget_gets_field_entries() {
        let entries = entries_for(AnnotKind::Widget);
        assert!(entries.contains(&QuickMenuEntry::FillField));
        assert!(!entries.contains(&QuickMenuEntry::Delete));
    }

    #[test]
    fn test_text_markup_can_switch_type() {
        for kind in [
            AnnotKind::Highlight,
            AnnotKind::Underline,
            AnnotKind::Squiggly,
            AnnotKind::StrikeOut,
        ] {
            assert!(entries_for(kind).contains(&QuickMenuEntry::TypeSquiggly));
        }
    }

    #[test]
    fn test_markup_kinds_offer_note() {
        for kind in AnnotKind::ALL {
            if kind.is_markup()
                && !matches!(kind, AnnotKind::Stamp | AnnotKind::Redact | AnnotKind::Sound)
            {
                let has_note_or_edit = entries_for(kind)
                    .iter()
                    .any(|e| matches!(e, QuickMenuEntry::Note | QuickMenuEntry::EditText));
                assert!(has_note_or_edit, "{:?} should offer note/edit", kind);
            }
        }
    }
}
