//! Side-effect requests returned from a dispatch call.
//!
//! Handlers never open dialogs or touch the widget tree; anything
//! user-facing is described here and handed back to the embedding shell,
//! so no document lock can ever be held across a prompt.

use compact_str::CompactString;

use crate::core::geometry::{PageIndex, Rect};
use crate::models::annot::AnnotId;

use super::mode::ModeId;
use super::quick_menu::QuickMenuEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// The active tool variant changed.
    ToolChanged { from: ModeId, to: ModeId },
    /// Pop the context menu anchored at a screen rect.
    ShowQuickMenu {
        anchor: Rect,
        entries: Vec<QuickMenuEntry>,
    },
    CloseQuickMenu,
    /// Open the note/property dialog directly (creation shortcut path).
    ShowNoteDialog { annot: AnnotId, page: PageIndex },
    OpenLink { url: CompactString },
    /// Repaint request.
    Invalidate,
    /// A page edit was undone/redone; page layout must be rebuilt.
    RebuildPageLayout,
    ScrollToPage(PageIndex),
    /// Animate the view toward an edited region (page space).
    AnimateRect { page: PageIndex, rect: Rect },
    ShowTransientPageNumber,
}
