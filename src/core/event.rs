//! 输入事件：手势识别器已分类好的事件流
//!
//! 事件到达内核时已完成分类（按下/移动/抬起/长按/缩放/双击/按键/滚动/布局），
//! 内核不做任何原始手势识别。

use compact_str::CompactString;

use super::geometry::Pt;

/// The gesture that ended just before a release event was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorEventMode {
    #[default]
    None,
    Scrolling,
    Pinch,
    DoubleTap,
    Fling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Escape,
    Enter,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Down { at: Pt },
    Move { from: Pt, to: Pt },
    Up { at: Pt, prior: PriorEventMode },
    LongPress { at: Pt },
    ScaleBegin { focus: Pt },
    Scale { focus: Pt, factor: f64 },
    ScaleEnd { focus: Pt },
    FlingStop,
    DoubleTapBegin { at: Pt },
    DoubleTapEvent { at: Pt },
    DoubleTapEnd { at: Pt },
    KeyUp(KeyInput),
    ScrollChanged { left: f64, top: f64 },
    LayoutChanged { changed: bool },
    Custom(CompactString),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Down,
    Move,
    Up,
    LongPress,
    ScaleBegin,
    Scale,
    ScaleEnd,
    FlingStop,
    DoubleTapBegin,
    DoubleTapEvent,
    DoubleTapEnd,
    KeyUp,
    ScrollChanged,
    LayoutChanged,
    Custom,
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::Down { .. } => EventKind::Down,
            InputEvent::Move { .. } => EventKind::Move,
            InputEvent::Up { .. } => EventKind::Up,
            InputEvent::LongPress { .. } => EventKind::LongPress,
            InputEvent::ScaleBegin { .. } => EventKind::ScaleBegin,
            InputEvent::Scale { .. } => EventKind::Scale,
            InputEvent::ScaleEnd { .. } => EventKind::ScaleEnd,
            InputEvent::FlingStop => EventKind::FlingStop,
            InputEvent::DoubleTapBegin { .. } => EventKind::DoubleTapBegin,
            InputEvent::DoubleTapEvent { .. } => EventKind::DoubleTapEvent,
            InputEvent::DoubleTapEnd { .. } => EventKind::DoubleTapEnd,
            InputEvent::KeyUp(_) => EventKind::KeyUp,
            InputEvent::ScrollChanged { .. } => EventKind::ScrollChanged,
            InputEvent::LayoutChanged { .. } => EventKind::LayoutChanged,
            InputEvent::Custom(_) => EventKind::Custom,
        }
    }

    /// True for the press/move/release triple that the skip-next-touch latch
    /// swallows.
    pub fn is_touch(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::Down | EventKind::Move | EventKind::Up
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Consumed,
    Ignored,
}

impl EventResult {
    pub fn is_consumed(&self) -> bool {
        matches!(self, EventResult::Consumed)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, EventResult::Ignored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        let e = InputEvent::Down { at: Pt::new(1.0, 2.0) };
        assert_eq!(e.kind(), EventKind::Down);
        assert!(e.is_touch());

        let e = InputEvent::KeyUp(KeyInput::plain(Key::Escape));
        assert_eq!(e.kind(), EventKind::KeyUp);
        assert!(!e.is_touch());
    }

    #[test]
    fn test_event_result() {
        assert!(EventResult::Consumed.is_consumed());
        assert!(EventResult::Ignored.is_ignored());
    }
}
