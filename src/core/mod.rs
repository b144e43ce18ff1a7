//! 核心框架类型（输入事件、几何）

pub mod event;
pub mod geometry;

pub use event::{EventKind, EventResult, InputEvent, Key, KeyInput, PriorEventMode};
pub use geometry::{PageIndex, Pt, Rect};
