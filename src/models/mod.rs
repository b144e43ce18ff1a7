//! 数据模型（批注、撤销记录）

pub mod annot;
pub mod undo_entry;

pub use annot::{Annot, AnnotBatch, AnnotId, AnnotKind};
pub use undo_entry::{UndoActionKind, UndoEntry};
