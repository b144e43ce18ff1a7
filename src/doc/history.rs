//! 线性快照历史
//!
//! 引擎权威的撤销链：每条快照 = 元数据字符串 + 当时的文档状态克隆。
//! 光标指向当前状态；在光标之后再拍快照会截断 redo 尾巴。

use super::DocCore;

pub struct SnapshotChain {
    states: Vec<Snapshot>,
    cursor: usize,
}

struct Snapshot {
    meta: String,
    core: DocCore,
}

impl SnapshotChain {
    pub fn new(initial: DocCore) -> Self {
        Self {
            states: vec![Snapshot {
                meta: String::new(),
                core: initial,
            }],
            cursor: 0,
        }
    }

    /// 以 `meta` 标记当前状态并推进光标，截断所有 redo 状态
    pub fn take(&mut self, meta: &str, core: &DocCore) {
        self.states.truncate(self.cursor + 1);
        self.states.push(Snapshot {
            meta: meta.to_string(),
            core: core.clone(),
        });
        self.cursor = self.states.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.states.len()
    }

    /// Steps back one state. Returns the undone snapshot's meta and the
    /// restored document state.
    pub fn undo(&mut self) -> Option<(String, DocCore)> {
        if !self.can_undo() {
            return None;
        }
        let meta = self.states[self.cursor].meta.clone();
        self.cursor -= 1;
        Some((meta, self.states[self.cursor].core.clone()))
    }

    pub fn redo(&mut self) -> Option<(String, DocCore)> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        let state = &self.states[self.cursor];
        Some((state.meta.clone(), state.core.clone()))
    }

    pub fn next_undo_meta(&self) -> Option<&str> {
        if self.can_undo() {
            Some(&self.states[self.cursor].meta)
        } else {
            None
        }
    }

    pub fn next_redo_meta(&self) -> Option<&str> {
        if self.can_redo() {
            Some(&self.states[self.cursor + 1].meta)
        } else {
            None
        }
    }

    /// Metas of the undoable snapshots, newest first.
    pub fn undo_metas(&self) -> impl Iterator<Item = &str> {
        self.states[1..=self.cursor].iter().rev().map(|s| s.meta.as_str())
    }

    /// Metas of the redoable snapshots, nearest first.
    pub fn redo_metas(&self) -> impl Iterator<Item = &str> {
        self.states[self.cursor + 1..].iter().map(|s| s.meta.as_str())
    }
}
