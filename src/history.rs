// Bounded undo/redo stacks of whole-state snapshots.
// Entries are owned copies; nothing in the history aliases the live state.
// Used twice: once for canvas + text objects, once for the lightweight
// text-only edit history.

use std::collections::VecDeque;

use crate::text::TextObject;
use crate::types::FrameBuffer;

/// Undo bound for canvas snapshots.
pub const MAX_UNDO: usize = 30;

/// Canvas and text objects at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub canvas: FrameBuffer,
    pub texts: Vec<TextObject>,
}

#[derive(Debug)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    bound: usize,
}

impl<T: Clone> History<T> {
    pub fn new(bound: usize) -> Self {
        Self { undo: VecDeque::with_capacity(bound), redo: Vec::new(), bound: bound.max(1) }
    }

    /// Record a new forward step. Evicts the oldest entry at the bound and
    /// drops any redo history.
    pub fn snapshot(&mut self, state: T) {
        self.push_undo(state);
        self.redo.clear();
    }

    /// Step back: `live` moves onto the redo stack and the newest undo entry
    /// comes back. `None` when there is nothing to undo.
    pub fn undo(&mut self, live: &T) -> Option<T> {
        let restored = self.undo.pop_back()?;
        self.redo.push(live.clone());
        Some(restored)
    }

    /// Mirror of [`History::undo`].
    pub fn redo(&mut self, live: &T) -> Option<T> {
        let restored = self.redo.pop()?;
        self.push_undo(live.clone());
        Some(restored)
    }

    fn push_undo(&mut self, state: T) {
        if self.undo.len() >= self.bound {
            self.undo.pop_front();
        }
        self.undo.push_back(state);
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Oldest entry still available for undo.
    pub fn oldest(&self) -> Option<&T> {
        self.undo.front()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
