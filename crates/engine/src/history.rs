//! Linear command history with a cursor.
//!
//! Entries are stored in an owned, growable buffer. Undo and redo only move
//! the cursor; the buffer is cut back (never reallocated into a new timeline)
//! when a new command is appended from a non-tip position.

use crate::commands::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NoHistory,
    #[error("nothing to redo")]
    NoFuture,
}

#[derive(Default)]
pub struct History {
    entries: Vec<Box<dyn Command>>,
    /// Index of the last applied command; `None` is "before the first entry".
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of entries currently applied (`cursor + 1`).
    fn applied(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.applied() < self.entries.len()
    }

    /// Drop every future entry, push `command` and make it the tip.
    pub fn append(&mut self, command: Box<dyn Command>) {
        let applied = self.applied();
        let discarded = self.entries.len() - applied;
        if discarded > 0 {
            tracing::debug!(discarded, "truncating redo tail");
        }
        self.entries.truncate(applied);
        self.entries.push(command);
        self.cursor = Some(self.entries.len() - 1);
    }

    pub fn current(&self) -> Option<&dyn Command> {
        self.cursor.map(|c| self.entries[c].as_ref())
    }

    /// Move the cursor back one step, returning the command to undo.
    pub fn step_back(&mut self) -> Result<&mut dyn Command, HistoryError> {
        let at = self.cursor.ok_or(HistoryError::NoHistory)?;
        self.cursor = at.checked_sub(1);
        Ok(self.entries[at].as_mut())
    }

    /// Move the cursor forward one step, returning the command to re-execute.
    pub fn step_forward(&mut self) -> Result<&mut dyn Command, HistoryError> {
        let next = self.applied();
        if next >= self.entries.len() {
            return Err(HistoryError::NoFuture);
        }
        self.cursor = Some(next);
        Ok(self.entries[next].as_mut())
    }

    /// Read-only walk over the timeline, oldest first.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            history: self,
            next: 0,
        }
    }
}

/// One row of [`History::entries`].
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    pub index: usize,
    pub command: &'a dyn Command,
    pub is_current: bool,
}

/// Iterator over history entries; clone it to walk the timeline again.
#[derive(Clone)]
pub struct Entries<'a> {
    history: &'a History,
    next: usize,
}

impl<'a> Iterator for Entries<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let command = self.history.entries.get(index)?;
        self.next += 1;
        Some(Entry {
            index,
            command: command.as_ref(),
            is_current: self.history.cursor == Some(index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.history.entries.len().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Entries<'_> {}
