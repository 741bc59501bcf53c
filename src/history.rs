//! # Undo/Redo History
//!
//! Snapshot-based history over whole `WidgetConfig` values.
//!
//! ## Design
//!
//! - The undo stack is never empty; its bottom entry is the initial load
//! - The top of the undo stack is the config currently displayed
//! - A snapshot equal to the current top is skipped
//! - A new snapshot clears the redo stack
//! - Depth is capped; the oldest entries are dropped first, never the top
//!
//! Freeform edits (typing into a field) are expected to be coalesced by the
//! caller into one snapshot per logical edit.

use crate::WidgetConfig;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Default number of retained undo entries
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Immutable snapshot of a config
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub config: WidgetConfig,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            timestamp: Utc::now(),
        }
    }
}

/// Undo/redo stacks for one editor session
#[derive(Debug, Clone)]
pub struct HistoryStack {
    /// Oldest first; the back is the displayed config
    undo_stack: VecDeque<HistoryEntry>,

    /// Most recently undone last
    redo_stack: Vec<HistoryEntry>,

    /// Maximum undo entries, at least 1
    max_depth: usize,
}

impl HistoryStack {
    /// Create a history whose only entry is `initial`
    pub fn new(initial: WidgetConfig) -> Self {
        Self::with_max_depth(initial, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(initial: WidgetConfig, max_depth: usize) -> Self {
        let mut undo_stack = VecDeque::new();
        undo_stack.push_back(HistoryEntry::new(initial));
        Self {
            undo_stack,
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// The displayed config
    pub fn current(&self) -> &WidgetConfig {
        &self.top().config
    }

    /// Entry at the top of the undo stack
    pub fn top(&self) -> &HistoryEntry {
        // The undo stack always holds at least the initial entry
        &self.undo_stack[self.undo_stack.len() - 1]
    }

    /// Record `next` as the new displayed config.
    ///
    /// Returns false (and leaves both stacks alone) when `next` equals the
    /// current top.
    pub fn snapshot(&mut self, next: WidgetConfig) -> bool {
        if &next == self.current() {
            tracing::trace!("skipping history snapshot identical to current state");
            return false;
        }

        self.undo_stack.push_back(HistoryEntry::new(next));
        self.redo_stack.clear();

        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }

        true
    }

    /// Step back one entry. Returns the newly displayed config, or `None`
    /// when only the bottom entry is left.
    pub fn undo(&mut self) -> Option<&WidgetConfig> {
        if self.undo_stack.len() <= 1 {
            return None;
        }
        let undone = self.undo_stack.pop_back()?;
        self.redo_stack.push(undone);
        Some(self.current())
    }

    /// Re-apply the most recently undone entry
    pub fn redo(&mut self) -> Option<&WidgetConfig> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push_back(entry);
        Some(self.current())
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Entries on the undo stack, including the displayed one
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop all history and start over from `config`
    pub fn reset(&mut self, config: WidgetConfig) {
        self.undo_stack.clear();
        self.undo_stack.push_back(HistoryEntry::new(config));
        self.redo_stack.clear();
    }
}
