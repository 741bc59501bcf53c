use crate::tree::Path;
use crate::BlockId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An editor event with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
}

impl EditorEvent {
    /// Create a new event with the current timestamp
    pub fn new(event: EventType) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Things that happened in an editor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventType {
    BlockInserted {
        id: BlockId,
        path: Path,
    },

    BlockRemoved {
        id: BlockId,
    },

    BlockMoved {
        id: BlockId,
        from: Path,
        to: Path,
    },

    BlockUpdated {
        id: BlockId,
    },

    ThemeChanged,

    Undo,

    Redo,

    /// The persistence layer acknowledged a save
    Saved {
        revision: u64,
    },
}
