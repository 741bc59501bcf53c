// Widget Block Editor - Core Library

pub mod autosave;
pub mod block;
pub mod config;
pub mod drag;
pub mod error;
pub mod event;
pub mod history;
pub mod id_generator;
pub mod keyboard;
pub mod registry;
pub mod session;
pub mod store;
pub mod tree;
pub mod validation;

// Re-export main types for convenience
pub use autosave::{AutosavePublisher, SaveRequest, SaveState};
pub use block::{Block, BlockId, BlockType, Theme, WidgetConfig, WidgetId, CHILDREN_KEY};
pub use config::EditorSettings;
pub use drag::{DragGesture, DragOutcome, DragRejection, DragReorderEngine, DropTarget, ROOT_ID};
pub use error::{PathResolutionError, PersistenceError, PublishError};
pub use event::{EditorEvent, EventType};
pub use history::{HistoryEntry, HistoryStack};
pub use id_generator::IdGenerator;
pub use keyboard::{EditorCommand, FocusTarget, Key, KeyEvent, Modifiers, Platform};
pub use registry::{BlockRegistry, BlockSchema};
pub use session::{EditorSession, SizeWarning, MAX_EVENT_LOG};
pub use store::{AuthScope, DraftRecord, FileStore, MemoryStore, PublishedRecord, VersionSummary, WidgetStore};
pub use tree::Path;
pub use validation::{IssueLocation, ValidatedConfig, ValidationIssue, ValidationIssueType, ValidationResult, Validator};
