//! # Editor Session
//!
//! Owns the displayed config, its history, the selection and the derived
//! state (validation issues, size warning, dirty flag) for one widget.
//!
//! Every change to the tree goes through [`EditorSession::mutate`] or one of
//! the operations built on it, so each committed change is exactly one
//! history entry. Freeform typing goes through [`EditorSession::preview`],
//! which updates the display without history until [`EditorSession::commit_preview`].

use crate::config::EditorSettings;
use crate::drag::{DragGesture, DragOutcome, DragReorderEngine};
use crate::event::{EditorEvent, EventType};
use crate::history::HistoryStack;
use crate::id_generator::{taken_ids, IdGenerator};
use crate::keyboard::{self, EditorCommand, KeyEvent, Platform};
use crate::registry::BlockRegistry;
use crate::tree::{self, Path};
use crate::validation::{ValidationResult, Validator};
use crate::{
    Block, BlockId, BlockType, PathResolutionError, Theme, WidgetConfig, WidgetId, CHILDREN_KEY,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Oldest activity entries are dropped past this length
pub const MAX_EVENT_LOG: usize = 500;

/// Serialized config is larger than the configured threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeWarning {
    pub bytes: usize,
    pub threshold: usize,
}

/// Editing state for one widget
pub struct EditorSession {
    widget_id: WidgetId,
    registry: Arc<BlockRegistry>,
    history: HistoryStack,

    /// Displayed config. Equals the history top unless a preview is pending.
    current: WidgetConfig,
    preview_pending: bool,

    issues: ValidationResult,
    selected: Option<BlockId>,

    /// Changes not yet acknowledged by the store
    dirty: bool,
    /// Bumped on every change to the displayed config
    revision: u64,

    size_bytes: usize,
    size_threshold: usize,
    size_warning: Option<SizeWarning>,

    /// Recent activity, capped at `MAX_EVENT_LOG`
    events: Vec<EditorEvent>,
    clipboard: Option<Block>,
    ids: IdGenerator,
}

impl EditorSession {
    pub fn new(
        widget_id: WidgetId,
        config: WidgetConfig,
        registry: Arc<BlockRegistry>,
        settings: &EditorSettings,
    ) -> Self {
        let mut session = Self {
            widget_id,
            registry,
            history: HistoryStack::with_max_depth(config.clone(), settings.history_depth),
            current: config,
            preview_pending: false,
            issues: ValidationResult::new(),
            selected: None,
            dirty: false,
            revision: 0,
            size_bytes: 0,
            size_threshold: settings.size_warning_bytes,
            size_warning: None,
            events: Vec::new(),
            clipboard: None,
            ids: IdGenerator::new(),
        };
        session.refresh_derived();
        session
    }

    /// Session with the builtin registry and default settings
    pub fn with_defaults(widget_id: WidgetId, config: WidgetConfig) -> Self {
        Self::new(
            widget_id,
            config,
            Arc::new(BlockRegistry::with_builtins()),
            &EditorSettings::default(),
        )
    }

    /// Replace everything with a freshly loaded config
    pub fn reset(&mut self, config: WidgetConfig) {
        self.history.reset(config.clone());
        self.current = config;
        self.preview_pending = false;
        self.selected = None;
        self.dirty = false;
        self.revision += 1;
        self.refresh_derived();
    }

    // Accessors

    pub fn widget_id(&self) -> &WidgetId {
        &self.widget_id
    }

    /// The displayed config
    pub fn config(&self) -> &WidgetConfig {
        &self.current
    }

    pub fn blocks(&self) -> &[Block] {
        &self.current.blocks
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn issues(&self) -> &ValidationResult {
        &self.issues
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_valid()
    }

    pub fn selected(&self) -> Option<&BlockId> {
        self.selected.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn size_warning(&self) -> Option<SizeWarning> {
        self.size_warning
    }

    pub fn events(&self) -> &[EditorEvent] {
        &self.events
    }

    pub fn has_pending_preview(&self) -> bool {
        self.preview_pending
    }

    pub fn can_undo(&self) -> bool {
        self.preview_pending || self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.preview_pending && self.history.can_redo()
    }

    // Mutation core

    /// Apply `updater` to the displayed config and record the result as one
    /// history entry. Returns false when nothing changed.
    pub fn mutate<F>(&mut self, updater: F) -> bool
    where
        F: FnOnce(&WidgetConfig) -> WidgetConfig,
    {
        self.commit_preview();
        let next = updater(&self.current);
        self.record(next, None)
    }

    /// Like [`mutate`](Self::mutate), for updaters that resolve paths.
    /// A resolution failure leaves everything unchanged.
    pub fn try_mutate<F>(&mut self, updater: F) -> bool
    where
        F: FnOnce(&WidgetConfig) -> Result<WidgetConfig, PathResolutionError>,
    {
        self.commit_preview();
        match updater(&self.current) {
            Ok(next) => self.record(next, None),
            Err(err) => {
                tracing::warn!(error = %err, "mutation abandoned, tree changed underneath it");
                false
            }
        }
    }

    /// Show `updater`'s result without a history entry. Repeated previews
    /// coalesce until [`commit_preview`](Self::commit_preview).
    pub fn preview<F>(&mut self, updater: F)
    where
        F: FnOnce(&WidgetConfig) -> WidgetConfig,
    {
        let next = updater(&self.current);
        if next == self.current {
            return;
        }
        self.current = next;
        self.preview_pending = true;
        self.after_change();
    }

    /// Preview an edit of one block's payload, e.g. while typing
    pub fn preview_block_data<F>(&mut self, id: &BlockId, edit: F) -> bool
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        match with_block_data(&self.current, id, edit) {
            Ok(next) => {
                self.preview(|_| next);
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "preview target is gone");
                false
            }
        }
    }

    /// Record the pending preview as one history entry
    pub fn commit_preview(&mut self) -> bool {
        if !self.preview_pending {
            return false;
        }
        self.preview_pending = false;
        let recorded = self.history.snapshot(self.current.clone());
        if recorded {
            tracing::trace!(revision = self.revision, "preview committed");
        }
        recorded
    }

    fn record(&mut self, next: WidgetConfig, event: Option<EventType>) -> bool {
        if !self.history.snapshot(next.clone()) {
            return false;
        }
        self.current = next;
        self.after_change();
        if let Some(event) = event {
            self.log(event);
        }
        true
    }

    fn after_change(&mut self) {
        self.dirty = true;
        self.revision += 1;
        self.refresh_derived();
    }

    fn refresh_derived(&mut self) {
        self.issues = Validator::validate(&self.current, &self.registry);
        self.measure_size();

        if let Some(id) = &self.selected {
            if !tree::contains_id(&self.current.blocks, id) {
                tracing::debug!(block_id = %id, "selected block is gone, clearing selection");
                self.selected = None;
            }
        }
    }

    fn measure_size(&mut self) {
        match self.current.byte_size() {
            Ok(bytes) => {
                self.size_bytes = bytes;
                let warning = (bytes > self.size_threshold).then_some(SizeWarning {
                    bytes,
                    threshold: self.size_threshold,
                });
                if warning.is_some() && self.size_warning.is_none() {
                    tracing::warn!(bytes, threshold = self.size_threshold, "widget config is getting large");
                }
                self.size_warning = warning;
            }
            Err(err) => tracing::warn!(error = %err, "could not measure config size"),
        }
    }

    fn log(&mut self, event: EventType) {
        self.events.push(EditorEvent::new(event));
        if self.events.len() > MAX_EVENT_LOG {
            let excess = self.events.len() - MAX_EVENT_LOG;
            self.events.drain(..excess);
        }
    }

    // Structural operations

    /// Insert a fresh block of a registered type. `parent` of `None` is the
    /// root list; `index` of `None` appends.
    pub fn add_from_palette(
        &mut self,
        block_type: &BlockType,
        parent: Option<&BlockId>,
        index: Option<usize>,
    ) -> Option<BlockId> {
        let id = self.ids.next_id(&taken_ids(&self.current.blocks));
        let Some(block) = self.registry.create_block(block_type, id) else {
            tracing::warn!(block_type = %block_type, "not in the palette");
            return None;
        };
        self.insert_block(parent, index, block)
    }

    /// Insert `block` with its subtree. If any of its ids is already in use,
    /// or repeats within the subtree, the whole subtree gets fresh ids.
    pub fn insert_block(
        &mut self,
        parent: Option<&BlockId>,
        index: Option<usize>,
        block: Block,
    ) -> Option<BlockId> {
        self.commit_preview();

        let mut taken = taken_ids(&self.current.blocks);
        let mut seen = HashSet::new();
        let collides = tree::collect_ids(std::slice::from_ref(&block))
            .into_iter()
            .any(|id| taken.contains(&id) || !seen.insert(id));
        let block = if collides {
            self.ids.fresh_copy(&block, &mut taken)
        } else {
            block
        };

        let id = block.id.clone();
        let inserted = self
            .insertion_path(parent, index)
            .and_then(|path| Ok((tree::insert_at_path(&self.current.blocks, &path, block)?, path)));

        match inserted {
            Ok((blocks, path)) => {
                let next = self.current.with_blocks(blocks);
                self.record(next, Some(EventType::BlockInserted { id: id.clone(), path }))
                    .then_some(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "insert abandoned");
                None
            }
        }
    }

    /// Remove a block and its subtree
    pub fn remove_block(&mut self, id: &BlockId) -> bool {
        self.commit_preview();

        let removed = tree::find_path_by_id(&self.current.blocks, id)
            .ok_or_else(|| PathResolutionError::UnknownId(id.clone()))
            .and_then(|path| tree::remove_at_path(&self.current.blocks, &path));

        match removed {
            Ok((blocks, _)) => {
                let next = self.current.with_blocks(blocks);
                self.record(next, Some(EventType::BlockRemoved { id: id.clone() }))
            }
            Err(err) => {
                tracing::debug!(error = %err, "remove skipped");
                false
            }
        }
    }

    /// Edit a block's payload. Id, type and children stay as they are.
    pub fn update_block_data<F>(&mut self, id: &BlockId, edit: F) -> bool
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        self.commit_preview();

        match with_block_data(&self.current, id, edit) {
            Ok(next) => self.record(next, Some(EventType::BlockUpdated { id: id.clone() })),
            Err(err) => {
                tracing::debug!(error = %err, "update skipped");
                false
            }
        }
    }

    pub fn update_theme<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut Theme),
    {
        self.commit_preview();

        let mut next = self.current.clone();
        edit(&mut next.theme);
        self.record(next, Some(EventType::ThemeChanged))
    }

    /// Copy a block with fresh ids and insert it right after the original
    pub fn duplicate_block(&mut self, id: &BlockId) -> Option<BlockId> {
        let block = self.find_block(id)?.clone();
        self.insert_after(id, block)
    }

    /// Put a copy of the block on the internal clipboard
    pub fn copy_block(&mut self, id: &BlockId) -> bool {
        match self.find_block(id) {
            Some(block) => {
                self.clipboard = Some(block.clone());
                true
            }
            None => false,
        }
    }

    /// Insert the clipboard content with fresh ids, after `after` or at the
    /// end of the root list
    pub fn paste(&mut self, after: Option<&BlockId>) -> Option<BlockId> {
        let block = self.clipboard.clone()?;
        match after {
            Some(anchor) => self.insert_after(anchor, block),
            None => {
                let copy = self.fresh_copy(&block);
                self.insert_block(None, None, copy)
            }
        }
    }

    /// Apply a finished drag gesture
    pub fn drag(&mut self, gesture: &DragGesture) -> DragOutcome {
        self.commit_preview();

        let outcome = DragReorderEngine::apply(&self.current.blocks, gesture);
        if let DragOutcome::Moved { blocks, from, to } = &outcome {
            let next = self.current.with_blocks(blocks.clone());
            self.record(
                next,
                Some(EventType::BlockMoved {
                    id: gesture.active_id.clone(),
                    from: from.clone(),
                    to: to.clone(),
                }),
            );
        }
        outcome
    }

    pub fn undo(&mut self) -> bool {
        self.commit_preview();

        let Some(config) = self.history.undo().cloned() else {
            return false;
        };
        self.current = config;
        self.after_change();
        self.log(EventType::Undo);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.commit_preview();

        let Some(config) = self.history.redo().cloned() else {
            return false;
        };
        self.current = config;
        self.after_change();
        self.log(EventType::Redo);
        true
    }

    fn insert_after(&mut self, anchor: &BlockId, block: Block) -> Option<BlockId> {
        let path = tree::find_path_by_id(&self.current.blocks, anchor)?;
        let parent = tree::parent_path(&path)
            .and_then(|p| tree::get_at_path(&self.current.blocks, p))
            .map(|b| b.id.clone());
        let index = path.last().map(|i| i + 1);

        let copy = self.fresh_copy(&block);
        self.insert_block(parent.as_ref(), index, copy)
    }

    fn fresh_copy(&mut self, block: &Block) -> Block {
        let mut taken = taken_ids(&self.current.blocks);
        self.ids.fresh_copy(block, &mut taken)
    }

    fn find_block(&self, id: &BlockId) -> Option<&Block> {
        let path = tree::find_path_by_id(&self.current.blocks, id)?;
        tree::get_at_path(&self.current.blocks, &path)
    }

    fn insertion_path(
        &self,
        parent: Option<&BlockId>,
        index: Option<usize>,
    ) -> Result<Path, PathResolutionError> {
        let mut path = match parent {
            None => Vec::new(),
            Some(id) => tree::find_path_by_id(&self.current.blocks, id)
                .ok_or_else(|| PathResolutionError::UnknownId(id.clone()))?,
        };
        let len = tree::children_at(&self.current.blocks, &path)
            .ok_or_else(|| PathResolutionError::NotAContainer(path.clone()))?
            .len();
        path.push(index.unwrap_or(len));
        Ok(path)
    }

    // Selection

    pub fn select(&mut self, id: &BlockId) -> bool {
        if tree::contains_id(&self.current.blocks, id) {
            self.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Select the previous sibling. With nothing selected, selects the last root block.
    pub fn select_previous(&mut self) -> bool {
        self.step_selection(-1)
    }

    /// Select the next sibling. With nothing selected, selects the first root block.
    pub fn select_next(&mut self) -> bool {
        self.step_selection(1)
    }

    fn step_selection(&mut self, step: isize) -> bool {
        let blocks = &self.current.blocks;

        let target = match self
            .selected
            .as_ref()
            .and_then(|id| tree::find_path_by_id(blocks, id))
        {
            Some(mut path) => {
                let Some(index) = path.pop() else {
                    return false;
                };
                let siblings = tree::children_at(blocks, &path).unwrap_or(&[]);
                index
                    .checked_add_signed(step)
                    .and_then(|i| siblings.get(i))
            }
            None if step < 0 => blocks.last(),
            None => blocks.first(),
        };

        match target.map(|b| b.id.clone()) {
            Some(id) => {
                self.selected = Some(id);
                true
            }
            None => false,
        }
    }

    /// Run the command bound to `event`, if any
    pub fn handle_key(&mut self, event: &KeyEvent, platform: Platform) -> Option<EditorCommand> {
        let command = keyboard::resolve(event, platform)?;
        match command {
            EditorCommand::Undo => {
                self.undo();
            }
            EditorCommand::Redo => {
                self.redo();
            }
            EditorCommand::DeleteSelection => {
                if let Some(id) = self.selected.take() {
                    self.remove_block(&id);
                }
            }
            EditorCommand::ClearSelection => self.clear_selection(),
            EditorCommand::SelectPrevious => {
                self.select_previous();
            }
            EditorCommand::SelectNext => {
                self.select_next();
            }
        }
        Some(command)
    }

    // Persistence bookkeeping

    /// The store acknowledged `revision`. The session is clean only if
    /// nothing changed since that revision was captured.
    pub fn mark_saved(&mut self, revision: u64) {
        if revision == self.revision {
            self.dirty = false;
        } else {
            tracing::debug!(
                saved = revision,
                current = self.revision,
                "save acknowledged for an older revision, still dirty"
            );
        }
        self.log(EventType::Saved { revision });
    }
}

/// `config` with one block's payload edited
fn with_block_data<F>(
    config: &WidgetConfig,
    id: &BlockId,
    edit: F,
) -> Result<WidgetConfig, PathResolutionError>
where
    F: FnOnce(&mut Map<String, Value>),
{
    let path = tree::find_path_by_id(&config.blocks, id)
        .ok_or_else(|| PathResolutionError::UnknownId(id.clone()))?;
    let mut block = tree::get_at_path(&config.blocks, &path)
        .cloned()
        .ok_or_else(|| PathResolutionError::UnknownId(id.clone()))?;

    edit(&mut block.data);
    if block.data.remove(CHILDREN_KEY).is_some() {
        tracing::debug!(block_id = %id, "children are edited structurally, dropping payload key");
    }

    let blocks = tree::set_at_path(&config.blocks, &path, block)?;
    Ok(config.with_blocks(blocks))
}
