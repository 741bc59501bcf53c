//! # Autosave and Publish
//!
//! Debounced draft persistence for an [`EditorSession`], plus explicit publish.
//!
//! The publisher never talks to a clock or a runtime itself: the host passes
//! `now` in and carries each [`SaveRequest`] to the store, then reports the
//! outcome through [`AutosavePublisher::finish_save`]. [`run_due_save`] does
//! the round trip synchronously for hosts that can block.
//!
//! ```text
//! Idle --change--> PendingSave --debounce elapsed, valid--> Saving
//! Saving --ok--> Idle            (or PendingSave if edited meanwhile)
//! Saving --err--> SaveError --change or retry--> PendingSave
//! ```
//!
//! [`run_due_save`]: AutosavePublisher::run_due_save

use crate::config::EditorSettings;
use crate::registry::BlockRegistry;
use crate::session::EditorSession;
use crate::store::{AuthScope, DraftRecord, PublishedRecord, WidgetStore};
use crate::validation::Validator;
use crate::{PersistenceError, PublishError, WidgetConfig, WidgetId};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    PendingSave,
    Saving,
    SaveError(String),
}

/// One draft save for the host to carry to the store
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    /// Session revision captured in `config`
    pub revision: u64,
    pub widget_id: WidgetId,
    pub config: WidgetConfig,
}

pub struct AutosavePublisher {
    debounce: Duration,
    state: SaveState,

    /// Last session revision seen by `observe`
    observed_revision: u64,
    /// Start of the current debounce window
    last_edit_at: Option<Instant>,
    /// Revision of the save in flight
    in_flight: Option<u64>,
    /// Skip the debounce on the next poll
    retry_requested: bool,

    blocked_by_validation: bool,
    last_saved_at: Option<DateTime<Utc>>,
    last_saved_revision: Option<u64>,
}

impl AutosavePublisher {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            state: SaveState::Idle,
            observed_revision: 0,
            last_edit_at: None,
            in_flight: None,
            retry_requested: false,
            blocked_by_validation: false,
            last_saved_at: None,
            last_saved_revision: None,
        }
    }

    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self::new(settings.autosave_debounce())
    }

    /// Start tracking `session` from its current revision
    pub fn attach(session: &EditorSession, debounce: Duration) -> Self {
        let mut publisher = Self::new(debounce);
        publisher.observed_revision = session.revision();
        publisher
    }

    pub fn state(&self) -> &SaveState {
        &self.state
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Changes are waiting but the config has validation issues
    pub fn blocked_by_validation(&self) -> bool {
        self.blocked_by_validation
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn last_saved_revision(&self) -> Option<u64> {
        self.last_saved_revision
    }

    /// Notice a change in `session`, restarting the debounce window
    pub fn observe(&mut self, session: &EditorSession, now: Instant) {
        let revision = session.revision();
        if revision == self.observed_revision {
            return;
        }
        self.observed_revision = revision;

        if !session.is_dirty() {
            // Reloaded from the store
            self.last_edit_at = None;
            if self.in_flight.is_none() {
                self.state = SaveState::Idle;
            }
            return;
        }

        self.last_edit_at = Some(now);
        if self.in_flight.is_none() {
            self.state = SaveState::PendingSave;
        }
    }

    /// The save that is due at `now`, if any. At most one save is in flight.
    pub fn poll(&mut self, session: &EditorSession, now: Instant) -> Option<SaveRequest> {
        self.observe(session, now);

        if self.in_flight.is_some() || self.state != SaveState::PendingSave {
            return None;
        }
        if !session.is_dirty() {
            self.state = SaveState::Idle;
            return None;
        }

        let last_edit = self.last_edit_at?;
        if !self.retry_requested && now.saturating_duration_since(last_edit) < self.debounce {
            return None;
        }

        if !session.is_valid() {
            if !self.blocked_by_validation {
                tracing::info!(
                    widget_id = %session.widget_id(),
                    issues = session.issues().len(),
                    "autosave held back by validation issues"
                );
            }
            self.blocked_by_validation = true;
            return None;
        }

        self.blocked_by_validation = false;
        self.retry_requested = false;
        self.state = SaveState::Saving;
        self.in_flight = Some(session.revision());

        tracing::debug!(widget_id = %session.widget_id(), revision = session.revision(), "autosave dispatched");
        Some(SaveRequest {
            revision: session.revision(),
            widget_id: session.widget_id().clone(),
            config: session.config().clone(),
        })
    }

    /// Apply the store's answer to the request for `revision`
    pub fn finish_save(
        &mut self,
        session: &mut EditorSession,
        revision: u64,
        result: Result<DraftRecord, PersistenceError>,
    ) {
        if self.in_flight != Some(revision) {
            tracing::warn!(revision, in_flight = ?self.in_flight, "ignoring save result with no matching request");
            return;
        }
        self.in_flight = None;

        match result {
            Ok(record) => {
                self.last_saved_at = Some(record.updated_at);
                self.last_saved_revision = Some(revision);
                session.mark_saved(revision);

                if session.is_dirty() {
                    // Edited while the save was in flight
                    self.state = SaveState::PendingSave;
                } else {
                    self.state = SaveState::Idle;
                }
                tracing::debug!(widget_id = %session.widget_id(), revision, "draft saved");
            }
            Err(err) => {
                tracing::warn!(widget_id = %session.widget_id(), revision, error = %err, "autosave failed");
                self.state = SaveState::SaveError(err.to_string());
            }
        }
    }

    /// Re-arm after a failed save; the next poll saves without waiting
    pub fn retry(&mut self, now: Instant) -> bool {
        if !matches!(self.state, SaveState::SaveError(_)) {
            return false;
        }
        self.state = SaveState::PendingSave;
        self.retry_requested = true;
        self.last_edit_at.get_or_insert(now);
        true
    }

    /// Poll and, if a save is due, perform it against `store` right away
    pub fn run_due_save<S: WidgetStore + ?Sized>(
        &mut self,
        session: &mut EditorSession,
        store: &mut S,
        now: Instant,
    ) -> Option<Result<DraftRecord, PersistenceError>> {
        let request = self.poll(session, now)?;
        let result = store.save_draft(&request.widget_id, &request.config);
        self.finish_save(session, request.revision, result.clone());
        Some(result)
    }

    /// Publish the persisted draft of `widget` as a new version.
    ///
    /// The draft is read back from the store and validated first; the
    /// in-memory session plays no part.
    pub fn publish<S: WidgetStore + ?Sized>(
        &self,
        store: &mut S,
        widget: &WidgetId,
        scope: &AuthScope,
        registry: &BlockRegistry,
    ) -> Result<PublishedRecord, PublishError> {
        let draft = store
            .load_draft(widget)?
            .ok_or_else(|| PersistenceError::NoDraft(widget.to_string()))?;

        let issues = Validator::validate(&draft.config, registry);
        if !issues.is_valid() {
            tracing::warn!(widget_id = %widget, issues = issues.len(), "publish refused, draft is invalid");
            return Err(PublishError::InvalidDraft(issues.len()));
        }

        let record = store.publish(widget, scope)?;
        tracing::info!(widget_id = %widget, version = record.version, "widget published");
        Ok(record)
    }
}
