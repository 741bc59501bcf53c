//! # Widget persistence
//!
//! The draft/publish contract the editor talks to, with two backends:
//!
//! - [`MemoryStore`]: in-process maps, with an offline switch for failure paths
//! - [`FileStore`]: one directory per widget
//!
//! ```text
//! <root>/<widget>/
//!   manifest.json        owner organization, latest version, timestamps
//!   draft.json           the live autosaved config
//!   versions/
//!     v000001.json       immutable published copies
//! ```
//!
//! Publishing copies the *persisted* draft, never the editor's in-memory state.

use crate::id_generator::IdGenerator;
use crate::{BlockId, PersistenceError, WidgetConfig, WidgetId};
use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The live, autosaved config of a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub widget_id: WidgetId,
    pub config: WidgetConfig,
    pub updated_at: DateTime<Utc>,
}

/// An immutable published copy of a draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub widget_id: WidgetId,
    /// Starts at 1, increases by one per publish
    pub version: u32,
    pub config: WidgetConfig,
    pub published_at: DateTime<Utc>,
}

impl PublishedRecord {
    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            version: self.version,
            published_at: self.published_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: u32,
    pub published_at: DateTime<Utc>,
}

/// Organization the caller acts for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthScope {
    pub org_id: String,
}

impl AuthScope {
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
        }
    }
}

/// Draft and version storage for widgets
pub trait WidgetStore {
    fn load_draft(&self, widget: &WidgetId) -> Result<Option<DraftRecord>, PersistenceError>;

    /// Persist `config` as the draft. Saving the config already stored
    /// returns the existing record without touching its timestamp.
    fn save_draft(
        &mut self,
        widget: &WidgetId,
        config: &WidgetConfig,
    ) -> Result<DraftRecord, PersistenceError>;

    /// Copy the persisted draft into version `latest + 1`.
    /// On failure no version is created.
    fn publish(
        &mut self,
        widget: &WidgetId,
        scope: &AuthScope,
    ) -> Result<PublishedRecord, PersistenceError>;

    fn fetch_version(
        &self,
        widget: &WidgetId,
        version: u32,
    ) -> Result<Option<PublishedRecord>, PersistenceError>;

    /// Published versions, oldest first
    fn list_versions(&self, widget: &WidgetId) -> Result<Vec<VersionSummary>, PersistenceError>;
}

/// The persisted draft, or the starter config when there is none yet
pub fn load_or_default<S: WidgetStore + ?Sized>(
    store: &S,
    widget: &WidgetId,
    ids: &mut IdGenerator,
) -> Result<WidgetConfig, PersistenceError> {
    match store.load_draft(widget)? {
        Some(draft) => {
            tracing::debug!(widget_id = %widget, "loaded persisted draft");
            Ok(draft.config)
        }
        None => {
            tracing::info!(widget_id = %widget, "no draft found, starting from default config");
            let heading: BlockId = ids.next_id(&HashSet::new());
            Ok(WidgetConfig::starter(heading))
        }
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    owners: HashMap<WidgetId, String>,
    drafts: HashMap<WidgetId, DraftRecord>,
    versions: HashMap<WidgetId, Vec<PublishedRecord>>,
    offline: bool,
    max_draft_bytes: Option<usize>,
    save_calls: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drafts whose serialized size exceeds `limit` are rejected
    pub fn with_max_draft_bytes(mut self, limit: usize) -> Self {
        self.max_draft_bytes = Some(limit);
        self
    }

    /// Record which organization owns `widget`
    pub fn register_widget(&mut self, widget: WidgetId, org_id: impl Into<String>) {
        self.owners.insert(widget, org_id.into());
    }

    /// While offline every call fails with `Unavailable`
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Number of `save_draft` calls received, failed ones included
    pub fn save_calls(&self) -> usize {
        self.save_calls
    }

    fn ensure_online(&self) -> Result<(), PersistenceError> {
        if self.offline {
            Err(PersistenceError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl WidgetStore for MemoryStore {
    fn load_draft(&self, widget: &WidgetId) -> Result<Option<DraftRecord>, PersistenceError> {
        self.ensure_online()?;
        Ok(self.drafts.get(widget).cloned())
    }

    fn save_draft(
        &mut self,
        widget: &WidgetId,
        config: &WidgetConfig,
    ) -> Result<DraftRecord, PersistenceError> {
        self.save_calls += 1;
        self.ensure_online()?;

        if let Some(limit) = self.max_draft_bytes {
            let size = config
                .byte_size()
                .map_err(|e| PersistenceError::Rejected(e.to_string()))?;
            if size > limit {
                return Err(PersistenceError::Rejected(format!(
                    "draft is {} bytes, limit is {}",
                    size, limit
                )));
            }
        }

        if let Some(existing) = self.drafts.get(widget) {
            if &existing.config == config {
                return Ok(existing.clone());
            }
        }

        let record = DraftRecord {
            widget_id: widget.clone(),
            config: config.clone(),
            updated_at: Utc::now(),
        };
        self.drafts.insert(widget.clone(), record.clone());
        Ok(record)
    }

    fn publish(
        &mut self,
        widget: &WidgetId,
        scope: &AuthScope,
    ) -> Result<PublishedRecord, PersistenceError> {
        self.ensure_online()?;

        if self.owners.get(widget) != Some(&scope.org_id) {
            return Err(PersistenceError::Unauthorized(scope.org_id.clone()));
        }

        let draft = self
            .drafts
            .get(widget)
            .ok_or_else(|| PersistenceError::NoDraft(widget.to_string()))?;

        let versions = self.versions.entry(widget.clone()).or_default();
        let record = PublishedRecord {
            widget_id: widget.clone(),
            version: versions.last().map_or(1, |v| v.version + 1),
            config: draft.config.clone(),
            published_at: Utc::now(),
        };
        versions.push(record.clone());
        Ok(record)
    }

    fn fetch_version(
        &self,
        widget: &WidgetId,
        version: u32,
    ) -> Result<Option<PublishedRecord>, PersistenceError> {
        self.ensure_online()?;
        Ok(self
            .versions
            .get(widget)
            .and_then(|versions| versions.iter().find(|v| v.version == version))
            .cloned())
    }

    fn list_versions(&self, widget: &WidgetId) -> Result<Vec<VersionSummary>, PersistenceError> {
        self.ensure_online()?;
        Ok(self
            .versions
            .get(widget)
            .map(|versions| versions.iter().map(PublishedRecord::summary).collect())
            .unwrap_or_default())
    }
}

/// Per-widget metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: String,
    pub widget_id: WidgetId,
    pub owner_org: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// 0 until the first publish
    pub latest_version: u32,
}

impl Manifest {
    /// Create a new manifest
    pub fn new(widget_id: WidgetId, owner_org: String) -> Self {
        let now = Utc::now();
        Self {
            format_version: "1".to_string(),
            widget_id,
            owner_org,
            created: now,
            modified: now,
            latest_version: 0,
        }
    }

    /// Update the modified timestamp
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

/// Directory-backed store
pub struct FileStore {
    /// Root directory holding one subdirectory per widget
    root_dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `path`, creating the directory if needed
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create store directory: {}", path.display()))?;
        Ok(Self {
            root_dir: path.to_path_buf(),
        })
    }

    /// Get the root directory
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Create the widget's directory and manifest. Existing widgets keep
    /// their manifest.
    pub fn register_widget(
        &mut self,
        widget: &WidgetId,
        org_id: impl Into<String>,
    ) -> Result<(), PersistenceError> {
        let dir = self.widget_dir(widget)?;
        let org_id = org_id.into();
        let result = (|| -> anyhow::Result<()> {
            let manifest_path = dir.join("manifest.json");
            if read_json::<Manifest>(&manifest_path)?.is_some() {
                return Ok(());
            }
            fs::create_dir_all(dir.join("versions")).with_context(|| {
                format!("Failed to create versions directory: {}", dir.display())
            })?;
            write_json_atomic(&manifest_path, &Manifest::new(widget.clone(), org_id))
        })();
        result.map_err(PersistenceError::storage)
    }

    fn widget_dir(&self, widget: &WidgetId) -> Result<PathBuf, PersistenceError> {
        let name = widget.as_str();
        let safe = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !safe {
            return Err(PersistenceError::Rejected(format!(
                "widget id `{}` is not a valid directory name",
                name
            )));
        }
        Ok(self.root_dir.join(name))
    }

    fn manifest(&self, widget: &WidgetId) -> Result<Option<Manifest>, PersistenceError> {
        let path = self.widget_dir(widget)?.join("manifest.json");
        read_json(&path).map_err(PersistenceError::storage)
    }

    fn version_path(&self, widget: &WidgetId, version: u32) -> Result<PathBuf, PersistenceError> {
        Ok(self
            .widget_dir(widget)?
            .join("versions")
            .join(format!("v{:06}.json", version)))
    }
}

impl WidgetStore for FileStore {
    fn load_draft(&self, widget: &WidgetId) -> Result<Option<DraftRecord>, PersistenceError> {
        let path = self.widget_dir(widget)?.join("draft.json");
        read_json(&path).map_err(PersistenceError::storage)
    }

    fn save_draft(
        &mut self,
        widget: &WidgetId,
        config: &WidgetConfig,
    ) -> Result<DraftRecord, PersistenceError> {
        let dir = self.widget_dir(widget)?;
        if let Some(existing) = self.load_draft(widget)? {
            if &existing.config == config {
                return Ok(existing);
            }
        }

        let record = DraftRecord {
            widget_id: widget.clone(),
            config: config.clone(),
            updated_at: Utc::now(),
        };

        let result = (|| -> anyhow::Result<()> {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create widget directory: {}", dir.display()))?;
            write_json_atomic(&dir.join("draft.json"), &record)
        })();
        result.map_err(PersistenceError::storage)?;

        tracing::debug!(widget_id = %widget, path = %dir.display(), "draft written");
        Ok(record)
    }

    fn publish(
        &mut self,
        widget: &WidgetId,
        scope: &AuthScope,
    ) -> Result<PublishedRecord, PersistenceError> {
        let mut manifest = match self.manifest(widget)? {
            Some(manifest) if manifest.owner_org == scope.org_id => manifest,
            _ => return Err(PersistenceError::Unauthorized(scope.org_id.clone())),
        };

        let draft = self
            .load_draft(widget)?
            .ok_or_else(|| PersistenceError::NoDraft(widget.to_string()))?;

        let record = PublishedRecord {
            widget_id: widget.clone(),
            version: manifest.latest_version + 1,
            config: draft.config,
            published_at: Utc::now(),
        };

        let version_path = self.version_path(widget, record.version)?;
        let manifest_path = self.widget_dir(widget)?.join("manifest.json");

        // The manifest only moves once the version file is in place
        let result = (|| -> anyhow::Result<()> {
            if version_path.exists() {
                return Err(anyhow!(
                    "version file already exists: {}",
                    version_path.display()
                ));
            }
            if let Some(dir) = version_path.parent() {
                fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create versions directory: {}", dir.display())
                })?;
            }
            write_json_atomic(&version_path, &record)?;
            manifest.latest_version = record.version;
            manifest.touch();
            write_json_atomic(&manifest_path, &manifest)
        })();
        result.map_err(PersistenceError::storage)?;

        Ok(record)
    }

    fn fetch_version(
        &self,
        widget: &WidgetId,
        version: u32,
    ) -> Result<Option<PublishedRecord>, PersistenceError> {
        let path = self.version_path(widget, version)?;
        read_json(&path).map_err(PersistenceError::storage)
    }

    fn list_versions(&self, widget: &WidgetId) -> Result<Vec<VersionSummary>, PersistenceError> {
        let Some(manifest) = self.manifest(widget)? else {
            return Ok(Vec::new());
        };

        let mut summaries = Vec::with_capacity(manifest.latest_version as usize);
        for version in 1..=manifest.latest_version {
            match self.fetch_version(widget, version)? {
                Some(record) => summaries.push(record.summary()),
                None => tracing::warn!(widget_id = %widget, version, "missing published version file"),
            }
        }
        Ok(summaries)
    }
}

/// Read a JSON file, `None` if it does not exist
fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
    let reader = BufReader::new(file);
    let value = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse: {}", path.display()))?;
    Ok(Some(value))
}

/// Write pretty JSON to a sibling temp file, then rename it over `path`
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let tmp_path = path.with_extension("json.tmp");

    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create: {}", tmp_path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write: {}", tmp_path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush: {}", tmp_path.display()))?;
    drop(writer);

    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to move {} into place at {}",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
