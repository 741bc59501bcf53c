//! Editor settings loaded from environment variables.

use crate::history::DEFAULT_MAX_DEPTH;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default trailing debounce before an autosave fires
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 800;

/// Serialized config size above which the editor shows a warning
pub const DEFAULT_SIZE_WARNING_BYTES: usize = 200_000;

/// Runtime settings for an editor session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    /// Maximum undo entries, at least 1
    pub history_depth: usize,
    pub autosave_debounce_ms: u64,
    pub size_warning_bytes: usize,
    /// Root directory for `FileStore`
    pub data_dir: PathBuf,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_MAX_DEPTH,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            size_warning_bytes: DEFAULT_SIZE_WARNING_BYTES,
            data_dir: default_data_dir(),
        }
    }
}

impl EditorSettings {
    /// Load settings from environment variables.
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self {
            history_depth: env_parse("WIDGET_EDITOR_HISTORY_DEPTH")
                .unwrap_or(DEFAULT_MAX_DEPTH)
                .max(1),
            autosave_debounce_ms: env_parse("WIDGET_EDITOR_AUTOSAVE_DEBOUNCE_MS")
                .unwrap_or(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            size_warning_bytes: env_parse("WIDGET_EDITOR_SIZE_WARNING_BYTES")
                .unwrap_or(DEFAULT_SIZE_WARNING_BYTES),
            data_dir: env::var("WIDGET_EDITOR_DATA_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(|dir| PathBuf::from(expand_tilde(dir)))
                .unwrap_or_else(default_data_dir),
        }
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

fn default_data_dir() -> PathBuf {
    let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cache").join("widget-editor")
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    // Windows
    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    env::current_dir().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EditorSettings::default();
        assert_eq!(settings.history_depth, 100);
        assert_eq!(settings.autosave_debounce(), Duration::from_millis(800));
        assert_eq!(settings.size_warning_bytes, 200_000);
        assert!(settings.data_dir.ends_with(".cache/widget-editor"));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/srv/widgets".to_string()), "/srv/widgets");
        assert_eq!(expand_tilde("relative/dir".to_string()), "relative/dir");
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        assert_eq!(env_parse::<u64>("WIDGET_EDITOR_TEST_SURELY_UNSET_VARIABLE"), None);

        env::set_var("WIDGET_EDITOR_TEST_GARBAGE_DEBOUNCE", "soon");
        assert_eq!(env_parse::<u64>("WIDGET_EDITOR_TEST_GARBAGE_DEBOUNCE"), None);

        env::set_var("WIDGET_EDITOR_TEST_PADDED_DEBOUNCE", " 250 ");
        assert_eq!(env_parse::<u64>("WIDGET_EDITOR_TEST_PADDED_DEBOUNCE"), Some(250));
    }
}
