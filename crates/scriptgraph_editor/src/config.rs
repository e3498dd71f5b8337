// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor preferences and layout metrics.
//!
//! Stored as RON next to the user's other editor settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current preferences format version
pub const PREFERENCES_FORMAT_VERSION: u32 = 1;

/// Default preferences file name
pub const PREFERENCES_FILE_NAME: &str = "scriptgraph.prefs.ron";

/// Preference loading errors
#[derive(Debug, Error)]
pub enum PreferencesError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid RON
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Preferences could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer editor
    #[error("Preferences version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },
}

/// Distances used by automatic alignment, in graph units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    /// Horizontal gap between aligned nodes
    pub horizontal_offset: f32,
    /// Vertical gap below a parent for execution dependents
    pub vertical_offset: f32,
    /// Half-width of the fan used to spread execution branches
    pub branch_spread: f32,
    /// Diagonal step used to tuck loop bodies beside their port
    pub diagonal_step: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            horizontal_offset: 30.0,
            vertical_offset: 30.0,
            branch_spread: 200.0,
            diagonal_step: 10.0,
        }
    }
}

/// User-facing editor preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    /// Format version
    pub version: u32,
    /// Log consistency warnings and rebuild diagnostics
    pub verbose_diagnostics: bool,
    /// Skip partial rebuilds and always recreate every visual
    pub always_full_rebuild: bool,
    /// Log creation/deletion counts after every pass
    pub log_rebuild_stats: bool,
    /// Maximum undo depth
    pub history_depth: usize,
    /// Alignment distances
    pub layout: LayoutMetrics,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_FORMAT_VERSION,
            verbose_diagnostics: false,
            always_full_rebuild: false,
            log_rebuild_stats: false,
            history_depth: 100,
            layout: LayoutMetrics::default(),
        }
    }
}

impl EditorPreferences {
    /// Parse preferences from RON text
    pub fn from_ron(content: &str) -> Result<Self, PreferencesError> {
        let preferences: EditorPreferences = ron::from_str(content)?;

        if preferences.version > PREFERENCES_FORMAT_VERSION {
            return Err(PreferencesError::UnsupportedVersion {
                found: preferences.version,
                supported: PREFERENCES_FORMAT_VERSION,
            });
        }

        Ok(preferences)
    }

    /// Serialize preferences to RON text
    pub fn to_ron(&self) -> Result<String, PreferencesError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load preferences from a file
    pub fn load(path: &Path) -> Result<Self, PreferencesError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Load preferences, falling back to defaults if the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self, PreferencesError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save preferences to a file
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default() {
        let prefs = EditorPreferences::default();
        assert!(!prefs.always_full_rebuild);
        assert_eq!(prefs.layout.vertical_offset, 30.0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let prefs = EditorPreferences::from_ron("(verbose_diagnostics: true, layout: (branch_spread: 120.0))").unwrap();
        assert!(prefs.verbose_diagnostics);
        assert_eq!(prefs.layout.branch_spread, 120.0);
        assert_eq!(prefs.layout.horizontal_offset, 30.0);
        assert_eq!(prefs.history_depth, 100);
    }

    #[test]
    fn test_newer_version_rejected() {
        let result = EditorPreferences::from_ron("(version: 99)");
        assert!(matches!(result, Err(PreferencesError::UnsupportedVersion { found: 99, .. })));
    }

    #[test]
    fn test_preferences_serialization() {
        let mut prefs = EditorPreferences::default();
        prefs.always_full_rebuild = true;
        let ron = prefs.to_ron().unwrap();
        assert_eq!(EditorPreferences::from_ron(&ron).unwrap(), prefs);
    }
}
