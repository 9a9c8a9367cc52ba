use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MigrateError;
use crate::mapping::ManualMappings;
use crate::row::RowId;

fn default_preflight() -> bool {
    true
}

/// Everything a run needs besides the two row stores.
///
/// ```yaml
/// project_id: 4
/// attachment_list: attachments.txt
/// mappings:
///   users: { 1: 10, 5: 35 }
///   priorities: { 15: 3, 16: 4 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub project_id: RowId,
    #[serde(default)]
    pub mappings: ManualMappings,
    /// Scan the source for unmapped values before the first insert.
    #[serde(default = "default_preflight")]
    pub preflight: bool,
    /// Where to write the attachment filenames for the out-of-band file copy.
    #[serde(default)]
    pub attachment_list: Option<PathBuf>,
}

impl MigrationConfig {
    #[must_use]
    pub fn new(project_id: RowId, mappings: ManualMappings) -> Self {
        Self {
            project_id,
            mappings,
            preflight: true,
            attachment_list: None,
        }
    }

    /// Parse a YAML configuration document.
    ///
    /// # Errors
    /// Returns [`MigrateError::Config`] when the document is malformed.
    pub fn from_yaml_str(input: &str) -> Result<Self, MigrateError> {
        serde_yaml::from_str(input)
            .map_err(|err| MigrateError::Config(format!("invalid YAML configuration: {err}")))
    }

    /// Parse a JSON configuration document. Mapping keys are written as strings.
    ///
    /// # Errors
    /// Returns [`MigrateError::Config`] when the document is malformed.
    pub fn from_json_str(input: &str) -> Result<Self, MigrateError> {
        serde_json::from_str(input)
            .map_err(|err| MigrateError::Config(format!("invalid JSON configuration: {err}")))
    }

    /// Load a configuration file; `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, MigrateError> {
        let body = fs::read_to_string(path).map_err(|err| {
            MigrateError::Config(format!("failed to read {}: {err}", path.display()))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&body)
        } else {
            Self::from_yaml_str(&body)
        }
    }
}
