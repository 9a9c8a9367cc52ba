use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::entity::EntityType;
use crate::error::MigrateError;
use crate::row::RowId;

/// Outcome of a successful project migration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Report {
    pub source_project: RowId,
    pub destination_project: RowId,
    /// Migrated rows per entity type, zero included.
    pub counts: BTreeMap<EntityType, usize>,
    /// On-disk attachment filenames in the order they were migrated. The
    /// files themselves must be copied separately.
    pub attachment_files: Vec<String>,
}

impl Report {
    #[must_use]
    pub fn count(&self, entity: EntityType) -> usize {
        self.counts.get(&entity).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.counts.values().sum()
    }

    /// Attachment filenames, one per line.
    #[must_use]
    pub fn attachment_list(&self) -> String {
        self.attachment_files.iter().fold(String::new(), |mut list, file| {
            list.push_str(file);
            list.push('\n');
            list
        })
    }

    /// Write [`Report::attachment_list`] to `path` for the file-copy step.
    ///
    /// # Errors
    /// Returns [`MigrateError::Io`] when the file cannot be written.
    pub fn write_attachment_list(&self, path: &Path) -> Result<(), MigrateError> {
        fs::write(path, self.attachment_list()).map_err(|source| MigrateError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
