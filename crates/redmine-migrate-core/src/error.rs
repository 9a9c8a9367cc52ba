use crate::entity::EntityType;
use crate::mapping::UnmappedValue;
use crate::row::RowId;
use crate::store::StoreError;

/// Errors that abort a migration run. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    #[error("no destination id recorded for {entity} #{old_id}")]
    UnresolvedReference { entity: EntityType, old_id: RowId },
    #[error(transparent)]
    UnmappedValue(#[from] UnmappedValue),
    #[error("{entity} #{old_id} was already migrated in this run")]
    DuplicateKey { entity: EntityType, old_id: RowId },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("source project #{0} does not exist")]
    ProjectNotFound(RowId),
    #[error("invalid {entity} row: {reason}")]
    InvalidRow { entity: EntityType, reason: String },
    /// Rows of a tree-shaped entity type whose parent chain never reaches a
    /// root row inside the migrated scope: cycles, dangling parents, or
    /// parents owned by another project or wiki.
    #[error("only {reached} of {total} {entity} rows under #{scope} reach a root row")]
    UnreachableRows {
        entity: EntityType,
        scope: RowId,
        total: usize,
        reached: usize,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to migrate {entity} #{old_id}: {source}")]
    Row {
        entity: EntityType,
        old_id: RowId,
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    /// Attach the row being migrated, unless the error already names one.
    #[must_use]
    pub fn in_row(self, entity: EntityType, old_id: RowId) -> Self {
        match self {
            Self::Row { .. } => self,
            other => Self::Row {
                entity,
                old_id,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any row context stripped.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Row { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// The innermost row that blocked progress, if any.
    #[must_use]
    pub fn failed_row(&self) -> Option<(EntityType, RowId)> {
        match self {
            Self::Row {
                entity,
                old_id,
                source,
            } => source.failed_row().or(Some((*entity, *old_id))),
            _ => None,
        }
    }
}
