//! Per-entity migrators and the attachment collector.
//!
//! Every entity type follows the same skeleton: select the rows scoped to the
//! parent's source id, resolve each row, insert it, record the new id, then
//! migrate the row's attachments and owned entity types. A row and its
//! mapping are always committed before anything that references it.

use tracing::debug;

use crate::entity::{ContainerType, EntityType};
use crate::error::MigrateError;
use crate::resolver::{source_id, Resolver};
use crate::row::{Row, RowId, Value};
use crate::store::{DestinationStore, SourceStore};
use crate::translation::TranslationStore;

const ATTACHMENT_FILENAME_COLUMN: &str = "disk_filename";
const ATTACHMENT_CONTAINER_COLUMN: &str = "container_id";

/// State of one migration run. Owned by a single run and dropped afterwards.
pub(crate) struct Run<'r, S: ?Sized, D: ?Sized> {
    source: &'r S,
    destination: &'r mut D,
    resolver: Resolver<'r>,
    translations: TranslationStore,
    attachment_files: Vec<String>,
}

impl<'r, S, D> Run<'r, S, D>
where
    S: SourceStore + ?Sized,
    D: DestinationStore + ?Sized,
{
    pub(crate) fn new(source: &'r S, destination: &'r mut D, resolver: Resolver<'r>) -> Self {
        Self {
            source,
            destination,
            resolver,
            translations: TranslationStore::new(),
            attachment_files: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> (TranslationStore, Vec<String>) {
        (self.translations, self.attachment_files)
    }

    /// Migrate the project row and, through it, the whole dependent graph.
    pub(crate) fn migrate_project(&mut self, project: RowId) -> Result<RowId, MigrateError> {
        let entity = EntityType::Project;
        let rows = self.source.select(entity.table(), &entity.scope_filter(project))?;
        let row = match rows.as_slice() {
            [row] => row,
            [] => return Err(MigrateError::ProjectNotFound(project)),
            _ => {
                return Err(MigrateError::InvalidRow {
                    entity,
                    reason: format!("{} rows share id {project}", rows.len()),
                })
            }
        };

        let (old_id, new_id) = self.migrate_row(entity, row)?;
        self.migrate_dependents(entity, old_id, new_id)?;
        Ok(new_id)
    }

    /// Migrate every `entity` row owned by the parent with source id `parent`.
    fn migrate_entity(&mut self, entity: EntityType, parent: RowId) -> Result<usize, MigrateError> {
        if let Some(column) = entity.tree_column() {
            return self.migrate_tree(entity, column, parent);
        }

        let rows = self.source.select(entity.table(), &entity.scope_filter(parent))?;
        for row in &rows {
            let (old_id, new_id) = self.migrate_row(entity, row)?;
            self.migrate_dependents(entity, old_id, new_id)?;
        }

        if !rows.is_empty() {
            debug!(%entity, %parent, migrated = rows.len(), "migrated scoped rows");
        }
        Ok(rows.len())
    }

    /// Pre-order walk over the rows of `scope` linked through `column`,
    /// using an explicit worklist.
    ///
    /// Children of a row are only selected after the row itself has a
    /// destination id, so `column` always resolves.
    fn migrate_tree(
        &mut self,
        entity: EntityType,
        column: &str,
        scope: RowId,
    ) -> Result<usize, MigrateError> {
        let roots = entity.scope_filter(scope).is_null(column);
        let mut pending = self.source.select(entity.table(), &roots)?;
        pending.reverse();

        let mut reached = 0;
        while let Some(row) = pending.pop() {
            let (old_id, new_id) = self.migrate_row(entity, &row)?;
            self.migrate_dependents(entity, old_id, new_id)?;
            reached += 1;

            let children = entity.scope_filter(scope).eq(column, old_id);
            let mut children = self.source.select(entity.table(), &children)?;
            children.reverse();
            pending.extend(children);
        }

        let total = self
            .source
            .select(entity.table(), &entity.scope_filter(scope))?
            .len();
        if total != reached {
            return Err(MigrateError::UnreachableRows {
                entity,
                scope,
                total,
                reached,
            });
        }

        if reached > 0 {
            debug!(%entity, %scope, migrated = reached, "migrated row tree");
        }
        Ok(reached)
    }

    /// Attachments first, then owned entity types in graph order.
    fn migrate_dependents(
        &mut self,
        entity: EntityType,
        old_id: RowId,
        new_id: RowId,
    ) -> Result<(), MigrateError> {
        if let Some(container) = entity.container() {
            self.migrate_attachments(container, old_id, new_id)?;
        }
        for child in entity.children() {
            self.migrate_entity(*child, old_id)?;
        }
        Ok(())
    }

    /// Copy the attachment rows of one container and queue their files for
    /// the out-of-band copy.
    pub(crate) fn migrate_attachments(
        &mut self,
        container: ContainerType,
        container_old: RowId,
        container_new: RowId,
    ) -> Result<usize, MigrateError> {
        let entity = EntityType::Attachment;
        let filter = container.attachment_filter(container_old);
        let rows = self.source.select(entity.table(), &filter)?;

        for row in &rows {
            let old_id = source_id(entity, row)?;
            let filename =
                attachment_filename(row).map_err(|err| err.in_row(entity, old_id))?;
            let mut resolved = self
                .resolver
                .resolve(entity, row, &self.translations)
                .map_err(|err| err.in_row(entity, old_id))?;
            resolved.insert(
                ATTACHMENT_CONTAINER_COLUMN.to_string(),
                Value::from(container_new),
            );

            self.insert_row(entity, old_id, &resolved)?;
            self.attachment_files.push(filename);
        }

        if !rows.is_empty() {
            debug!(
                %container,
                %container_old,
                %container_new,
                migrated = rows.len(),
                "migrated attachments"
            );
        }
        Ok(rows.len())
    }

    fn migrate_row(
        &mut self,
        entity: EntityType,
        row: &Row,
    ) -> Result<(RowId, RowId), MigrateError> {
        let old_id = source_id(entity, row)?;
        let resolved = self
            .resolver
            .resolve(entity, row, &self.translations)
            .map_err(|err| err.in_row(entity, old_id))?;
        let new_id = self.insert_row(entity, old_id, &resolved)?;
        Ok((old_id, new_id))
    }

    fn insert_row(
        &mut self,
        entity: EntityType,
        old_id: RowId,
        resolved: &Row,
    ) -> Result<RowId, MigrateError> {
        if self.translations.get(entity, old_id).is_some() {
            return Err(MigrateError::DuplicateKey { entity, old_id }.in_row(entity, old_id));
        }

        let new_id = self
            .destination
            .insert(entity.table(), resolved)
            .map_err(|err| MigrateError::from(err).in_row(entity, old_id))?;
        self.translations
            .record(entity, old_id, new_id)
            .map_err(|err| err.in_row(entity, old_id))?;

        debug!(%entity, %old_id, %new_id, "migrated row");
        Ok(new_id)
    }
}

fn attachment_filename(row: &Row) -> Result<String, MigrateError> {
    row.get(ATTACHMENT_FILENAME_COLUMN)
        .and_then(Value::as_text)
        .map(ToString::to_string)
        .ok_or_else(|| MigrateError::InvalidRow {
            entity: EntityType::Attachment,
            reason: format!("missing `{ATTACHMENT_FILENAME_COLUMN}`"),
        })
}

/// Every row of `entity` owned by `parent` in the source, for callers that
/// need to inspect a scope without migrating it.
pub(crate) fn scoped_rows<S: SourceStore + ?Sized>(
    source: &S,
    entity: EntityType,
    parent: RowId,
) -> Result<Vec<Row>, MigrateError> {
    Ok(source.select(entity.table(), &entity.scope_filter(parent))?)
}

pub(crate) fn attachment_rows<S: SourceStore + ?Sized>(
    source: &S,
    container: ContainerType,
    container_old: RowId,
) -> Result<Vec<Row>, MigrateError> {
    let filter = container.attachment_filter(container_old);
    Ok(source.select(EntityType::Attachment.table(), &filter)?)
}
