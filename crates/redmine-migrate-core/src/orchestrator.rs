use std::collections::BTreeSet;

use tracing::{error, info};

use crate::config::MigrationConfig;
use crate::entity::EntityType;
use crate::error::MigrateError;
use crate::mapping::{ManualMappings, UnmappedValue};
use crate::migrator::{attachment_rows, scoped_rows, Run};
use crate::report::Report;
use crate::resolver::{source_id, Resolver};
use crate::row::{Row, RowId};
use crate::store::{DestinationStore, SourceStore};

/// Drives the fixed traversal for one project inside a single destination
/// transaction.
#[derive(Debug, Clone, Copy)]
pub struct ProjectMigrator<'m> {
    mappings: &'m ManualMappings,
    preflight: bool,
}

impl<'m> ProjectMigrator<'m> {
    #[must_use]
    pub fn new(mappings: &'m ManualMappings) -> Self {
        Self {
            mappings,
            preflight: true,
        }
    }

    #[must_use]
    pub fn from_config(config: &'m MigrationConfig) -> Self {
        Self::new(&config.mappings).with_preflight(config.preflight)
    }

    /// Toggle the read-only mapping check that runs before the first insert.
    #[must_use]
    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    /// Walk the project's source graph without writing and list every
    /// manually mapped value that has no mapping entry, sorted and de-duplicated.
    ///
    /// # Errors
    /// Returns an error when the project does not exist or a source read fails.
    pub fn preflight<S>(
        &self,
        source: &S,
        project: RowId,
    ) -> Result<Vec<UnmappedValue>, MigrateError>
    where
        S: SourceStore + ?Sized,
    {
        let projects = scoped_rows(source, EntityType::Project, project)?;
        if projects.is_empty() {
            return Err(MigrateError::ProjectNotFound(project));
        }

        let mut gaps = BTreeSet::new();
        self.scan(source, EntityType::Project, &projects, &mut gaps)?;
        Ok(gaps.into_iter().collect())
    }

    fn scan<S>(
        &self,
        source: &S,
        entity: EntityType,
        rows: &[Row],
        gaps: &mut BTreeSet<UnmappedValue>,
    ) -> Result<(), MigrateError>
    where
        S: SourceStore + ?Sized,
    {
        let resolver = Resolver::new(self.mappings);
        for row in rows {
            gaps.extend(resolver.unmapped_values(entity, row));
            let old_id = source_id(entity, row)?;

            if let Some(container) = entity.container() {
                for attachment in attachment_rows(source, container, old_id)? {
                    gaps.extend(resolver.unmapped_values(EntityType::Attachment, &attachment));
                }
            }
            for child in entity.children() {
                let children = scoped_rows(source, *child, old_id)?;
                self.scan(source, *child, &children, gaps)?;
            }
        }
        Ok(())
    }

    /// Migrate source project `project` and everything it owns.
    ///
    /// The run either commits completely or is rolled back on the first
    /// failure. It is not idempotent: migrating the same project twice into
    /// one destination produces two independent copies.
    ///
    /// # Errors
    /// Returns the first resolution, mapping, or store error, wrapped with the
    /// entity type and source id of the row that failed.
    pub fn migrate_project<S, D>(
        &self,
        source: &S,
        destination: &mut D,
        project: RowId,
    ) -> Result<Report, MigrateError>
    where
        S: SourceStore + ?Sized,
        D: DestinationStore + ?Sized,
    {
        info!(%project, "starting project migration");

        if self.preflight {
            let gaps = self.preflight(source, project)?;
            if let Some(first) = gaps.first() {
                for gap in &gaps {
                    error!(%gap, "missing manual mapping");
                }
                return Err(first.clone().into());
            }
        }

        destination.begin()?;

        let mut run = Run::new(source, &mut *destination, Resolver::new(self.mappings));
        let outcome = run.migrate_project(project);
        let (translations, attachment_files) = run.finish();

        let destination_project = match outcome {
            Ok(id) => id,
            Err(err) => {
                if let Some((entity, old_id)) = err.failed_row() {
                    error!(%entity, %old_id, error = %err, "project migration aborted");
                } else {
                    error!(error = %err, "project migration aborted");
                }
                if let Err(rollback_err) = destination.rollback() {
                    error!(error = %rollback_err, "failed to roll back destination");
                }
                return Err(err);
            }
        };

        if let Err(err) = destination.commit() {
            if let Err(rollback_err) = destination.rollback() {
                error!(error = %rollback_err, "failed to roll back destination");
            }
            return Err(err.into());
        }

        let report = Report {
            source_project: project,
            destination_project,
            counts: translations.counts(),
            attachment_files,
        };

        for entity in EntityType::dependency_order() {
            info!("{}: {}", entity.label(), report.count(entity));
        }
        info!(
            %project,
            %destination_project,
            rows = report.total_rows(),
            attachment_files = report.attachment_files.len(),
            "project migration complete"
        );

        Ok(report)
    }
}

/// Migrate the configured project and write the attachment list if a path is configured.
///
/// # Errors
/// Returns an error when the migration fails or the attachment list cannot be written.
pub fn run_migration<S, D>(
    config: &MigrationConfig,
    source: &S,
    destination: &mut D,
) -> Result<Report, MigrateError>
where
    S: SourceStore + ?Sized,
    D: DestinationStore + ?Sized,
{
    let report = ProjectMigrator::from_config(config).migrate_project(
        source,
        destination,
        config.project_id,
    )?;

    if let Some(path) = &config.attachment_list {
        report.write_attachment_list(path)?;
        info!(
            path = %path.display(),
            files = report.attachment_files.len(),
            "wrote attachment list"
        );
    }

    Ok(report)
}
