use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::entity::EntityType;
use crate::error::MigrateError;
use crate::row::RowId;

/// Run-scoped, append-only table of source id -> destination id per entity type.
#[derive(Debug, Default, Clone)]
pub struct TranslationStore {
    tables: BTreeMap<EntityType, BTreeMap<RowId, RowId>>,
}

impl TranslationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that source row `old_id` of `entity` became `new_id`.
    ///
    /// # Errors
    /// Returns [`MigrateError::DuplicateKey`] if `old_id` was already recorded for `entity`.
    pub fn record(
        &mut self,
        entity: EntityType,
        old_id: RowId,
        new_id: RowId,
    ) -> Result<(), MigrateError> {
        match self.tables.entry(entity).or_default().entry(old_id) {
            Entry::Occupied(_) => Err(MigrateError::DuplicateKey { entity, old_id }),
            Entry::Vacant(slot) => {
                slot.insert(new_id);
                Ok(())
            }
        }
    }

    /// # Errors
    /// Returns [`MigrateError::UnresolvedReference`] when nothing was recorded for `old_id`.
    pub fn resolve(&self, entity: EntityType, old_id: RowId) -> Result<RowId, MigrateError> {
        self.get(entity, old_id)
            .ok_or(MigrateError::UnresolvedReference { entity, old_id })
    }

    #[must_use]
    pub fn get(&self, entity: EntityType, old_id: RowId) -> Option<RowId> {
        self.tables
            .get(&entity)
            .and_then(|table| table.get(&old_id))
            .copied()
    }

    #[must_use]
    pub fn count(&self, entity: EntityType) -> usize {
        self.tables.get(&entity).map_or(0, BTreeMap::len)
    }

    /// Per-type counts, including zero for types with no rows.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<EntityType, usize> {
        EntityType::ALL
            .into_iter()
            .map(|entity| (entity, self.count(entity)))
            .collect()
    }

    pub fn entries(&self, entity: EntityType) -> impl Iterator<Item = (RowId, RowId)> + '_ {
        self.tables
            .get(&entity)
            .into_iter()
            .flat_map(|table| table.iter().map(|(old_id, new_id)| (*old_id, *new_id)))
    }
}
