use crate::entity::{EntityType, FieldRule};
use crate::error::MigrateError;
use crate::mapping::{ManualMappings, UnmappedValue};
use crate::row::{Row, RowId, Value, ID_COLUMN};
use crate::translation::TranslationStore;

/// Source identifier of `row`.
///
/// # Errors
/// Returns [`MigrateError::InvalidRow`] when the row has no integer `id`.
pub fn source_id(entity: EntityType, row: &Row) -> Result<RowId, MigrateError> {
    match row.get(ID_COLUMN) {
        Some(Value::Integer(id)) => Ok(RowId(*id)),
        Some(other) => Err(MigrateError::InvalidRow {
            entity,
            reason: format!("`{ID_COLUMN}` is not an integer: {other}"),
        }),
        None => Err(MigrateError::InvalidRow {
            entity,
            reason: format!("missing `{ID_COLUMN}` column"),
        }),
    }
}

fn integer_field(entity: EntityType, column: &str, value: &Value) -> Result<i64, MigrateError> {
    value.as_integer().ok_or_else(|| MigrateError::InvalidRow {
        entity,
        reason: format!("`{column}` is not an integer: {value}"),
    })
}

/// Turns source rows into destination-ready rows.
///
/// The resolver only reads the translation store; callers record the new id
/// once the destination insert has succeeded.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'m> {
    mappings: &'m ManualMappings,
}

impl<'m> Resolver<'m> {
    #[must_use]
    pub fn new(mappings: &'m ManualMappings) -> Self {
        Self { mappings }
    }

    #[must_use]
    pub fn mappings(&self) -> &'m ManualMappings {
        self.mappings
    }

    /// Rewrite `row` for the destination: drop the source id, re-key foreign
    /// keys, and translate manually mapped values. Null or absent columns pass
    /// through untouched.
    ///
    /// # Errors
    /// Returns [`MigrateError::UnresolvedReference`] when a referenced row has
    /// no destination id yet, [`MigrateError::UnmappedValue`] when a manual
    /// mapping has no entry, and [`MigrateError::InvalidRow`] for non-integer keys.
    pub fn resolve(
        &self,
        entity: EntityType,
        row: &Row,
        translations: &TranslationStore,
    ) -> Result<Row, MigrateError> {
        let mut resolved = row.clone();
        resolved.remove(ID_COLUMN);

        for rule in entity.field_rules() {
            let column = rule.column();
            let Some(value) = resolved.get_mut(column) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            *value = match *rule {
                FieldRule::Reference { target, .. } => {
                    let old_id = RowId(integer_field(entity, column, value)?);
                    Value::from(translations.resolve(target, old_id)?)
                }
                FieldRule::Mapped { kind, .. } => {
                    let old = integer_field(entity, column, value)?;
                    Value::Integer(self.mappings.map(kind, entity, column, old)?)
                }
                FieldRule::Detach { .. } => {
                    tracing::warn!(
                        %entity,
                        column,
                        old = %value,
                        "clearing reference that cannot be re-keyed"
                    );
                    Value::Null
                }
            };
        }

        Ok(resolved)
    }

    /// Manually mapped values in `row` that have no mapping entry.
    #[must_use]
    pub fn unmapped_values(&self, entity: EntityType, row: &Row) -> Vec<UnmappedValue> {
        entity
            .field_rules()
            .iter()
            .filter_map(|rule| match *rule {
                FieldRule::Mapped { column, kind } => match row.get(column) {
                    Some(Value::Integer(old)) if !self.mappings.contains(kind, *old) => {
                        Some(UnmappedValue {
                            kind,
                            entity,
                            field: column.to_string(),
                            value: *old,
                        })
                    }
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }
}
