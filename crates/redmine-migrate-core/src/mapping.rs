use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::entity::EntityType;

/// Value domains whose identifiers differ between the source and destination systems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    User,
    Priority,
    Enumeration,
    Tracker,
    IssueStatus,
}

impl MappingKind {
    pub const ALL: [Self; 5] = [
        Self::User,
        Self::Priority,
        Self::Enumeration,
        Self::Tracker,
        Self::IssueStatus,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Priority => "priority",
            Self::Enumeration => "enumeration",
            Self::Tracker => "tracker",
            Self::IssueStatus => "issue_status",
        }
    }
}

impl Display for MappingKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source value with no entry in its manual mapping table.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(thiserror::Error)]
#[error("no {kind} mapping defined for old value {value} ({entity}.{field})")]
pub struct UnmappedValue {
    pub kind: MappingKind,
    pub entity: EntityType,
    pub field: String,
    pub value: i64,
}

/// Manually maintained translation tables for values that already exist on
/// both sides (users, priorities, enumerations, trackers, issue statuses).
///
/// These are supplied once per run and never modified by the migration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManualMappings {
    #[serde(default)]
    pub users: BTreeMap<i64, i64>,
    #[serde(default)]
    pub priorities: BTreeMap<i64, i64>,
    #[serde(default)]
    pub enumerations: BTreeMap<i64, i64>,
    #[serde(default)]
    pub trackers: BTreeMap<i64, i64>,
    #[serde(default)]
    pub issue_statuses: BTreeMap<i64, i64>,
}

impl ManualMappings {
    #[must_use]
    pub fn table(&self, kind: MappingKind) -> &BTreeMap<i64, i64> {
        match kind {
            MappingKind::User => &self.users,
            MappingKind::Priority => &self.priorities,
            MappingKind::Enumeration => &self.enumerations,
            MappingKind::Tracker => &self.trackers,
            MappingKind::IssueStatus => &self.issue_statuses,
        }
    }

    pub fn table_mut(&mut self, kind: MappingKind) -> &mut BTreeMap<i64, i64> {
        match kind {
            MappingKind::User => &mut self.users,
            MappingKind::Priority => &mut self.priorities,
            MappingKind::Enumeration => &mut self.enumerations,
            MappingKind::Tracker => &mut self.trackers,
            MappingKind::IssueStatus => &mut self.issue_statuses,
        }
    }

    /// Builder used by fixtures and embedders that assemble mappings in code.
    #[must_use]
    pub fn with(mut self, kind: MappingKind, pairs: &[(i64, i64)]) -> Self {
        self.table_mut(kind).extend(pairs.iter().copied());
        self
    }

    #[must_use]
    pub fn contains(&self, kind: MappingKind, value: i64) -> bool {
        self.table(kind).contains_key(&value)
    }

    /// Translate `value` for `entity.field`.
    ///
    /// # Errors
    /// Returns [`UnmappedValue`] when the table has no entry for `value`.
    pub fn map(
        &self,
        kind: MappingKind,
        entity: EntityType,
        field: &str,
        value: i64,
    ) -> Result<i64, UnmappedValue> {
        match self.table(kind).get(&value) {
            Some(mapped) => Ok(*mapped),
            None => Err(UnmappedValue {
                kind,
                entity,
                field: field.to_string(),
                value,
            }),
        }
    }
}
