//! Fixed dependency graph of the migrated entity types.
//!
//! Each [`EntityType`] knows its table, the column that scopes it to its
//! parent, the entity types it owns, and the [`FieldRule`]s that turn a
//! source row into a destination row.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::mapping::MappingKind;
use crate::row::{Filter, RowId, ID_COLUMN};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Project,
    Category,
    Version,
    Issue,
    Journal,
    JournalDetail,
    TimeEntry,
    Module,
    Document,
    Wiki,
    WikiPage,
    WikiContent,
    WikiContentVersion,
    Attachment,
}

/// How one column of a source row is rewritten for the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Foreign key into another migrated entity, re-keyed through the translation store.
    Reference {
        column: &'static str,
        target: EntityType,
    },
    /// Value from a domain that differs between systems, re-keyed through a manual mapping.
    Mapped {
        column: &'static str,
        kind: MappingKind,
    },
    /// Reference with no destination row to point at when the row is inserted; cleared.
    Detach { column: &'static str },
}

impl FieldRule {
    #[must_use]
    pub fn column(self) -> &'static str {
        match self {
            Self::Reference { column, .. }
            | Self::Mapped { column, .. }
            | Self::Detach { column } => column,
        }
    }
}

const fn reference(column: &'static str, target: EntityType) -> FieldRule {
    FieldRule::Reference { column, target }
}

const fn mapped(column: &'static str, kind: MappingKind) -> FieldRule {
    FieldRule::Mapped { column, kind }
}

const fn detach(column: &'static str) -> FieldRule {
    FieldRule::Detach { column }
}

const PROJECT_RULES: &[FieldRule] = &[detach("parent_id")];
const CATEGORY_RULES: &[FieldRule] = &[
    reference("project_id", EntityType::Project),
    mapped("assigned_to_id", MappingKind::User),
];
const VERSION_RULES: &[FieldRule] = &[reference("project_id", EntityType::Project)];
const ISSUE_RULES: &[FieldRule] = &[
    reference("project_id", EntityType::Project),
    mapped("tracker_id", MappingKind::Tracker),
    mapped("status_id", MappingKind::IssueStatus),
    mapped("assigned_to_id", MappingKind::User),
    mapped("author_id", MappingKind::User),
    mapped("priority_id", MappingKind::Priority),
    reference("fixed_version_id", EntityType::Version),
    reference("category_id", EntityType::Category),
    reference("parent_id", EntityType::Issue),
    // Points at the issue itself for tree roots, so it has no destination id at insert time.
    detach("root_id"),
];
const JOURNAL_RULES: &[FieldRule] = &[
    reference("journalized_id", EntityType::Issue),
    mapped("user_id", MappingKind::User),
];
const JOURNAL_DETAIL_RULES: &[FieldRule] = &[reference("journal_id", EntityType::Journal)];
const TIME_ENTRY_RULES: &[FieldRule] = &[
    reference("project_id", EntityType::Project),
    reference("issue_id", EntityType::Issue),
    mapped("user_id", MappingKind::User),
    mapped("activity_id", MappingKind::Enumeration),
];
const MODULE_RULES: &[FieldRule] = &[reference("project_id", EntityType::Project)];
const DOCUMENT_RULES: &[FieldRule] = &[
    reference("project_id", EntityType::Project),
    mapped("category_id", MappingKind::Enumeration),
];
const WIKI_RULES: &[FieldRule] = &[reference("project_id", EntityType::Project)];
const WIKI_PAGE_RULES: &[FieldRule] = &[
    reference("wiki_id", EntityType::Wiki),
    reference("parent_id", EntityType::WikiPage),
];
const WIKI_CONTENT_RULES: &[FieldRule] = &[
    reference("page_id", EntityType::WikiPage),
    mapped("author_id", MappingKind::User),
];
const WIKI_CONTENT_VERSION_RULES: &[FieldRule] = &[
    reference("wiki_content_id", EntityType::WikiContent),
    reference("page_id", EntityType::WikiPage),
    mapped("author_id", MappingKind::User),
];
// container_id is overwritten by the attachment collector, which already
// holds the container's destination id.
const ATTACHMENT_RULES: &[FieldRule] = &[mapped("author_id", MappingKind::User)];

impl EntityType {
    pub const ALL: [Self; 14] = [
        Self::Project,
        Self::Category,
        Self::Version,
        Self::Issue,
        Self::Journal,
        Self::JournalDetail,
        Self::TimeEntry,
        Self::Module,
        Self::Document,
        Self::Wiki,
        Self::WikiPage,
        Self::WikiContent,
        Self::WikiContentVersion,
        Self::Attachment,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Category => "category",
            Self::Version => "version",
            Self::Issue => "issue",
            Self::Journal => "journal",
            Self::JournalDetail => "journal_detail",
            Self::TimeEntry => "time_entry",
            Self::Module => "module",
            Self::Document => "document",
            Self::Wiki => "wiki",
            Self::WikiPage => "wiki_page",
            Self::WikiContent => "wiki_content",
            Self::WikiContentVersion => "wiki_content_version",
            Self::Attachment => "attachment",
        }
    }

    /// Plural label used in run summaries.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Category => "categories",
            Self::Version => "versions",
            Self::Issue => "issues",
            Self::Journal => "journals",
            Self::JournalDetail => "journal details",
            Self::TimeEntry => "time entries",
            Self::Module => "modules enabled",
            Self::Document => "documents",
            Self::Wiki => "wikis",
            Self::WikiPage => "wiki pages",
            Self::WikiContent => "wiki contents",
            Self::WikiContentVersion => "wiki content versions",
            Self::Attachment => "attachments",
        }
    }

    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Category => "issue_categories",
            Self::Version => "versions",
            Self::Issue => "issues",
            Self::Journal => "journals",
            Self::JournalDetail => "journal_details",
            Self::TimeEntry => "time_entries",
            Self::Module => "enabled_modules",
            Self::Document => "documents",
            Self::Wiki => "wikis",
            Self::WikiPage => "wiki_pages",
            Self::WikiContent => "wiki_contents",
            Self::WikiContentVersion => "wiki_content_versions",
            Self::Attachment => "attachments",
        }
    }

    /// Declared parent in the dependency graph. Attachments hang off any
    /// [`ContainerType`] and therefore have no single parent.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Project | Self::Attachment => None,
            Self::Category
            | Self::Version
            | Self::Issue
            | Self::TimeEntry
            | Self::Module
            | Self::Document
            | Self::Wiki => Some(Self::Project),
            Self::Journal => Some(Self::Issue),
            Self::JournalDetail => Some(Self::Journal),
            Self::WikiPage => Some(Self::Wiki),
            Self::WikiContent => Some(Self::WikiPage),
            Self::WikiContentVersion => Some(Self::WikiContent),
        }
    }

    /// Column holding the parent's source id. The project root is selected by its own id.
    #[must_use]
    pub fn scope_column(self) -> &'static str {
        match self {
            Self::Project => ID_COLUMN,
            Self::Category
            | Self::Version
            | Self::Issue
            | Self::TimeEntry
            | Self::Module
            | Self::Document
            | Self::Wiki => "project_id",
            Self::Journal => "journalized_id",
            Self::JournalDetail => "journal_id",
            Self::WikiPage => "wiki_id",
            Self::WikiContent => "page_id",
            Self::WikiContentVersion => "wiki_content_id",
            Self::Attachment => "container_id",
        }
    }

    #[must_use]
    pub fn scope_filter(self, parent: RowId) -> Filter {
        Filter::new().eq(self.scope_column(), parent)
    }

    /// Owned entity types, in the order they are migrated after a row of this type.
    #[must_use]
    pub fn children(self) -> &'static [Self] {
        match self {
            Self::Project => &[
                Self::Category,
                Self::Version,
                Self::Issue,
                Self::TimeEntry,
                Self::Module,
                Self::Document,
                Self::Wiki,
            ],
            Self::Issue => &[Self::Journal],
            Self::Journal => &[Self::JournalDetail],
            Self::Wiki => &[Self::WikiPage],
            Self::WikiPage => &[Self::WikiContent],
            Self::WikiContent => &[Self::WikiContentVersion],
            Self::Category
            | Self::Version
            | Self::JournalDetail
            | Self::TimeEntry
            | Self::Module
            | Self::Document
            | Self::WikiContentVersion
            | Self::Attachment => &[],
        }
    }

    /// Column linking a row to a parent row of the same type. Entity types
    /// that have one are migrated parents-first, starting from rows where it
    /// is null.
    #[must_use]
    pub fn tree_column(self) -> Option<&'static str> {
        match self {
            Self::Issue | Self::WikiPage => Some("parent_id"),
            _ => None,
        }
    }

    #[must_use]
    pub fn container(self) -> Option<ContainerType> {
        match self {
            Self::Project => Some(ContainerType::Project),
            Self::Version => Some(ContainerType::Version),
            Self::Issue => Some(ContainerType::Issue),
            Self::Document => Some(ContainerType::Document),
            Self::WikiPage => Some(ContainerType::WikiPage),
            _ => None,
        }
    }

    #[must_use]
    pub fn field_rules(self) -> &'static [FieldRule] {
        match self {
            Self::Project => PROJECT_RULES,
            Self::Category => CATEGORY_RULES,
            Self::Version => VERSION_RULES,
            Self::Issue => ISSUE_RULES,
            Self::Journal => JOURNAL_RULES,
            Self::JournalDetail => JOURNAL_DETAIL_RULES,
            Self::TimeEntry => TIME_ENTRY_RULES,
            Self::Module => MODULE_RULES,
            Self::Document => DOCUMENT_RULES,
            Self::Wiki => WIKI_RULES,
            Self::WikiPage => WIKI_PAGE_RULES,
            Self::WikiContent => WIKI_CONTENT_RULES,
            Self::WikiContentVersion => WIKI_CONTENT_VERSION_RULES,
            Self::Attachment => ATTACHMENT_RULES,
        }
    }

    /// Pre-order walk of the graph from the project root, attachments last.
    #[must_use]
    pub fn dependency_order() -> Vec<Self> {
        fn visit(entity: EntityType, order: &mut Vec<EntityType>) {
            order.push(entity);
            for child in entity.children() {
                visit(*child, order);
            }
        }

        let mut order = Vec::with_capacity(Self::ALL.len());
        visit(Self::Project, &mut order);
        order.push(Self::Attachment);
        order
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity kinds that own attachments, tagged in `attachments.container_type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ContainerType {
    Project,
    Version,
    Issue,
    Document,
    WikiPage,
}

impl ContainerType {
    pub const ALL: [Self; 5] = [
        Self::Project,
        Self::Version,
        Self::Issue,
        Self::Document,
        Self::WikiPage,
    ];

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Project => "Project",
            Self::Version => "Version",
            Self::Issue => "Issue",
            Self::Document => "Document",
            Self::WikiPage => "WikiPage",
        }
    }

    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|container| container.tag() == tag)
    }

    #[must_use]
    pub fn entity(self) -> EntityType {
        match self {
            Self::Project => EntityType::Project,
            Self::Version => EntityType::Version,
            Self::Issue => EntityType::Issue,
            Self::Document => EntityType::Document,
            Self::WikiPage => EntityType::WikiPage,
        }
    }

    #[must_use]
    pub fn attachment_filter(self, container: RowId) -> Filter {
        Filter::new()
            .eq("container_type", self.tag())
            .eq("container_id", container)
    }
}

impl Display for ContainerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
