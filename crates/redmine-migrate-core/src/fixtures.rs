//! Source data shared by the migrator tests.

use crate::mapping::{ManualMappings, MappingKind};
use crate::memory::MemoryStore;
use crate::row::{row, Row, Value};

pub(crate) const PROJECT: i64 = 4;

pub(crate) fn mappings() -> ManualMappings {
    ManualMappings::default()
        .with(MappingKind::User, &[(1, 10), (5, 35)])
        .with(MappingKind::Priority, &[(15, 3), (16, 4)])
        .with(MappingKind::Enumeration, &[(1, 1), (9, 11)])
        .with(MappingKind::Tracker, &[(1, 2)])
        .with(MappingKind::IssueStatus, &[(1, 1)])
}

/// Root issue: no parent, `root_id` pointing at itself.
pub(crate) fn issue(
    id: i64,
    project: i64,
    subject: &str,
    priority: i64,
    fixed_version: Option<i64>,
) -> Row {
    row([
        ("id", Value::Integer(id)),
        ("project_id", Value::Integer(project)),
        ("subject", Value::from(subject)),
        ("tracker_id", Value::Integer(1)),
        ("status_id", Value::Integer(1)),
        ("priority_id", Value::Integer(priority)),
        ("author_id", Value::Integer(1)),
        ("assigned_to_id", Value::Null),
        ("fixed_version_id", Value::from(fixed_version)),
        ("category_id", Value::Null),
        ("parent_id", Value::Null),
        ("root_id", Value::Integer(id)),
    ])
}

pub(crate) fn wiki_page(id: i64, wiki: i64, title: &str, parent: Option<i64>) -> Row {
    row([
        ("id", Value::Integer(id)),
        ("wiki_id", Value::Integer(wiki)),
        ("title", Value::from(title)),
        ("parent_id", Value::from(parent)),
    ])
}

pub(crate) fn attachment(
    id: i64,
    container_type: &str,
    container: i64,
    filename: &str,
) -> Row {
    row([
        ("id", Value::Integer(id)),
        ("container_type", Value::from(container_type)),
        ("container_id", Value::Integer(container)),
        ("filename", Value::from(filename)),
        ("disk_filename", Value::from(format!("0001_{filename}"))),
        ("author_id", Value::Integer(1)),
    ])
}

/// Project #4: 2 categories, 1 version, 3 issues (one with 2 journals, one
/// journal with 1 detail), 5 time entries, 2 modules, 1 document, 1 wiki with
/// a root page and two children (each with content and one content version),
/// and 4 attachments. Project #5 exists alongside it and must not leak in.
pub(crate) fn source() -> MemoryStore {
    let mut source = MemoryStore::new();

    source
        .seed(
            "projects",
            row([
                ("id", Value::Integer(PROJECT)),
                ("name", Value::from("Intranet")),
                ("identifier", Value::from("intranet")),
                ("parent_id", Value::Null),
            ]),
        )
        .seed(
            "projects",
            row([("id", Value::Integer(5)), ("name", Value::from("Other"))]),
        );

    source
        .seed(
            "issue_categories",
            row([
                ("id", 1_i64),
                ("project_id", PROJECT),
                ("assigned_to_id", 5),
            ]),
        )
        .seed(
            "issue_categories",
            row([
                ("id", Value::Integer(2)),
                ("project_id", Value::Integer(PROJECT)),
                ("assigned_to_id", Value::Null),
            ]),
        );

    source
        .seed(
            "versions",
            row([
                ("id", Value::Integer(3)),
                ("project_id", Value::Integer(PROJECT)),
                ("name", Value::from("1.0")),
            ]),
        )
        .seed(
            "versions",
            row([
                ("id", Value::Integer(6)),
                ("project_id", Value::Integer(5)),
                ("name", Value::from("other")),
            ]),
        );

    let mut first = issue(10, PROJECT, "Login fails", 15, Some(3));
    first.insert("category_id".to_string(), Value::Integer(1));
    first.insert("assigned_to_id".to_string(), Value::Integer(5));
    source
        .seed("issues", first)
        .seed("issues", issue(11, PROJECT, "Unscheduled", 16, None))
        .seed("issues", issue(12, PROJECT, "Typo", 15, Some(3)))
        .seed("issues", issue(13, 5, "Elsewhere", 15, None));

    source
        .seed(
            "journals",
            row([("id", 20_i64), ("journalized_id", 10), ("user_id", 1)]),
        )
        .seed(
            "journals",
            row([("id", 21_i64), ("journalized_id", 10), ("user_id", 5)]),
        )
        .seed(
            "journal_details",
            row([
                ("id", Value::Integer(30)),
                ("journal_id", Value::Integer(20)),
                ("prop_key", Value::from("status_id")),
            ]),
        );

    let entries = [
        (40, Some(10_i64)),
        (41, Some(10)),
        (42, Some(11)),
        (43, Some(12)),
        (44, None),
    ];
    for (id, issue) in entries {
        source.seed(
            "time_entries",
            row([
                ("id", Value::Integer(id)),
                ("project_id", Value::Integer(PROJECT)),
                ("issue_id", Value::from(issue)),
                ("user_id", Value::Integer(1)),
                ("activity_id", Value::Integer(9)),
                ("hours", Value::Real(1.5)),
            ]),
        );
    }

    source
        .seed(
            "enabled_modules",
            row([
                ("id", Value::Integer(50)),
                ("project_id", Value::Integer(PROJECT)),
                ("name", Value::from("issue_tracking")),
            ]),
        )
        .seed(
            "enabled_modules",
            row([
                ("id", Value::Integer(51)),
                ("project_id", Value::Integer(PROJECT)),
                ("name", Value::from("wiki")),
            ]),
        );

    source.seed(
        "documents",
        row([
            ("id", 60_i64),
            ("project_id", PROJECT),
            ("category_id", 1),
        ]),
    );
    source.seed("wikis", row([("id", 70_i64), ("project_id", PROJECT)]));

    source
        .seed("wiki_pages", wiki_page(80, 70, "Wiki", None))
        .seed("wiki_pages", wiki_page(81, 70, "ChildA", Some(80)))
        .seed("wiki_pages", wiki_page(82, 70, "ChildB", Some(80)));
    for (offset, page) in [80_i64, 81, 82].into_iter().enumerate() {
        let offset = i64::try_from(offset).unwrap_or(0);
        source
            .seed(
                "wiki_contents",
                row([
                    ("id", 90 + offset),
                    ("page_id", page),
                    ("author_id", 1),
                    ("version", 1),
                ]),
            )
            .seed(
                "wiki_content_versions",
                row([
                    ("id", 100 + offset),
                    ("wiki_content_id", 90 + offset),
                    ("page_id", page),
                    ("author_id", 1),
                    ("version", 1),
                ]),
            );
    }

    source
        .seed("attachments", attachment(110, "Project", PROJECT, "plan.pdf"))
        .seed("attachments", attachment(111, "Issue", 10, "trace.log"))
        .seed("attachments", attachment(112, "WikiPage", 81, "child-a.png"))
        .seed("attachments", attachment(113, "WikiPage", 82, "child-b.png"))
        // Same numeric container id as the project, different container type.
        .seed("attachments", attachment(114, "Version", PROJECT, "unrelated.zip"))
        .seed("attachments", attachment(115, "Project", 5, "other.pdf"));

    source
}
