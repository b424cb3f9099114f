use std::fmt::Write;

use indexmap::IndexMap;

use crate::generator::manifest::GeneratedManifest;
use crate::generator::metadata::TableEntry;

/// Build a markdown report of the role × action grants per table.
pub fn build_report(manifest: &GeneratedManifest) -> String {
    let mut report = String::new();

    writeln!(report, "# schema2hasura Permission Report").unwrap();
    writeln!(report).unwrap();

    for source in &manifest.metadata.metadata.sources {
        let tracked = source.tables.len();
        let with_permissions = source
            .tables
            .iter()
            .filter(|t| !t.permissions.is_empty())
            .count();
        writeln!(
            report,
            "Source `{}`: {tracked} tables tracked, {with_permissions} with permissions, {} functions.",
            source.name,
            source.functions.len()
        )
        .unwrap();
        writeln!(report).unwrap();

        for table in source.tables.iter().filter(|t| !t.permissions.is_empty()) {
            write_table(&mut report, table);
        }
    }

    if !manifest.skipped.is_empty() {
        writeln!(report, "## Skipped entities").unwrap();
        writeln!(report).unwrap();
        for entity in &manifest.skipped {
            writeln!(report, "- {entity}: no table permissions declared").unwrap();
        }
    }

    report
}

#[derive(Default)]
struct RoleRow {
    select: Option<usize>,
    insert: Option<usize>,
    update: Option<usize>,
    delete: bool,
}

fn write_table(report: &mut String, table: &TableEntry) {
    let permissions = &table.permissions;
    let mut rows: IndexMap<&str, RoleRow> = IndexMap::new();

    for entry in &permissions.select_permissions {
        rows.entry(&entry.role).or_default().select = Some(entry.permission.columns.len());
    }
    for entry in &permissions.insert_permissions {
        rows.entry(&entry.role).or_default().insert = Some(entry.permission.columns.len());
    }
    for entry in &permissions.update_permissions {
        rows.entry(&entry.role).or_default().update = Some(entry.permission.columns.len());
    }
    for entry in &permissions.delete_permissions {
        rows.entry(&entry.role).or_default().delete = true;
    }

    writeln!(report, "## {}.{}", table.table.schema, table.table.name).unwrap();
    writeln!(report).unwrap();
    writeln!(report, "| Role | Select | Insert | Update | Delete |").unwrap();
    writeln!(report, "|------|--------|--------|--------|--------|").unwrap();
    for (role, row) in &rows {
        writeln!(
            report,
            "| {role} | {} | {} | {} | {} |",
            columns_cell(row.select),
            columns_cell(row.insert),
            columns_cell(row.update),
            if row.delete { "yes" } else { "-" }
        )
        .unwrap();
    }
    writeln!(report).unwrap();
}

fn columns_cell(columns: Option<usize>) -> String {
    match columns {
        Some(1) => "1 column".to_string(),
        Some(n) => format!("{n} columns"),
        None => "-".to_string(),
    }
}
