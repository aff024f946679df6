//! Dependency ordering.
//!
//! Tables are emitted so that any table referenced by a foreign key comes
//! before the table referencing it: a depth-first post-order walk of the
//! foreign-key graph, memoized by lower-cased qualified name. Cycles do not
//! error; the visited guard breaks them and the cyclic members keep
//! traversal order, which stays applicable because foreign keys are added
//! by separate statements after both tables exist.

use std::collections::HashSet;

use tracing::debug;

use stele_core::schema::TableSchema;

/// Orders `tables` so referenced tables precede referencing tables.
///
/// The input order is otherwise preserved: independent tables keep their
/// relative positions.
#[must_use]
pub fn sort_by_dependencies(tables: Vec<TableSchema>) -> Vec<TableSchema> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut ordered: Vec<TableSchema> = Vec::with_capacity(tables.len());

    for table in &tables {
        visit(table, &tables, &mut visited, &mut ordered);
    }

    debug!(
        order = ?ordered.iter().map(TableSchema::qualified_name).collect::<Vec<_>>(),
        "dependency order"
    );
    ordered
}

fn visit(
    table: &TableSchema,
    all: &[TableSchema],
    visited: &mut HashSet<String>,
    ordered: &mut Vec<TableSchema>,
) {
    let key = table.qualified_name().to_ascii_lowercase();
    if !visited.insert(key) {
        return;
    }

    for fk in &table.foreign_keys {
        // Self-references need no reordering.
        if fk.references_table.eq_ignore_ascii_case(&table.name) {
            continue;
        }
        if let Some(referenced) = all
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(&fk.references_table))
        {
            visit(referenced, all, visited, ordered);
        }
    }

    ordered.push(table.clone());
}
