//! Relationship inference.
//!
//! Providers hand over tables with flat navigation hints; this pass turns
//! those hints into foreign keys and relationship records, synthesizing
//! missing foreign-key columns and many-to-many join tables along the way.
//!
//! The pass runs single-threaded over the full table set: inferring a
//! collection navigation on one table appends a column and a foreign key to
//! a *different* table's record, so per-table parallelism is not sound
//! here.
//!
//! Pass order matters:
//!
//! 1. reference hints become foreign keys,
//! 2. collection hints become one-to-many or many-to-many associations,
//! 3. one-to-one upgrades are evaluated last so an existing one-to-many or
//!    many-to-many association for the same pair takes precedence,
//! 4. remaining reference hints settle as plain many-to-one records.

use tracing::{debug, warn};

use stele_core::relation::{ForeignKeyAction, NavigationHint, Relationship, RelationshipKind};
use stele_core::schema::{
    ColumnSchema, ForeignKeySchema, PrimaryKeySchema, TableSchema, UniqueConstraint,
};
use stele_core::types::SqlType;

/// Runs relationship inference over the desired table set.
///
/// Synthesized join tables are appended to `tables`; every other mutation
/// enriches an existing table in place. After this pass the set is
/// ready for [`validate`](stele_core::validate::validate) and diffing.
pub fn infer_relationships(tables: &mut Vec<TableSchema>) {
    infer_foreign_keys_from_hints(tables);
    infer_collections(tables);
    infer_one_to_one(tables);
    settle_many_to_one(tables);
}

/// Pass 1: a non-collection hint `N` targeting `F`, paired with a local
/// `<N>Id` column and no covering foreign key, becomes a foreign key.
fn infer_foreign_keys_from_hints(tables: &mut [TableSchema]) {
    for i in 0..tables.len() {
        let hints: Vec<_> = tables[i]
            .navigations
            .iter()
            .filter(|h| !h.collection)
            .cloned()
            .collect();

        for hint in hints {
            let column = hint.fk_column_name();
            if !tables[i].has_column(&column) || tables[i].fk_on_column(&column).is_some() {
                continue;
            }

            let Some(target_pk) = pk_column_name(tables, &hint.target) else {
                warn!(
                    table = %tables[i].name,
                    target = %hint.target,
                    "reference hint targets a table without a resolvable key; skipped"
                );
                continue;
            };

            let source = tables[i].name.clone();
            let fk = ForeignKeySchema::single(
                fk_name(&source, &hint.target, &column),
                column,
                hint.target.clone(),
                target_pk,
            )
            .on_delete(hint.on_delete);

            debug!(table = %source, fk = %fk.name, "inferred foreign key from reference hint");
            tables[i].foreign_keys.push(fk);
        }
    }
}

/// Pass 2: collection hints. A one-sided collection becomes one-to-many; a
/// mutual pair of collections becomes many-to-many through a join table.
fn infer_collections(tables: &mut Vec<TableSchema>) {
    for i in 0..tables.len() {
        let hints: Vec<_> = tables[i]
            .navigations
            .iter()
            .filter(|h| h.collection)
            .cloned()
            .collect();
        let source = tables[i].name.clone();

        for hint in hints {
            if has_relationship(tables, &source, &hint.target) {
                continue;
            }

            let mutual = !source.eq_ignore_ascii_case(&hint.target)
                && table_by_name(tables, &hint.target).is_some_and(|f| {
                    f.navigations
                        .iter()
                        .any(|h| h.collection && h.target.eq_ignore_ascii_case(&source))
                });

            if mutual {
                infer_many_to_many(tables, &source, &hint.target);
            } else {
                infer_one_to_many(tables, &source, &hint);
            }
        }
    }
}

/// Ensures the "many" side carries a foreign key back to the "one" side,
/// synthesizing the column when missing, then records the association on
/// both ends.
fn infer_one_to_many(tables: &mut [TableSchema], source: &str, hint: &NavigationHint) {
    let Some(target_idx) = table_index(tables, &hint.target) else {
        warn!(table = source, target = %hint.target, "collection hint targets unknown table; skipped");
        return;
    };
    let Some(source_pk) = pk_column_name(tables, source) else {
        warn!(table = source, "collection hint on a table without a key; skipped");
        return;
    };
    let key_type = pk_column_type(tables, source).unwrap_or(SqlType::Int);

    let already_linked = tables[target_idx]
        .foreign_keys
        .iter()
        .any(|fk| fk.references_table.eq_ignore_ascii_case(source));

    if !already_linked {
        let fk_column = format!("{source}Id");
        if !tables[target_idx].has_column(&fk_column) {
            let nullable = hint.on_delete == ForeignKeyAction::SetNull;
            let mut column = ColumnSchema::new(fk_column.clone(), key_type);
            column.nullable = nullable;
            debug!(
                table = %tables[target_idx].name,
                column = %fk_column,
                "synthesized foreign key column for collection navigation"
            );
            tables[target_idx].columns.push(column);
        }

        let fk = ForeignKeySchema::single(
            fk_name(&tables[target_idx].name.clone(), source, &fk_column),
            fk_column,
            source.to_string(),
            source_pk,
        )
        .on_delete(hint.on_delete);
        tables[target_idx].foreign_keys.push(fk);
    }

    // Navigation name on the inverse side, when the target declares one.
    let inverse_nav = tables[target_idx]
        .navigations
        .iter()
        .find(|h| !h.collection && h.target.eq_ignore_ascii_case(source))
        .map(|h| h.name.clone());

    let forward = Relationship::new(source, &hint.target, RelationshipKind::OneToMany)
        .navigations(Some(hint.name.clone()), inverse_nav.clone())
        .on_delete(hint.on_delete);
    let inverse = Relationship::new(&hint.target, source, RelationshipKind::ManyToOne)
        .navigations(inverse_nav, Some(hint.name.clone()))
        .on_delete(hint.on_delete);

    tables[target_idx].relationships.push(inverse);
    if let Some(source_idx) = table_index(tables, source) {
        tables[source_idx].relationships.push(forward);
    }
}

/// Finds or synthesizes the join table for a mutual pair of collection
/// navigations and records the many-to-many association on both ends.
fn infer_many_to_many(tables: &mut Vec<TableSchema>, first: &str, second: &str) {
    let first_col = format!("{first}Id");
    let second_col = format!("{second}Id");

    let existing_join = tables
        .iter()
        .find(|t| {
            !t.name.eq_ignore_ascii_case(first)
                && !t.name.eq_ignore_ascii_case(second)
                && t.has_column(&first_col)
                && t.has_column(&second_col)
        })
        .map(|t| t.name.clone());

    let (join_name, synthesized) = match existing_join {
        Some(name) => (name, false),
        None => {
            let Some(join) = synthesize_join_table(tables, first, second) else {
                return;
            };
            let name = join.name.clone();
            debug!(join = %name, "synthesized join table for many-to-many pair");
            tables.push(join);
            (name, true)
        }
    };

    let first_nav = collection_nav_name(tables, first, second);
    let second_nav = collection_nav_name(tables, second, first);

    let forward = Relationship::new(first, second, RelationshipKind::ManyToMany)
        .navigations(first_nav.clone(), second_nav.clone())
        .join_table(&join_name, synthesized);
    let inverse = Relationship::new(second, first, RelationshipKind::ManyToMany)
        .navigations(second_nav, first_nav)
        .join_table(&join_name, synthesized);

    if let Some(idx) = table_index(tables, first) {
        tables[idx].relationships.push(forward);
    }
    if let Some(idx) = table_index(tables, second) {
        tables[idx].relationships.push(inverse);
    }
}

fn synthesize_join_table(
    tables: &[TableSchema],
    first: &str,
    second: &str,
) -> Option<TableSchema> {
    let first_pk = pk_column_name(tables, first)?;
    let second_pk = pk_column_name(tables, second)?;
    let first_type = pk_column_type(tables, first).unwrap_or(SqlType::Int);
    let second_type = pk_column_type(tables, second).unwrap_or(SqlType::Int);

    let name = format!("{first}{second}");
    let first_col = format!("{first}Id");
    let second_col = format!("{second}Id");

    Some(
        TableSchema::new(name.clone())
            .column(ColumnSchema::new(first_col.clone(), first_type).not_null())
            .column(ColumnSchema::new(second_col.clone(), second_type).not_null())
            .primary_key(PrimaryKeySchema::auto(
                &name,
                vec![first_col.clone(), second_col.clone()],
            ))
            .foreign_key(
                ForeignKeySchema::single(
                    fk_name(&name, first, &first_col),
                    first_col,
                    first,
                    first_pk,
                )
                .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKeySchema::single(
                    fk_name(&name, second, &second_col),
                    second_col,
                    second,
                    second_pk,
                )
                .on_delete(ForeignKeyAction::Cascade),
            ),
    )
}

/// Pass 3: a foreign key whose column is unique or part of the primary key,
/// or a mutual pair of single references, upgrades to one-to-one unless a
/// non-one-to-one association already links the pair.
fn infer_one_to_one(tables: &mut [TableSchema]) {
    for i in 0..tables.len() {
        let source = tables[i].name.clone();
        let fks: Vec<_> = tables[i]
            .foreign_keys
            .iter()
            .filter(|fk| fk.columns.len() == 1)
            .cloned()
            .collect();

        for fk in fks {
            let target = fk.references_table.clone();
            if source.eq_ignore_ascii_case(&target) {
                continue;
            }
            if has_relationship(tables, &source, &target) {
                // A one-to-many or many-to-many signal for the pair takes
                // precedence over the one-to-one upgrade.
                continue;
            }

            let column = fk.columns[0].clone();
            let column_unique = tables[i].column_is_unique_or_key(&column);
            let mutual_single = has_single_reference(&tables[i], &target)
                && table_by_name(tables, &target)
                    .is_some_and(|t| has_single_reference(t, &source));

            if !column_unique && !mutual_single {
                continue;
            }

            if !column_unique {
                // The cardinality is only implied by navigation shape, so
                // make the database enforce it.
                let constraint = UniqueConstraint {
                    name: format!("UQ_{source}_{column}"),
                    columns: vec![column.clone()],
                };
                debug!(
                    table = %source,
                    constraint = %constraint.name,
                    "synthesized unique constraint for one-to-one relationship"
                );
                tables[i].unique_constraints.push(constraint);
            }

            let source_nav = reference_nav_name(&tables[i], &target);
            let target_nav =
                table_by_name(tables, &target).and_then(|t| reference_nav_name(t, &source));

            let forward = Relationship::new(&source, &target, RelationshipKind::OneToOne)
                .navigations(source_nav.clone(), target_nav.clone())
                .on_delete(fk.on_delete);
            let inverse = Relationship::new(&target, &source, RelationshipKind::OneToOne)
                .navigations(target_nav, source_nav)
                .on_delete(fk.on_delete);

            tables[i].relationships.push(forward);
            if let Some(target_idx) = table_index(tables, &target) {
                tables[target_idx].relationships.push(inverse);
            }
        }
    }
}

/// Pass 4: reference hints whose pair gained no association in the earlier
/// passes settle as plain many-to-one records.
fn settle_many_to_one(tables: &mut [TableSchema]) {
    for i in 0..tables.len() {
        let source = tables[i].name.clone();
        let hints: Vec<_> = tables[i]
            .navigations
            .iter()
            .filter(|h| !h.collection)
            .cloned()
            .collect();

        for hint in hints {
            if has_relationship(tables, &source, &hint.target) {
                continue;
            }
            if tables[i].fk_on_column(&hint.fk_column_name()).is_none() {
                continue;
            }

            let forward = Relationship::new(&source, &hint.target, RelationshipKind::ManyToOne)
                .navigations(Some(hint.name.clone()), None::<String>)
                .on_delete(hint.on_delete);
            let inverse = Relationship::new(&hint.target, &source, RelationshipKind::OneToMany)
                .navigations(None::<String>, Some(hint.name.clone()))
                .on_delete(hint.on_delete);

            tables[i].relationships.push(forward);
            if let Some(target_idx) = table_index(tables, &hint.target) {
                tables[target_idx].relationships.push(inverse);
            }
        }
    }
}

// Lookup helpers

fn table_index(tables: &[TableSchema], name: &str) -> Option<usize> {
    tables.iter().position(|t| t.name.eq_ignore_ascii_case(name))
}

fn table_by_name<'a>(tables: &'a [TableSchema], name: &str) -> Option<&'a TableSchema> {
    tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
}

fn pk_column_name(tables: &[TableSchema], table: &str) -> Option<String> {
    let table = table_by_name(tables, table)?;
    let pk = table.primary_key.as_ref()?;
    pk.columns.first().cloned()
}

fn pk_column_type(tables: &[TableSchema], table: &str) -> Option<SqlType> {
    let table = table_by_name(tables, table)?;
    let pk = table.primary_key.as_ref()?;
    let column = table.get_column(pk.columns.first()?)?;
    Some(column.sql_type.clone())
}

fn fk_name(source: &str, target: &str, column: &str) -> String {
    format!("FK_{source}_{target}_{column}")
}

fn has_relationship(tables: &[TableSchema], a: &str, b: &str) -> bool {
    tables
        .iter()
        .flat_map(|t| t.relationships.iter())
        .any(|r| r.links_pair(a, b))
}

fn has_single_reference(table: &TableSchema, target: &str) -> bool {
    table
        .navigations
        .iter()
        .any(|h| !h.collection && h.target.eq_ignore_ascii_case(target))
}

fn reference_nav_name(table: &TableSchema, target: &str) -> Option<String> {
    table
        .navigations
        .iter()
        .find(|h| !h.collection && h.target.eq_ignore_ascii_case(target))
        .map(|h| h.name.clone())
}

fn collection_nav_name(tables: &[TableSchema], owner: &str, target: &str) -> Option<String> {
    table_by_name(tables, owner)?
        .navigations
        .iter()
        .find(|h| h.collection && h.target.eq_ignore_ascii_case(target))
        .map(|h| h.name.clone())
}
