//! Schema diffing.
//!
//! Compares an old (live) and a new (desired) snapshot of one table and
//! produces the operations transforming the former into the latter. The
//! old side may be the absent sentinel, which switches to the CREATE path.
//!
//! Destructive in-place changes are gated on the safety oracle: a rejected
//! change degrades to a recorded warning and a skipped operation, never an
//! error, so one risky column cannot block the rest of the plan.

use std::collections::HashMap;

use tracing::{debug, warn};

use stele_core::oracle::SafetyOracle;
use stele_core::schema::{ColumnSchema, IndexSchema, TableSchema};
use stele_core::types::TypeFamily;
use stele_core::warning::WarningSet;

use crate::dialect::mssql::{
    MAX_INDEX_KEY_BYTES, SAFE_ANSI_KEY_CHARS, SAFE_UNICODE_KEY_CHARS,
    UNBOUNDED_KEY_FALLBACK_BYTES,
};
use crate::operations::{DescriptionTarget, MigrationOperation};

/// Diffs table pairs into migration operations.
pub struct SchemaDiffer<'a> {
    oracle: &'a dyn SafetyOracle,
    max_index_key_bytes: u32,
}

impl<'a> SchemaDiffer<'a> {
    /// Creates a differ that consults `oracle` before destructive changes.
    #[must_use]
    pub fn new(oracle: &'a dyn SafetyOracle) -> Self {
        Self {
            oracle,
            max_index_key_bytes: MAX_INDEX_KEY_BYTES,
        }
    }

    /// Produces the operations transforming `old` into `new`.
    ///
    /// Per-table emission order is columns, primary key, unique
    /// constraints, foreign keys, check constraints, indexes,
    /// descriptions. The foreign-key comparison runs after the column
    /// comparison so newly added columns exist before being referenced.
    #[must_use]
    pub fn diff_table(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        warnings: &mut WarningSet,
    ) -> Vec<MigrationOperation> {
        if old.is_absent() {
            debug!(table = %new.qualified_name(), "table is absent live; taking CREATE path");
            return self.create_table_ops(new, warnings);
        }

        let mut ops = Vec::new();
        self.diff_columns(old, new, &mut ops, warnings);
        self.diff_primary_key(old, new, &mut ops, warnings);
        self.diff_unique_constraints(old, new, &mut ops);
        self.diff_foreign_keys(old, new, &mut ops);
        self.diff_check_constraints(old, new, &mut ops);
        self.diff_indexes(old, new, &mut ops, warnings);
        self.diff_descriptions(old, new, &mut ops);
        ops
    }

    /// The CREATE path: the table with its columns and inline primary key,
    /// followed by constraints, size-guarded indexes, and descriptions.
    fn create_table_ops(
        &self,
        new: &TableSchema,
        warnings: &mut WarningSet,
    ) -> Vec<MigrationOperation> {
        let mut bare = new.clone();
        bare.unique_constraints.clear();
        bare.foreign_keys.clear();
        bare.check_constraints.clear();
        bare.indexes.clear();
        bare.navigations.clear();
        bare.relationships.clear();

        let mut ops = vec![MigrationOperation::create_table(bare)];

        for uc in &new.unique_constraints {
            ops.push(MigrationOperation::add_unique_constraint(
                &new.schema,
                &new.name,
                uc.clone(),
            ));
        }
        for fk in &new.foreign_keys {
            ops.push(MigrationOperation::add_foreign_key(
                &new.schema,
                &new.name,
                fk.clone(),
            ));
        }
        for check in &new.check_constraints {
            ops.push(MigrationOperation::add_check_constraint(
                &new.schema,
                &new.name,
                check.clone(),
            ));
        }
        for index in &new.indexes {
            self.push_guarded_index(new, index, &mut ops, warnings);
        }

        self.diff_descriptions(&TableSchema::absent(&*new.schema, &*new.name), new, &mut ops);
        ops
    }

    // Columns

    fn diff_columns(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        ops: &mut Vec<MigrationOperation>,
        warnings: &mut WarningSet,
    ) {
        for nc in &new.columns {
            match old.get_column(&nc.name) {
                None => ops.push(MigrationOperation::add_column(
                    &new.schema,
                    &new.name,
                    nc.clone(),
                )),
                Some(oc) => {
                    if !columns_equivalent(oc, nc) {
                        ops.extend(self.alter_column_ops(new, oc, nc, warnings));
                    }
                }
            }
        }

        for oc in &old.columns {
            if !new.has_column(&oc.name) {
                ops.push(MigrationOperation::drop_column(
                    &new.schema,
                    &new.name,
                    &oc.name,
                ));
            }
        }
    }

    /// Chooses between in-place alteration and drop-and-recreate for one
    /// changed column, consulting the oracle for the destructive cases.
    fn alter_column_ops(
        &self,
        new_table: &TableSchema,
        old: &ColumnSchema,
        new: &ColumnSchema,
        warnings: &mut WarningSet,
    ) -> Vec<MigrationOperation> {
        let family_changed = old.sql_type.family() != new.sql_type.family();
        let computed_changed = old.computed != new.computed;

        if family_changed || computed_changed {
            // In-place alteration only handles same-family scalar changes;
            // everything else is a rebuild.
            return vec![
                MigrationOperation::drop_column(&new_table.schema, &new_table.name, &old.name),
                MigrationOperation::add_column(&new_table.schema, &new_table.name, new.clone()),
            ];
        }

        let mut target = new.clone();

        // Indexed key columns cannot be unbounded; narrow to the widest
        // width that still fits the key limit.
        if target.sql_type.is_text()
            && target.sql_type.is_unbounded()
            && new_table.column_is_indexed(&target.name)
        {
            let safe = if target.sql_type.family() == TypeFamily::UnicodeText {
                SAFE_UNICODE_KEY_CHARS
            } else {
                SAFE_ANSI_KEY_CHARS
            };
            target.sql_type = target.sql_type.narrowed_to(safe);
            if columns_equivalent(old, &target) {
                return Vec::new();
            }
        }

        let qualified = new_table.qualified_name();

        if old.identity != target.identity {
            let allowed = self.oracle.is_table_empty(&new_table.schema, &new_table.name);
            if !matches!(allowed, Ok(true)) {
                let key = format!("identity:{qualified}.{}", target.name);
                warnings.record(
                    key,
                    format!(
                        "cannot change IDENTITY on column '{}' of '{qualified}': table is not empty; change skipped",
                        target.name
                    ),
                );
                warn!(table = %qualified, column = %target.name, "identity change rejected");
                return Vec::new();
            }
        }

        if old.nullable && !target.nullable {
            let clean = self
                .oracle
                .column_has_nulls(&new_table.schema, &new_table.name, &target.name);
            if !matches!(clean, Ok(false)) {
                let key = format!("not-null:{qualified}.{}", target.name);
                warnings.record(
                    key,
                    format!(
                        "cannot make column '{}' of '{qualified}' NOT NULL: existing rows contain NULLs; change skipped",
                        target.name
                    ),
                );
                warn!(table = %qualified, column = %target.name, "NOT NULL tightening rejected");
                return Vec::new();
            }
        }

        vec![MigrationOperation::alter_column(
            &new_table.schema,
            &new_table.name,
            target,
            Some(old.clone()),
        )]
    }

    // Primary key

    fn diff_primary_key(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        ops: &mut Vec<MigrationOperation>,
        warnings: &mut WarningSet,
    ) {
        match (&old.primary_key, &new.primary_key) {
            (None, None) => {}
            (None, Some(npk)) => ops.push(MigrationOperation::add_primary_key(
                &new.schema,
                &new.name,
                npk.clone(),
            )),
            (Some(opk), None) => ops.push(MigrationOperation::drop_primary_key(
                &new.schema,
                &new.name,
                &opk.name,
            )),
            (Some(opk), Some(npk)) => {
                if same_column_set(&opk.columns, &npk.columns) {
                    // Only cosmetic metadata (the constraint name) differs;
                    // rebuilding the key buys nothing.
                    return;
                }

                let qualified = new.qualified_name();
                let empty = self.oracle.is_table_empty(&new.schema, &new.name);
                if !matches!(empty, Ok(true)) {
                    warnings.record(
                        format!("primary-key:{qualified}"),
                        format!(
                            "cannot rebuild primary key of '{qualified}': table is not empty; change skipped"
                        ),
                    );
                    warn!(table = %qualified, "primary key rebuild rejected");
                    return;
                }

                ops.push(MigrationOperation::drop_primary_key(
                    &new.schema,
                    &new.name,
                    &opk.name,
                ));
                ops.push(MigrationOperation::add_primary_key(
                    &new.schema,
                    &new.name,
                    npk.clone(),
                ));
            }
        }
    }

    // Named constraints

    fn diff_unique_constraints(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        ops: &mut Vec<MigrationOperation>,
    ) {
        // Lookup maps for membership; iteration stays in declared order so
        // the emitted plan is stable across runs.
        let old_map: HashMap<String, _> = old
            .unique_constraints
            .iter()
            .map(|uc| (uc.name.to_ascii_lowercase(), uc))
            .collect();
        let new_map: HashMap<String, _> = new
            .unique_constraints
            .iter()
            .map(|uc| (uc.name.to_ascii_lowercase(), uc))
            .collect();

        for nc in &new.unique_constraints {
            match old_map.get(&nc.name.to_ascii_lowercase()) {
                None => ops.push(MigrationOperation::add_unique_constraint(
                    &new.schema,
                    &new.name,
                    nc.clone(),
                )),
                Some(oc) if !same_column_set(&oc.columns, &nc.columns) => {
                    ops.push(MigrationOperation::drop_unique_constraint(
                        &new.schema,
                        &new.name,
                        &oc.name,
                    ));
                    ops.push(MigrationOperation::add_unique_constraint(
                        &new.schema,
                        &new.name,
                        nc.clone(),
                    ));
                }
                Some(_) => {}
            }
        }

        for oc in &old.unique_constraints {
            if !new_map.contains_key(&oc.name.to_ascii_lowercase()) {
                ops.push(MigrationOperation::drop_unique_constraint(
                    &new.schema,
                    &new.name,
                    &oc.name,
                ));
            }
        }
    }

    fn diff_foreign_keys(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        ops: &mut Vec<MigrationOperation>,
    ) {
        let old_map: HashMap<String, _> = old
            .foreign_keys
            .iter()
            .map(|fk| (fk.name.to_ascii_lowercase(), fk))
            .collect();
        let new_map: HashMap<String, _> = new
            .foreign_keys
            .iter()
            .map(|fk| (fk.name.to_ascii_lowercase(), fk))
            .collect();

        for nfk in &new.foreign_keys {
            match old_map.get(&nfk.name.to_ascii_lowercase()) {
                None => ops.push(MigrationOperation::add_foreign_key(
                    &new.schema,
                    &new.name,
                    nfk.clone(),
                )),
                Some(ofk) => {
                    let changed = !same_column_set(&ofk.columns, &nfk.columns)
                        || !ofk
                            .references_table
                            .eq_ignore_ascii_case(&nfk.references_table)
                        || !same_column_set(&ofk.references_columns, &nfk.references_columns)
                        || ofk.on_delete != nfk.on_delete
                        || ofk.on_update != nfk.on_update;
                    if changed {
                        ops.push(MigrationOperation::drop_foreign_key(
                            &new.schema,
                            &new.name,
                            &ofk.name,
                        ));
                        ops.push(MigrationOperation::add_foreign_key(
                            &new.schema,
                            &new.name,
                            nfk.clone(),
                        ));
                    }
                }
            }
        }

        for ofk in &old.foreign_keys {
            if !new_map.contains_key(&ofk.name.to_ascii_lowercase()) {
                ops.push(MigrationOperation::drop_foreign_key(
                    &new.schema,
                    &new.name,
                    &ofk.name,
                ));
            }
        }
    }

    fn diff_check_constraints(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        ops: &mut Vec<MigrationOperation>,
    ) {
        let old_map: HashMap<String, _> = old
            .check_constraints
            .iter()
            .map(|ck| (ck.name.to_ascii_lowercase(), ck))
            .collect();
        let new_map: HashMap<String, _> = new
            .check_constraints
            .iter()
            .map(|ck| (ck.name.to_ascii_lowercase(), ck))
            .collect();

        for nck in &new.check_constraints {
            match old_map.get(&nck.name.to_ascii_lowercase()) {
                None => ops.push(MigrationOperation::add_check_constraint(
                    &new.schema,
                    &new.name,
                    nck.clone(),
                )),
                Some(ock) => {
                    if normalize_expression(&ock.expression)
                        != normalize_expression(&nck.expression)
                    {
                        ops.push(MigrationOperation::drop_check_constraint(
                            &new.schema,
                            &new.name,
                            &ock.name,
                        ));
                        ops.push(MigrationOperation::add_check_constraint(
                            &new.schema,
                            &new.name,
                            nck.clone(),
                        ));
                    }
                }
            }
        }

        for ock in &old.check_constraints {
            if !new_map.contains_key(&ock.name.to_ascii_lowercase()) {
                ops.push(MigrationOperation::drop_check_constraint(
                    &new.schema,
                    &new.name,
                    &ock.name,
                ));
            }
        }
    }

    // Indexes

    fn diff_indexes(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        ops: &mut Vec<MigrationOperation>,
        warnings: &mut WarningSet,
    ) {
        let old_map: HashMap<String, _> = old
            .indexes
            .iter()
            .map(|ix| (ix.name.to_ascii_lowercase(), ix))
            .collect();
        let new_map: HashMap<String, _> = new
            .indexes
            .iter()
            .map(|ix| (ix.name.to_ascii_lowercase(), ix))
            .collect();

        for nix in &new.indexes {
            match old_map.get(&nix.name.to_ascii_lowercase()) {
                None => self.push_guarded_index(new, nix, ops, warnings),
                Some(oix) if index_changed(oix, nix) => {
                    // Only replace the live index when the new definition
                    // fits the key limit; otherwise keep what exists.
                    if self.index_fits(new, nix, warnings) {
                        ops.push(MigrationOperation::drop_index(
                            &new.schema,
                            &new.name,
                            &oix.name,
                        ));
                        ops.push(MigrationOperation::create_index(
                            &new.schema,
                            &new.name,
                            nix.clone(),
                        ));
                    }
                }
                Some(_) => {}
            }
        }

        for oix in &old.indexes {
            if !new_map.contains_key(&oix.name.to_ascii_lowercase()) {
                ops.push(MigrationOperation::drop_index(
                    &new.schema,
                    &new.name,
                    &oix.name,
                ));
            }
        }
    }

    fn push_guarded_index(
        &self,
        table: &TableSchema,
        index: &IndexSchema,
        ops: &mut Vec<MigrationOperation>,
        warnings: &mut WarningSet,
    ) {
        if self.index_fits(table, index, warnings) {
            ops.push(MigrationOperation::create_index(
                &table.schema,
                &table.name,
                index.clone(),
            ));
        }
    }

    /// Sums the indexable byte width of the key columns and records a
    /// warning when the total exceeds the dialect limit.
    fn index_fits(
        &self,
        table: &TableSchema,
        index: &IndexSchema,
        warnings: &mut WarningSet,
    ) -> bool {
        let total: u32 = index
            .columns
            .iter()
            .map(|name| self.column_key_bytes(table, name))
            .sum();

        if total > self.max_index_key_bytes {
            let qualified = table.qualified_name();
            warnings.record(
                format!("index-width:{qualified}.{}", index.name),
                format!(
                    "index '{}' on '{qualified}' needs {total} key bytes, exceeding the {}-byte limit; index skipped",
                    index.name, self.max_index_key_bytes
                ),
            );
            warn!(table = %qualified, index = %index.name, total, "index exceeds key-size limit");
            return false;
        }
        true
    }

    fn column_key_bytes(&self, table: &TableSchema, column: &str) -> u32 {
        let Some(col) = table.get_column(column) else {
            return 0;
        };
        if let Some(width) = col.sql_type.fixed_byte_width() {
            return width;
        }
        match self
            .oracle
            .max_indexable_byte_width(&col.sql_type.base_name())
        {
            Ok(Some(width)) => width,
            _ => UNBOUNDED_KEY_FALLBACK_BYTES,
        }
    }

    // Descriptions

    fn diff_descriptions(
        &self,
        old: &TableSchema,
        new: &TableSchema,
        ops: &mut Vec<MigrationOperation>,
    ) {
        if let Some(text) = &new.description {
            if old.description.as_deref() != Some(text) {
                ops.push(MigrationOperation::set_description(
                    &new.schema,
                    &new.name,
                    DescriptionTarget::Table,
                    text,
                ));
            }
        }

        for nc in &new.columns {
            if let Some(text) = &nc.description {
                let unchanged = old
                    .get_column(&nc.name)
                    .is_some_and(|oc| oc.description.as_deref() == Some(text));
                if !unchanged {
                    ops.push(MigrationOperation::set_description(
                        &new.schema,
                        &new.name,
                        DescriptionTarget::Column(nc.name.clone()),
                        text,
                    ));
                }
            }
        }

        for nix in &new.indexes {
            if let Some(text) = &nix.description {
                let unchanged = old
                    .indexes
                    .iter()
                    .find(|oix| oix.name.eq_ignore_ascii_case(&nix.name))
                    .is_some_and(|oix| oix.description.as_deref() == Some(text));
                if !unchanged {
                    ops.push(MigrationOperation::set_description(
                        &new.schema,
                        &new.name,
                        DescriptionTarget::Index(nix.name.clone()),
                        text,
                    ));
                }
            }
        }
    }
}

// Comparison helpers

/// Case- and whitespace-insensitive SQL text comparison key.
fn normalize_sql(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Check-constraint comparison key: parentheses and whitespace stripped,
/// case-insensitive. Semantically equal but syntactically different
/// expressions still compare unequal and re-create the constraint.
fn normalize_expression(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn same_column_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<String> = a.iter().map(|c| c.to_ascii_lowercase()).collect();
    let mut right: Vec<String> = b.iter().map(|c| c.to_ascii_lowercase()).collect();
    left.sort();
    right.sort();
    left == right
}

/// The equivalence test deciding whether a column changed at all: base
/// type, nullability, identity, default text, computed definition, and
/// collation, all compared case- and whitespace-insensitively.
fn columns_equivalent(old: &ColumnSchema, new: &ColumnSchema) -> bool {
    if normalize_sql(&old.sql_type.type_name()) != normalize_sql(&new.sql_type.type_name()) {
        return false;
    }
    if old.nullable != new.nullable || old.identity != new.identity {
        return false;
    }

    let old_default = old.default.to_sql().map(|s| normalize_sql(&s));
    let new_default = new.default.to_sql().map(|s| normalize_sql(&s));
    if old_default != new_default {
        return false;
    }

    let old_computed = old
        .computed
        .as_ref()
        .map(|c| (normalize_expression(&c.expression), c.persisted));
    let new_computed = new
        .computed
        .as_ref()
        .map(|c| (normalize_expression(&c.expression), c.persisted));
    if old_computed != new_computed {
        return false;
    }

    let old_collation = old.collation.as_deref().map(normalize_sql);
    let new_collation = new.collation.as_deref().map(normalize_sql);
    old_collation == new_collation
}

fn index_changed(old: &IndexSchema, new: &IndexSchema) -> bool {
    let key_changed = old.columns.len() != new.columns.len()
        || old
            .columns
            .iter()
            .zip(&new.columns)
            .any(|(a, b)| !a.eq_ignore_ascii_case(b));
    let filter_changed = old.filter.as_deref().map(normalize_sql)
        != new.filter.as_deref().map(normalize_sql);

    key_changed
        || old.unique != new.unique
        || !same_column_set(&old.include_columns, &new.include_columns)
        || filter_changed
        || old.fulltext != new.fulltext
}

#[cfg(test)]
mod tests {
    use super::*;
    use stele_core::oracle::StaticOracle;
    use stele_core::schema::{
        CheckConstraint, DefaultValue, ForeignKeySchema, PrimaryKeySchema, UniqueConstraint,
    };
    use stele_core::types::{SqlType, TextLength};

    fn nvarchar(n: u16) -> SqlType {
        SqlType::NVarChar(TextLength::Chars(n))
    }

    fn base_table() -> TableSchema {
        TableSchema::new("Customer")
            .column(ColumnSchema::new("Id", SqlType::Int).identity())
            .column(ColumnSchema::new("Name", nvarchar(50)).not_null())
            .primary_key(PrimaryKeySchema::auto("Customer", vec!["Id".to_string()]))
    }

    fn diff(
        old: &TableSchema,
        new: &TableSchema,
        oracle: &StaticOracle,
    ) -> (Vec<MigrationOperation>, WarningSet) {
        let mut warnings = WarningSet::new();
        let ops = SchemaDiffer::new(oracle).diff_table(old, new, &mut warnings);
        (ops, warnings)
    }

    #[test]
    fn test_identical_tables_diff_to_nothing() {
        let table = base_table();
        let (ops, warnings) = diff(&table, &table, &StaticOracle::new());
        assert!(ops.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_absent_old_takes_create_path() {
        let new = base_table();
        let (ops, _) = diff(
            &TableSchema::absent("dbo", "Customer"),
            &new,
            &StaticOracle::new(),
        );

        assert!(matches!(ops[0], MigrationOperation::CreateTable { .. }));
        assert!(!ops
            .iter()
            .any(|op| matches!(op, MigrationOperation::AddColumn { .. })));
    }

    #[test]
    fn test_added_column_is_single_add_operation() {
        let old = base_table();
        let new = base_table().column(ColumnSchema::new("Email", nvarchar(100)));

        let (ops, warnings) = diff(&old, &new, &StaticOracle::new());
        assert_eq!(ops.len(), 1);
        assert!(warnings.is_empty());
        match &ops[0] {
            MigrationOperation::AddColumn { column, .. } => {
                assert_eq!(column.name, "Email");
                assert!(column.nullable);
            }
            other => panic!("expected AddColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_removed_column_is_dropped() {
        let old = base_table().column(ColumnSchema::new("Legacy", nvarchar(10)));
        let new = base_table();

        let (ops, _) = diff(&old, &new, &StaticOracle::new());
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            MigrationOperation::DropColumn { column, .. } if column == "Legacy"
        ));
    }

    #[test]
    fn test_same_family_widening_alters_in_place() {
        let old = base_table();
        let mut new = base_table();
        new.get_column_mut("Name").unwrap().sql_type = nvarchar(200);

        let (ops, warnings) = diff(&old, &new, &StaticOracle::new());
        assert!(warnings.is_empty());
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], MigrationOperation::AlterColumn { column, .. }
            if column.sql_type == nvarchar(200)));
    }

    #[test]
    fn test_cross_family_change_recreates_column() {
        let old = base_table().column(ColumnSchema::new("Code", nvarchar(10)));
        let new = base_table().column(ColumnSchema::new("Code", SqlType::Int));

        let (ops, _) = diff(&old, &new, &StaticOracle::new());
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], MigrationOperation::DropColumn { column, .. } if column == "Code"));
        assert!(matches!(&ops[1], MigrationOperation::AddColumn { column, .. } if column.name == "Code"));
    }

    #[test]
    fn test_identity_change_on_non_empty_table_is_skipped() {
        let mut old = base_table();
        old.get_column_mut("Id").unwrap().identity = false;
        let new = base_table();
        let oracle = StaticOracle::new().non_empty_table("dbo", "Customer");

        let (ops, warnings) = diff(&old, &new, &oracle);
        assert!(ops.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings.as_slice()[0].key.starts_with("identity:"));
    }

    #[test]
    fn test_identity_change_on_empty_table_is_allowed() {
        let mut old = base_table();
        old.get_column_mut("Id").unwrap().identity = false;
        let new = base_table();

        let (ops, warnings) = diff(&old, &new, &StaticOracle::new());
        assert!(warnings.is_empty());
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], MigrationOperation::AlterColumn { .. }));
    }

    #[test]
    fn test_not_null_tightening_with_nulls_is_skipped() {
        let old = base_table().column(ColumnSchema::new("Email", nvarchar(100)));
        let new = base_table().column(ColumnSchema::new("Email", nvarchar(100)).not_null());
        let oracle = StaticOracle::new().column_with_nulls("dbo", "Customer", "Email");

        let (ops, warnings) = diff(&old, &new, &oracle);
        assert!(ops.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings.as_slice()[0].key.starts_with("not-null:"));
    }

    #[test]
    fn test_warning_is_deduplicated_across_diffs() {
        let old = base_table().column(ColumnSchema::new("Email", nvarchar(100)));
        let new = base_table().column(ColumnSchema::new("Email", nvarchar(100)).not_null());
        let oracle = StaticOracle::new().column_with_nulls("dbo", "Customer", "Email");

        let mut warnings = WarningSet::new();
        let differ = SchemaDiffer::new(&oracle);
        differ.diff_table(&old, &new, &mut warnings);
        differ.diff_table(&old, &new, &mut warnings);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_indexed_unbounded_text_is_narrowed() {
        let old = base_table().column(ColumnSchema::new("Email", nvarchar(100)));
        let new = base_table()
            .column(ColumnSchema::new("Email", SqlType::NVarChar(TextLength::Max)))
            .index(IndexSchema::new(
                "IX_Customer_Email",
                vec!["Email".to_string()],
            ));

        let (ops, warnings) = diff(&old, &new, &StaticOracle::new());
        assert!(warnings.is_empty());
        let alter = ops
            .iter()
            .find_map(|op| match op {
                MigrationOperation::AlterColumn { column, .. } => Some(column),
                _ => None,
            })
            .expect("alter emitted");
        assert_eq!(alter.sql_type, nvarchar(SAFE_UNICODE_KEY_CHARS));
    }

    #[test]
    fn test_oversized_index_is_skipped_with_warning() {
        let old = base_table()
            .column(ColumnSchema::new("First", SqlType::VarChar(TextLength::Chars(500))))
            .column(ColumnSchema::new("Last", SqlType::VarChar(TextLength::Chars(500))));
        let new = old.clone().index(IndexSchema::new(
            "IX_Customer_Name",
            vec!["First".to_string(), "Last".to_string()],
        ));

        let (ops, warnings) = diff(&old, &new, &StaticOracle::new());
        assert!(!ops
            .iter()
            .any(|op| matches!(op, MigrationOperation::CreateIndex { .. })));
        assert_eq!(warnings.len(), 1);
        assert!(warnings.as_slice()[0].key.starts_with("index-width:"));
    }

    #[test]
    fn test_index_within_limit_is_created() {
        let old = base_table();
        let new = base_table().index(
            IndexSchema::new("IX_Customer_Name", vec!["Name".to_string()]).unique(),
        );

        let (ops, warnings) = diff(&old, &new, &StaticOracle::new());
        assert!(warnings.is_empty());
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], MigrationOperation::CreateIndex { .. }));
    }

    #[test]
    fn test_pk_name_only_change_is_skipped() {
        let old = base_table();
        let mut new = base_table();
        new.primary_key = Some(PrimaryKeySchema::named(
            "PK_Customer_Renamed",
            vec!["Id".to_string()],
        ));

        let (ops, warnings) = diff(&old, &new, &StaticOracle::new());
        assert!(ops.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_pk_column_change_requires_empty_table() {
        let old = base_table();
        let mut new = base_table();
        new = new.column(ColumnSchema::new("Code", nvarchar(20)).not_null());
        new.primary_key = Some(PrimaryKeySchema::named(
            "PK_Customer",
            vec!["Code".to_string()],
        ));
        let oracle = StaticOracle::new().non_empty_table("dbo", "Customer");

        let (ops, warnings) = diff(&old, &new, &oracle);
        // The new Code column is still added; the key rebuild is skipped.
        assert!(ops
            .iter()
            .all(|op| !matches!(op, MigrationOperation::DropPrimaryKey { .. })));
        assert_eq!(warnings.len(), 1);
        assert!(warnings.as_slice()[0].key.starts_with("primary-key:"));
    }

    #[test]
    fn test_check_constraint_normalization() {
        let old = base_table().check_constraint(CheckConstraint::new(
            "CK_Customer_Name",
            "([Name] <> N'')",
            vec!["Name".to_string()],
        ));
        let same = base_table().check_constraint(CheckConstraint::new(
            "CK_Customer_Name",
            "[Name]<>N''",
            vec!["Name".to_string()],
        ));
        let different = base_table().check_constraint(CheckConstraint::new(
            "CK_Customer_Name",
            "LEN([Name]) > 0",
            vec!["Name".to_string()],
        ));

        let (ops, _) = diff(&old, &same, &StaticOracle::new());
        assert!(ops.is_empty());

        let (ops, _) = diff(&old, &different, &StaticOracle::new());
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], MigrationOperation::DropCheckConstraint { .. }));
        assert!(matches!(ops[1], MigrationOperation::AddCheckConstraint { .. }));
    }

    #[test]
    fn test_foreign_key_retarget_recreates() {
        let fk_v1 = ForeignKeySchema::single("FK_Order_Owner", "OwnerId", "User", "Id");
        let fk_v2 = ForeignKeySchema::single("FK_Order_Owner", "OwnerId", "Account", "Id");
        let old = base_table()
            .column(ColumnSchema::new("OwnerId", SqlType::Int))
            .foreign_key(fk_v1);
        let new = base_table()
            .column(ColumnSchema::new("OwnerId", SqlType::Int))
            .foreign_key(fk_v2);

        let (ops, _) = diff(&old, &new, &StaticOracle::new());
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], MigrationOperation::DropForeignKey { .. }));
        assert!(matches!(ops[1], MigrationOperation::AddForeignKey { .. }));
    }

    #[test]
    fn test_unique_constraint_column_order_is_insensitive() {
        let old = base_table().unique_constraint(UniqueConstraint {
            name: "UQ_Customer_Name".to_string(),
            columns: vec!["Id".to_string(), "Name".to_string()],
        });
        let new = base_table().unique_constraint(UniqueConstraint {
            name: "UQ_Customer_Name".to_string(),
            columns: vec!["Name".to_string(), "id".to_string()],
        });

        let (ops, _) = diff(&old, &new, &StaticOracle::new());
        assert!(ops.is_empty());
    }

    #[test]
    fn test_default_change_alters_in_place() {
        let old = base_table().column(ColumnSchema::new("Active", SqlType::Bit).not_null());
        let new = base_table().column(
            ColumnSchema::new("Active", SqlType::Bit)
                .not_null()
                .default(DefaultValue::Bool(true)),
        );

        let (ops, _) = diff(&old, &new, &StaticOracle::new());
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], MigrationOperation::AlterColumn { .. }));
    }

    #[test]
    fn test_description_changes_emit_metadata_ops() {
        let old = base_table();
        let mut new = base_table().description("Customer master data");
        new.get_column_mut("Name").unwrap().description = Some("Display name".to_string());

        let (ops, _) = diff(&old, &new, &StaticOracle::new());
        assert_eq!(ops.len(), 2);
        assert!(ops
            .iter()
            .all(|op| matches!(op, MigrationOperation::SetDescription { .. })));
    }
}
