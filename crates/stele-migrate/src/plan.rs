//! End-to-end planning.
//!
//! The one synchronous entry point tying the pipeline together: infer
//! relationships on the desired side, validate the model, order it by
//! foreign-key dependencies, diff each table against its live counterpart,
//! drop vanished tables, and render the script.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use stele_core::error::SchemaError;
use stele_core::oracle::SafetyOracle;
use stele_core::schema::{DatabaseSchema, TableSchema};
use stele_core::validate::validate;
use stele_core::warning::{Warning, WarningSet};

use crate::diff::SchemaDiffer;
use crate::dialect::{MssqlDialect, SqlDialect};
use crate::infer::infer_relationships;
use crate::operations::MigrationOperation;
use crate::script::ScriptEmitter;
use crate::sort::sort_by_dependencies;

/// Errors aborting a planning run.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The desired schema model failed validation.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// The outcome of one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Operations in emission order.
    pub operations: Vec<MigrationOperation>,
    /// De-duplicated warnings recorded while diffing.
    pub warnings: Vec<Warning>,
    /// The rendered, re-runnable migration script.
    pub script: String,
    /// Qualified table names in the dependency order the plan follows.
    pub order: Vec<String>,
}

impl MigrationPlan {
    /// Whether the plan changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Plans the migration from a live snapshot to a desired table set.
pub struct Planner<D: SqlDialect> {
    dialect: D,
}

impl Planner<MssqlDialect> {
    /// Creates a planner targeting SQL Server.
    #[must_use]
    pub fn mssql() -> Self {
        Self {
            dialect: MssqlDialect::new(),
        }
    }
}

impl<D: SqlDialect> Planner<D> {
    /// Creates a planner for the given dialect.
    #[must_use]
    pub fn new(dialect: D) -> Self {
        Self { dialect }
    }

    /// Computes the plan transforming `current` into `desired`.
    ///
    /// `desired` is the provider's table set, not yet relationship-inferred;
    /// `current` is the live snapshot (tables missing from it are created).
    /// Tables present live but absent from `desired` are dropped after all
    /// other work, in reverse dependency order.
    pub fn plan(
        &self,
        current: &DatabaseSchema,
        desired: Vec<TableSchema>,
        oracle: &dyn SafetyOracle,
    ) -> Result<MigrationPlan, PlanError> {
        let mut desired = desired;
        infer_relationships(&mut desired);
        validate(&desired)?;
        let ordered = sort_by_dependencies(desired);
        info!(tables = ordered.len(), "planning migration");

        let differ = SchemaDiffer::new(oracle);
        let mut warnings = WarningSet::new();
        let mut operations = Vec::new();

        for table in &ordered {
            let fallback = TableSchema::absent(table.schema.clone(), table.name.clone());
            let old = current.get_table(&table.name).unwrap_or(&fallback);
            let ops = differ.diff_table(old, table, &mut warnings);
            debug!(table = %table.qualified_name(), operations = ops.len(), "table diffed");
            operations.extend(ops);
        }

        self.drop_vanished_tables(current, &ordered, &mut operations);

        let script = ScriptEmitter::new(&self.dialect).emit(&operations, &warnings);
        info!(
            operations = operations.len(),
            warnings = warnings.len(),
            "plan complete"
        );

        Ok(MigrationPlan {
            operations,
            warnings: warnings.into_vec(),
            script,
            order: ordered.iter().map(TableSchema::qualified_name).collect(),
        })
    }

    /// Emits drops for tables that exist live but are gone from the
    /// desired set: incoming foreign keys first, then the tables in
    /// reverse dependency order.
    fn drop_vanished_tables(
        &self,
        current: &DatabaseSchema,
        desired: &[TableSchema],
        operations: &mut Vec<MigrationOperation>,
    ) {
        let desired_names: HashSet<String> = desired
            .iter()
            .map(|t| t.name.to_ascii_lowercase())
            .collect();
        let vanished: HashSet<String> = current
            .tables
            .iter()
            .filter(|t| !desired_names.contains(&t.name.to_ascii_lowercase()))
            .map(|t| t.name.to_ascii_lowercase())
            .collect();
        if vanished.is_empty() {
            return;
        }

        // Drops already emitted by the per-table diffs must not repeat.
        let mut dropped_fks: HashSet<(String, String)> = operations
            .iter()
            .filter_map(|op| match op {
                MigrationOperation::DropForeignKey { table, name, .. } => {
                    Some((table.to_ascii_lowercase(), name.to_ascii_lowercase()))
                }
                _ => None,
            })
            .collect();

        for table in &current.tables {
            let table_vanishes = vanished.contains(&table.name.to_ascii_lowercase());
            for fk in &table.foreign_keys {
                // A foreign key into a vanished table has to go; the ones
                // owned by a vanished table disappear with their table.
                if table_vanishes || !vanished.contains(&fk.references_table.to_ascii_lowercase())
                {
                    continue;
                }
                let key = (table.name.to_ascii_lowercase(), fk.name.to_ascii_lowercase());
                if dropped_fks.insert(key) {
                    operations.push(MigrationOperation::drop_foreign_key(
                        &table.schema,
                        &table.name,
                        &fk.name,
                    ));
                }
            }
        }

        let ordered_current = sort_by_dependencies(current.tables.clone());
        for table in ordered_current.iter().rev() {
            if vanished.contains(&table.name.to_ascii_lowercase()) {
                debug!(table = %table.qualified_name(), "table vanished from desired schema");
                operations.push(MigrationOperation::drop_table(&table.schema, &table.name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stele_core::oracle::StaticOracle;
    use stele_core::relation::NavigationHint;
    use stele_core::schema::{ColumnSchema, PrimaryKeySchema};
    use stele_core::types::{SqlType, TextLength};

    fn keyed(name: &str) -> TableSchema {
        TableSchema::new(name)
            .column(ColumnSchema::new("Id", SqlType::Int).identity())
            .primary_key(PrimaryKeySchema::auto(name, vec!["Id".to_string()]))
    }

    #[test]
    fn test_plan_orders_referenced_table_first() {
        let customer = keyed("Customer").navigation(NavigationHint::collection("Orders", "Order"));
        let order = keyed("Order");

        let plan = Planner::mssql()
            .plan(
                &DatabaseSchema::new(),
                vec![order, customer],
                &StaticOracle::new(),
            )
            .unwrap();

        assert_eq!(plan.order, vec!["dbo.Customer", "dbo.Order"]);
        let customer_pos = plan.script.find("CREATE TABLE [dbo].[Customer]").unwrap();
        let order_pos = plan.script.find("CREATE TABLE [dbo].[Order]").unwrap();
        assert!(customer_pos < order_pos);
    }

    #[test]
    fn test_plan_against_matching_snapshot_is_empty() {
        let desired = vec![keyed("Customer")];
        let planner = Planner::mssql();

        let initial = planner
            .plan(&DatabaseSchema::new(), desired.clone(), &StaticOracle::new())
            .unwrap();

        let mut live = DatabaseSchema::new();
        crate::apply::apply_operations(&mut live, &initial.operations).unwrap();

        let rerun = planner.plan(&live, desired, &StaticOracle::new()).unwrap();
        assert!(rerun.is_empty());
        assert!(rerun.script.is_empty());
    }

    #[test]
    fn test_validation_failure_aborts_plan() {
        let broken = keyed("Order").foreign_key(stele_core::schema::ForeignKeySchema::single(
            "FK_Order_Customer",
            "CustomerId",
            "Customer",
            "Id",
        ));

        let err = Planner::mssql()
            .plan(
                &DatabaseSchema::new(),
                vec![broken, keyed("Customer")],
                &StaticOracle::new(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::Schema(SchemaError::MissingForeignKeyColumn { .. })
        ));
    }

    #[test]
    fn test_vanished_table_is_dropped_after_fk_cleanup() {
        let mut live = DatabaseSchema::new();
        live.tables.push(keyed("Customer"));
        live.tables.push(
            keyed("Order")
                .column(ColumnSchema::new("CustomerId", SqlType::Int).not_null())
                .foreign_key(stele_core::schema::ForeignKeySchema::single(
                    "FK_Order_Customer",
                    "CustomerId",
                    "Customer",
                    "Id",
                )),
        );

        // Customer disappears from the desired schema while Order stays,
        // so Order's foreign key must be dropped before the table goes.
        let desired = vec![keyed("Order")
            .column(ColumnSchema::new("CustomerId", SqlType::Int).not_null())];

        let plan = Planner::mssql()
            .plan(&live, desired, &StaticOracle::new())
            .unwrap();

        let fk_drop = plan
            .operations
            .iter()
            .position(|op| matches!(op, MigrationOperation::DropForeignKey { .. }));
        let table_drop = plan
            .operations
            .iter()
            .position(|op| matches!(op, MigrationOperation::DropTable { name, .. } if name == "Customer"));
        assert!(fk_drop.is_some());
        assert!(table_drop.is_some());
        assert!(fk_drop < table_drop);
    }

    #[test]
    fn test_warnings_surface_in_script() {
        let mut live = DatabaseSchema::new();
        let mut live_customer = keyed("Customer");
        live_customer.get_column_mut("Id").unwrap().identity = false;
        live.tables.push(live_customer);

        let oracle = StaticOracle::new().non_empty_table("dbo", "Customer");
        let plan = Planner::mssql()
            .plan(&live, vec![keyed("Customer")], &oracle)
            .unwrap();

        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.script.contains("-- WARNING:"));
        assert!(!plan
            .operations
            .iter()
            .any(|op| matches!(op, MigrationOperation::AlterColumn { .. })));
    }

    #[test]
    fn test_inference_feeds_the_plan() {
        let user = keyed("User").navigation(NavigationHint::collection("Posts", "Post"));
        let post = keyed("Post").column(
            ColumnSchema::new("Title", SqlType::NVarChar(TextLength::Chars(200))).not_null(),
        );

        let plan = Planner::mssql()
            .plan(&DatabaseSchema::new(), vec![user, post], &StaticOracle::new())
            .unwrap();

        // The synthesized UserId column and foreign key ride along in the
        // CREATE path for Post.
        assert!(plan.script.contains("[UserId] int NOT NULL"));
        assert!(plan.script.contains("FOREIGN KEY ([UserId]) REFERENCES [dbo].[User] ([Id])"));
    }

    #[test]
    fn test_fk_drop_is_not_duplicated() {
        // Order keeps existing but both its FK and the referenced table
        // vanish; the per-table diff already drops the FK.
        let mut live = DatabaseSchema::new();
        live.tables.push(keyed("Customer"));
        live.tables.push(
            keyed("Order")
                .column(ColumnSchema::new("CustomerId", SqlType::Int).not_null())
                .foreign_key(stele_core::schema::ForeignKeySchema::single(
                    "FK_Order_Customer",
                    "CustomerId",
                    "Customer",
                    "Id",
                )),
        );

        let desired = vec![keyed("Order")];

        let plan = Planner::mssql()
            .plan(&live, desired, &StaticOracle::new())
            .unwrap();

        let fk_drops = plan
            .operations
            .iter()
            .filter(|op| matches!(op, MigrationOperation::DropForeignKey { .. }))
            .count();
        assert_eq!(fk_drops, 1);
    }
}
