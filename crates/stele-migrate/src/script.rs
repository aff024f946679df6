//! Script emission.
//!
//! Renders an ordered operation list to one T-SQL script: de-duplicated
//! warnings as leading comments, a comment header per table, one batch per
//! statement separated by the dialect's batch separator. Each statement
//! already carries its own existence guard, so the whole script is safe to
//! re-run.

use stele_core::warning::WarningSet;

use crate::dialect::SqlDialect;
use crate::operations::MigrationOperation;

/// Renders operations into a migration script.
pub struct ScriptEmitter<'a> {
    dialect: &'a dyn SqlDialect,
}

impl<'a> ScriptEmitter<'a> {
    /// Creates an emitter for the given dialect.
    #[must_use]
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    /// Renders the full script. Returns an empty string when there is
    /// nothing to do and nothing to warn about.
    #[must_use]
    pub fn emit(&self, operations: &[MigrationOperation], warnings: &WarningSet) -> String {
        let mut script = String::new();

        for warning in warnings.as_slice() {
            script.push_str("-- WARNING: ");
            script.push_str(&warning.message);
            script.push('\n');
        }
        if !warnings.is_empty() {
            script.push('\n');
        }

        let mut current_table: Option<(String, String)> = None;
        for operation in operations {
            let (schema, table) = operation.target_table();
            let target = (schema.to_string(), table.to_string());
            if current_table.as_ref() != Some(&target) {
                script.push_str(&format!("-- {schema}.{table}\n"));
                current_table = Some(target);
            }

            for statement in self.dialect.generate_sql(operation) {
                script.push_str(&statement);
                script.push('\n');
                script.push_str(self.dialect.batch_separator());
                script.push_str("\n\n");
            }
        }

        script
    }
}
