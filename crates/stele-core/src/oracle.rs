//! The safety oracle contract.
//!
//! Before the differ emits an in-place alteration that could fail or lose
//! data, it asks point questions about the live table. The engine only
//! defines the contract; production implementations run probe queries
//! against the target database and live in the orchestration layer.

use std::collections::{HashMap, HashSet};

use crate::error::OracleError;

/// Answers live-data questions used to gate destructive schema changes.
///
/// Calls are synchronous and may block on I/O; the differ issues them
/// inline while walking a table pair. Implementations must be usable from
/// multiple threads if table diffs are parallelized.
pub trait SafetyOracle: Send + Sync {
    /// Whether `schema.table` currently holds zero rows.
    fn is_table_empty(&self, schema: &str, table: &str) -> Result<bool, OracleError>;

    /// Whether any row of `schema.table` has NULL in `column`.
    fn column_has_nulls(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<bool, OracleError>;

    /// Maximum per-value byte width of the named base type when used in an
    /// index key, or `None` when the type is unbounded.
    fn max_indexable_byte_width(&self, type_name: &str) -> Result<Option<u32>, OracleError>;
}

/// Byte width of well-known base types, used when a declared width is not
/// available.
#[must_use]
pub fn default_byte_width(type_name: &str) -> Option<u32> {
    match type_name.to_ascii_lowercase().as_str() {
        "tinyint" | "bit" => Some(1),
        "smallint" => Some(2),
        "date" => Some(3),
        "int" | "real" | "smallmoney" => Some(4),
        "time" => Some(5),
        "bigint" | "float" | "money" | "datetime" | "datetime2" => Some(8),
        "decimal" | "numeric" => Some(17),
        "datetimeoffset" => Some(10),
        "uniqueidentifier" => Some(16),
        _ => None,
    }
}

/// In-memory oracle for tests and offline planning.
///
/// Tables default to empty and columns to NULL-free, which matches a fresh
/// target database; mark the exceptions explicitly.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    non_empty: HashSet<String>,
    with_nulls: HashSet<String>,
    widths: HashMap<String, u32>,
}

impl StaticOracle {
    /// Creates an oracle describing a fresh, empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `schema.table` as holding rows.
    #[must_use]
    pub fn non_empty_table(mut self, schema: &str, table: &str) -> Self {
        self.non_empty.insert(table_key(schema, table));
        self
    }

    /// Marks `schema.table.column` as containing NULLs.
    #[must_use]
    pub fn column_with_nulls(mut self, schema: &str, table: &str, column: &str) -> Self {
        self.with_nulls.insert(column_key(schema, table, column));
        self
    }

    /// Overrides the byte width reported for a base type.
    #[must_use]
    pub fn type_width(mut self, type_name: &str, width: u32) -> Self {
        self.widths.insert(type_name.to_ascii_lowercase(), width);
        self
    }
}

impl SafetyOracle for StaticOracle {
    fn is_table_empty(&self, schema: &str, table: &str) -> Result<bool, OracleError> {
        Ok(!self.non_empty.contains(&table_key(schema, table)))
    }

    fn column_has_nulls(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<bool, OracleError> {
        Ok(self.with_nulls.contains(&column_key(schema, table, column)))
    }

    fn max_indexable_byte_width(&self, type_name: &str) -> Result<Option<u32>, OracleError> {
        let key = type_name.to_ascii_lowercase();
        if let Some(width) = self.widths.get(&key) {
            return Ok(Some(*width));
        }
        Ok(default_byte_width(&key))
    }
}

fn table_key(schema: &str, table: &str) -> String {
    format!("{}.{}", schema.to_ascii_lowercase(), table.to_ascii_lowercase())
}

fn column_key(schema: &str, table: &str, column: &str) -> String {
    format!("{}.{}", table_key(schema, table), column.to_ascii_lowercase())
}
