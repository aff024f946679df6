//! SQL dialect abstraction.
//!
//! The diffing and ordering logic is dialect-independent; everything that
//! knows T-SQL spelling lives behind this trait. One dialect ships today,
//! but the seam keeps statement rendering out of the differ.

pub mod mssql;

pub use mssql::MssqlDialect;

use stele_core::types::SqlType;

use crate::operations::MigrationOperation;

/// Trait for database-specific DDL generation.
pub trait SqlDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the statement(s) realizing one migration operation.
    ///
    /// Statements are wrapped in existence guards so the resulting script
    /// can be re-run against a partially migrated database.
    fn generate_sql(&self, operation: &MigrationOperation) -> Vec<String>;

    /// Renders the given type.
    fn type_name(&self, sql_type: &SqlType) -> String {
        sql_type.type_name()
    }

    /// Quotes an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String;

    /// The separator emitted between statement batches.
    fn batch_separator(&self) -> &'static str;

    /// Maximum total byte width of an index key in this dialect.
    fn max_index_key_bytes(&self) -> u32;
}
