//! Error types for the schema model.

/// Errors raised while building or validating a schema model.
///
/// These are fatal for the run that produced them: a model that fails
/// validation is never handed to the differ.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Two columns on one table share a name (names compare
    /// case-insensitively).
    #[error("table '{table}' declares column '{column}' more than once")]
    DuplicateColumn {
        /// Owning table.
        table: String,
        /// Conflicting column name.
        column: String,
    },

    /// A primary key references a column the table does not have.
    #[error("primary key '{constraint}' on table '{table}' references missing column '{column}'")]
    MissingKeyColumn {
        /// Owning table.
        table: String,
        /// Primary key constraint name.
        constraint: String,
        /// Missing column name.
        column: String,
    },

    /// An identity column participates in a composite primary key.
    #[error("table '{table}' puts identity column '{column}' in a composite primary key")]
    CompositeIdentity {
        /// Owning table.
        table: String,
        /// Identity column name.
        column: String,
    },

    /// A column is both computed and identity.
    #[error("column '{column}' on table '{table}' is both computed and identity")]
    ComputedIdentity {
        /// Owning table.
        table: String,
        /// Offending column.
        column: String,
    },

    /// A computed column declares a default value.
    #[error("computed column '{column}' on table '{table}' cannot carry a default")]
    ComputedDefault {
        /// Owning table.
        table: String,
        /// Offending column.
        column: String,
    },

    /// A foreign key's local column is absent from its owning table.
    #[error(
        "foreign key '{constraint}' on table '{table}' references local column \
         '{column}' which does not exist"
    )]
    MissingForeignKeyColumn {
        /// Owning table.
        table: String,
        /// Foreign key constraint name.
        constraint: String,
        /// Missing local column.
        column: String,
    },

    /// A foreign key points at a table outside the working set.
    #[error("foreign key '{constraint}' on table '{table}' references unknown table '{target}'")]
    UnknownReferencedTable {
        /// Owning table.
        table: String,
        /// Foreign key constraint name.
        constraint: String,
        /// Referenced table that could not be resolved.
        target: String,
    },

    /// Snapshot serialization failed.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot source failed to produce its table set.
    #[error("snapshot provider error: {0}")]
    Provider(String),
}

/// Errors raised by a live-data probe.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// The probed table does not exist in the live database.
    #[error("probe target '{schema}.{table}' does not exist")]
    UnknownTable {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
    },

    /// The underlying probe query failed.
    #[error("probe failed: {0}")]
    Probe(String),
}

/// Result type for schema model operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
