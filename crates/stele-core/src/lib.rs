//! Schema model and safety contracts for SQL Server schema synchronization.
//!
//! `stele-core` holds the language-neutral schema model the sync engine
//! diffs: tables, columns, keys, constraints, indexes, and the relationship
//! metadata inferred from provider navigation hints. It also defines the
//! [`oracle::SafetyOracle`] contract the differ uses to gate destructive
//! changes against live data, and the per-run [`warning::WarningSet`].
//!
//! The model is built once per run from a snapshot source (the desired-
//! schema provider or the live-schema reader) and treated as read-only
//! afterwards. The engine that consumes it lives in `stele-migrate`.
//!
//! # Example
//!
//! ```
//! use stele_core::prelude::*;
//!
//! let customer = TableSchema::new("Customer")
//!     .column(ColumnSchema::new("Id", SqlType::Int).identity())
//!     .column(ColumnSchema::new("Name", SqlType::NVarChar(TextLength::Chars(50))).not_null())
//!     .primary_key(PrimaryKeySchema::auto("Customer", vec!["Id".to_string()]));
//!
//! assert_eq!(customer.qualified_name(), "dbo.Customer");
//! ```

pub mod error;
pub mod oracle;
pub mod relation;
pub mod schema;
pub mod types;
pub mod validate;
pub mod warning;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{OracleError, SchemaError};
    pub use crate::oracle::{SafetyOracle, StaticOracle};
    pub use crate::relation::{ForeignKeyAction, NavigationHint, Relationship, RelationshipKind};
    pub use crate::schema::{
        CheckConstraint, ColumnSchema, ComputedSpec, DatabaseSchema, DefaultValue,
        ForeignKeySchema, IndexSchema, PrimaryKeySchema, TableSchema, UniqueConstraint,
    };
    pub use crate::types::{SqlType, TextLength, TypeFamily};
    pub use crate::validate::validate;
    pub use crate::warning::{Warning, WarningSet};
}
