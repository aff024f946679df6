//! Schema diffing and dependency-ordered T-SQL generation for SQL Server.
//!
//! `stele-migrate` computes the difference between a desired schema (built
//! from application entity declarations) and the current schema of a live
//! database, and renders a safe, re-runnable migration script:
//!
//! - **Inference** ([`infer`]) turns flat navigation hints into foreign
//!   keys and one-to-one / one-to-many / many-to-many relationships,
//!   synthesizing join tables where a many-to-many pair lacks one.
//! - **Ordering** ([`sort`]) sequences tables so referenced tables are
//!   always handled before referencing tables.
//! - **Diffing** ([`diff`]) compares table pairs per object class and
//!   consults the safety oracle before destructive in-place changes;
//!   rejected changes degrade to recorded warnings.
//! - **Emission** ([`dialect`], [`script`]) renders guarded T-SQL batches.
//! - **Planning** ([`plan`]) ties the pipeline into one synchronous call.
//!
//! # Example
//!
//! ```
//! use stele_core::prelude::*;
//! use stele_migrate::prelude::*;
//!
//! let customer = TableSchema::new("Customer")
//!     .column(ColumnSchema::new("Id", SqlType::Int).identity())
//!     .column(ColumnSchema::new("Name", SqlType::NVarChar(TextLength::Chars(50))).not_null())
//!     .primary_key(PrimaryKeySchema::auto("Customer", vec!["Id".to_string()]))
//!     .navigation(NavigationHint::collection("Orders", "Order"));
//! let order = TableSchema::new("Order")
//!     .column(ColumnSchema::new("Id", SqlType::Int).identity())
//!     .primary_key(PrimaryKeySchema::auto("Order", vec!["Id".to_string()]));
//!
//! let plan = Planner::mssql()
//!     .plan(&DatabaseSchema::new(), vec![customer, order], &StaticOracle::new())
//!     .unwrap();
//!
//! assert!(plan.script.contains("CREATE TABLE [dbo].[Customer]"));
//! ```

pub mod apply;
pub mod diff;
pub mod dialect;
pub mod infer;
pub mod operations;
pub mod plan;
pub mod script;
pub mod snapshot;
pub mod sort;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::apply::{apply_operation, apply_operations, ApplyError};
    pub use crate::diff::SchemaDiffer;
    pub use crate::dialect::{MssqlDialect, SqlDialect};
    pub use crate::infer::infer_relationships;
    pub use crate::operations::{DescriptionTarget, MigrationOperation};
    pub use crate::plan::{MigrationPlan, PlanError, Planner};
    pub use crate::script::ScriptEmitter;
    pub use crate::snapshot::{gather_tables, SchemaSource, TableReader};
    pub use crate::sort::sort_by_dependencies;
}
