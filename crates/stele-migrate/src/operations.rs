//! Migration operations.
//!
//! One operation is one schema change against one table. The differ
//! produces them in emission order; the dialect renders each to one or more
//! guarded T-SQL statements.

use serde::{Deserialize, Serialize};

use stele_core::schema::{
    CheckConstraint, ColumnSchema, ForeignKeySchema, IndexSchema, PrimaryKeySchema, TableSchema,
    UniqueConstraint,
};

/// Which object an extended description attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionTarget {
    /// The table itself.
    Table,
    /// A column of the table.
    Column(String),
    /// An index of the table.
    Index(String),
}

/// A single migration operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MigrationOperation {
    /// Create a new table with its columns and inline primary key.
    CreateTable {
        /// Full table definition.
        table: TableSchema,
    },

    /// Drop a table.
    DropTable {
        /// Schema name.
        schema: String,
        /// Table name.
        name: String,
    },

    /// Add a column to a table.
    AddColumn {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnSchema,
    },

    /// Alter a column in place.
    AlterColumn {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// The new column definition.
        column: ColumnSchema,
        /// The live definition being replaced, for reporting.
        original: Option<ColumnSchema>,
    },

    /// Drop a column from a table.
    DropColumn {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Add a primary key constraint.
    AddPrimaryKey {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Key definition.
        primary_key: PrimaryKeySchema,
    },

    /// Drop a primary key constraint.
    DropPrimaryKey {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// Add a unique constraint.
    AddUniqueConstraint {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint definition.
        constraint: UniqueConstraint,
    },

    /// Drop a unique constraint.
    DropUniqueConstraint {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// Add a foreign key constraint.
    AddForeignKey {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Foreign key definition.
        foreign_key: ForeignKeySchema,
    },

    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// Add a check constraint.
    AddCheckConstraint {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Check definition.
        check: CheckConstraint,
    },

    /// Drop a check constraint.
    DropCheckConstraint {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },

    /// Create an index.
    CreateIndex {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Index definition.
        index: IndexSchema,
    },

    /// Drop an index.
    DropIndex {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Index name.
        name: String,
    },

    /// Attach or replace an extended description.
    SetDescription {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
        /// Object the description attaches to.
        target: DescriptionTarget,
        /// Description text.
        text: String,
    },
}

impl MigrationOperation {
    // Convenience constructors

    /// Creates a `CreateTable` operation.
    #[must_use]
    pub fn create_table(table: TableSchema) -> Self {
        Self::CreateTable { table }
    }

    /// Creates a `DropTable` operation.
    #[must_use]
    pub fn drop_table(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropTable {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Creates an `AddColumn` operation.
    #[must_use]
    pub fn add_column(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: ColumnSchema,
    ) -> Self {
        Self::AddColumn {
            schema: schema.into(),
            table: table.into(),
            column,
        }
    }

    /// Creates an `AlterColumn` operation.
    #[must_use]
    pub fn alter_column(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: ColumnSchema,
        original: Option<ColumnSchema>,
    ) -> Self {
        Self::AlterColumn {
            schema: schema.into(),
            table: table.into(),
            column,
            original,
        }
    }

    /// Creates a `DropColumn` operation.
    #[must_use]
    pub fn drop_column(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self::DropColumn {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates an `AddPrimaryKey` operation.
    #[must_use]
    pub fn add_primary_key(
        schema: impl Into<String>,
        table: impl Into<String>,
        primary_key: PrimaryKeySchema,
    ) -> Self {
        Self::AddPrimaryKey {
            schema: schema.into(),
            table: table.into(),
            primary_key,
        }
    }

    /// Creates a `DropPrimaryKey` operation.
    #[must_use]
    pub fn drop_primary_key(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DropPrimaryKey {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates an `AddUniqueConstraint` operation.
    #[must_use]
    pub fn add_unique_constraint(
        schema: impl Into<String>,
        table: impl Into<String>,
        constraint: UniqueConstraint,
    ) -> Self {
        Self::AddUniqueConstraint {
            schema: schema.into(),
            table: table.into(),
            constraint,
        }
    }

    /// Creates a `DropUniqueConstraint` operation.
    #[must_use]
    pub fn drop_unique_constraint(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DropUniqueConstraint {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates an `AddForeignKey` operation.
    #[must_use]
    pub fn add_foreign_key(
        schema: impl Into<String>,
        table: impl Into<String>,
        foreign_key: ForeignKeySchema,
    ) -> Self {
        Self::AddForeignKey {
            schema: schema.into(),
            table: table.into(),
            foreign_key,
        }
    }

    /// Creates a `DropForeignKey` operation.
    #[must_use]
    pub fn drop_foreign_key(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DropForeignKey {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates an `AddCheckConstraint` operation.
    #[must_use]
    pub fn add_check_constraint(
        schema: impl Into<String>,
        table: impl Into<String>,
        check: CheckConstraint,
    ) -> Self {
        Self::AddCheckConstraint {
            schema: schema.into(),
            table: table.into(),
            check,
        }
    }

    /// Creates a `DropCheckConstraint` operation.
    #[must_use]
    pub fn drop_check_constraint(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DropCheckConstraint {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates a `CreateIndex` operation.
    #[must_use]
    pub fn create_index(
        schema: impl Into<String>,
        table: impl Into<String>,
        index: IndexSchema,
    ) -> Self {
        Self::CreateIndex {
            schema: schema.into(),
            table: table.into(),
            index,
        }
    }

    /// Creates a `DropIndex` operation.
    #[must_use]
    pub fn drop_index(
        schema: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::DropIndex {
            schema: schema.into(),
            table: table.into(),
            name: name.into(),
        }
    }

    /// Creates a `SetDescription` operation.
    #[must_use]
    pub fn set_description(
        schema: impl Into<String>,
        table: impl Into<String>,
        target: DescriptionTarget,
        text: impl Into<String>,
    ) -> Self {
        Self::SetDescription {
            schema: schema.into(),
            table: table.into(),
            target,
            text: text.into(),
        }
    }

    /// The `schema.table` this operation touches.
    #[must_use]
    pub fn target_table(&self) -> (&str, &str) {
        match self {
            Self::CreateTable { table } => (table.schema.as_str(), table.name.as_str()),
            Self::DropTable { schema, name } => (schema.as_str(), name.as_str()),
            Self::AddColumn { schema, table, .. }
            | Self::AlterColumn { schema, table, .. }
            | Self::DropColumn { schema, table, .. }
            | Self::AddPrimaryKey { schema, table, .. }
            | Self::DropPrimaryKey { schema, table, .. }
            | Self::AddUniqueConstraint { schema, table, .. }
            | Self::DropUniqueConstraint { schema, table, .. }
            | Self::AddForeignKey { schema, table, .. }
            | Self::DropForeignKey { schema, table, .. }
            | Self::AddCheckConstraint { schema, table, .. }
            | Self::DropCheckConstraint { schema, table, .. }
            | Self::CreateIndex { schema, table, .. }
            | Self::DropIndex { schema, table, .. }
            | Self::SetDescription { schema, table, .. } => (schema.as_str(), table.as_str()),
        }
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTable { table } => format!("Create table '{}'", table.qualified_name()),
            Self::DropTable { schema, name } => format!("Drop table '{schema}.{name}'"),
            Self::AddColumn { table, column, .. } => {
                format!("Add column '{}' to table '{}'", column.name, table)
            }
            Self::AlterColumn { table, column, .. } => {
                format!("Alter column '{}' in table '{}'", column.name, table)
            }
            Self::DropColumn { table, column, .. } => {
                format!("Drop column '{column}' from table '{table}'")
            }
            Self::AddPrimaryKey {
                table, primary_key, ..
            } => format!("Add primary key '{}' to table '{}'", primary_key.name, table),
            Self::DropPrimaryKey { table, name, .. } => {
                format!("Drop primary key '{name}' from table '{table}'")
            }
            Self::AddUniqueConstraint {
                table, constraint, ..
            } => format!(
                "Add unique constraint '{}' to table '{}'",
                constraint.name, table
            ),
            Self::DropUniqueConstraint { table, name, .. } => {
                format!("Drop unique constraint '{name}' from table '{table}'")
            }
            Self::AddForeignKey {
                table, foreign_key, ..
            } => format!(
                "Add foreign key '{}' to table '{}'",
                foreign_key.name, table
            ),
            Self::DropForeignKey { table, name, .. } => {
                format!("Drop foreign key '{name}' from table '{table}'")
            }
            Self::AddCheckConstraint { table, check, .. } => {
                format!("Add check constraint '{}' to table '{}'", check.name, table)
            }
            Self::DropCheckConstraint { table, name, .. } => {
                format!("Drop check constraint '{name}' from table '{table}'")
            }
            Self::CreateIndex { table, index, .. } => {
                format!("Create index '{}' on table '{}'", index.name, table)
            }
            Self::DropIndex { table, name, .. } => {
                format!("Drop index '{name}' from table '{table}'")
            }
            Self::SetDescription { table, target, .. } => match target {
                DescriptionTarget::Table => format!("Describe table '{table}'"),
                DescriptionTarget::Column(c) => format!("Describe column '{c}' on table '{table}'"),
                DescriptionTarget::Index(i) => format!("Describe index '{i}' on table '{table}'"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stele_core::types::SqlType;

    #[test]
    fn test_constructors_and_target_table() {
        let op = MigrationOperation::add_column(
            "dbo",
            "Customer",
            ColumnSchema::new("Email", SqlType::NVarChar(stele_core::types::TextLength::Chars(100))),
        );
        assert_eq!(op.target_table(), ("dbo", "Customer"));

        let op = MigrationOperation::create_table(TableSchema::new("Customer"));
        assert_eq!(op.target_table(), ("dbo", "Customer"));
    }

    #[test]
    fn test_describe() {
        let op = MigrationOperation::drop_foreign_key("dbo", "Order", "FK_Order_Customer");
        assert_eq!(
            op.describe(),
            "Drop foreign key 'FK_Order_Customer' from table 'Order'"
        );
    }
}
