//! Operation replay.
//!
//! Replays migration operations onto an in-memory [`DatabaseSchema`]. This
//! is how callers preview the schema a plan produces without touching a
//! database, and how the test suite checks that applying `diff(A, B)` to
//! `A` reproduces `B`.

use stele_core::schema::DatabaseSchema;

use crate::operations::{DescriptionTarget, MigrationOperation};

/// Errors raised when an operation does not fit the schema it is replayed
/// onto.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The operation targets a table the schema does not have.
    #[error("table '{0}' does not exist")]
    UnknownTable(String),

    /// The operation targets a column the table does not have.
    #[error("column '{column}' does not exist in table '{table}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The operation targets a constraint or index the table does not have.
    #[error("'{name}' does not exist on table '{table}'")]
    UnknownObject {
        /// Table name.
        table: String,
        /// Constraint or index name.
        name: String,
    },

    /// The operation would create an object that already exists.
    #[error("'{name}' already exists on table '{table}'")]
    AlreadyExists {
        /// Table name.
        table: String,
        /// Object name.
        name: String,
    },
}

/// Applies a sequence of operations in order.
pub fn apply_operations(
    schema: &mut DatabaseSchema,
    operations: &[MigrationOperation],
) -> Result<(), ApplyError> {
    for operation in operations {
        apply_operation(schema, operation)?;
    }
    Ok(())
}

/// Applies a single operation.
pub fn apply_operation(
    schema: &mut DatabaseSchema,
    operation: &MigrationOperation,
) -> Result<(), ApplyError> {
    match operation {
        MigrationOperation::CreateTable { table } => {
            if schema.get_table(&table.name).is_some() {
                return Err(ApplyError::AlreadyExists {
                    table: table.name.clone(),
                    name: table.name.clone(),
                });
            }
            schema.tables.push(table.clone());
        }

        MigrationOperation::DropTable { name, .. } => {
            let idx = schema
                .tables
                .iter()
                .position(|t| t.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| ApplyError::UnknownTable(name.clone()))?;
            schema.tables.remove(idx);
        }

        MigrationOperation::AddColumn { table, column, .. } => {
            let t = table_mut(schema, table)?;
            if t.has_column(&column.name) {
                return Err(ApplyError::AlreadyExists {
                    table: table.clone(),
                    name: column.name.clone(),
                });
            }
            t.columns.push(column.clone());
        }

        MigrationOperation::AlterColumn { table, column, .. } => {
            let t = table_mut(schema, table)?;
            let slot = t
                .get_column_mut(&column.name)
                .ok_or_else(|| ApplyError::UnknownColumn {
                    table: table.clone(),
                    column: column.name.clone(),
                })?;
            *slot = column.clone();
        }

        MigrationOperation::DropColumn { table, column, .. } => {
            let t = table_mut(schema, table)?;
            let idx = t
                .columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(column))
                .ok_or_else(|| ApplyError::UnknownColumn {
                    table: table.clone(),
                    column: column.clone(),
                })?;
            t.columns.remove(idx);
        }

        MigrationOperation::AddPrimaryKey {
            table, primary_key, ..
        } => {
            let t = table_mut(schema, table)?;
            if t.primary_key.is_some() {
                return Err(ApplyError::AlreadyExists {
                    table: table.clone(),
                    name: primary_key.name.clone(),
                });
            }
            t.primary_key = Some(primary_key.clone());
        }

        MigrationOperation::DropPrimaryKey { table, name, .. } => {
            let t = table_mut(schema, table)?;
            if t.primary_key.is_none() {
                return Err(ApplyError::UnknownObject {
                    table: table.clone(),
                    name: name.clone(),
                });
            }
            t.primary_key = None;
        }

        MigrationOperation::AddUniqueConstraint {
            table, constraint, ..
        } => {
            let t = table_mut(schema, table)?;
            t.unique_constraints.push(constraint.clone());
        }

        MigrationOperation::DropUniqueConstraint { table, name, .. } => {
            let t = table_mut(schema, table)?;
            let idx = t
                .unique_constraints
                .iter()
                .position(|uc| uc.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| ApplyError::UnknownObject {
                    table: table.clone(),
                    name: name.clone(),
                })?;
            t.unique_constraints.remove(idx);
        }

        MigrationOperation::AddForeignKey {
            table, foreign_key, ..
        } => {
            let t = table_mut(schema, table)?;
            t.foreign_keys.push(foreign_key.clone());
        }

        MigrationOperation::DropForeignKey { table, name, .. } => {
            let t = table_mut(schema, table)?;
            let idx = t
                .foreign_keys
                .iter()
                .position(|fk| fk.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| ApplyError::UnknownObject {
                    table: table.clone(),
                    name: name.clone(),
                })?;
            t.foreign_keys.remove(idx);
        }

        MigrationOperation::AddCheckConstraint { table, check, .. } => {
            let t = table_mut(schema, table)?;
            t.check_constraints.push(check.clone());
        }

        MigrationOperation::DropCheckConstraint { table, name, .. } => {
            let t = table_mut(schema, table)?;
            let idx = t
                .check_constraints
                .iter()
                .position(|ck| ck.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| ApplyError::UnknownObject {
                    table: table.clone(),
                    name: name.clone(),
                })?;
            t.check_constraints.remove(idx);
        }

        MigrationOperation::CreateIndex { table, index, .. } => {
            let t = table_mut(schema, table)?;
            t.indexes.push(index.clone());
        }

        MigrationOperation::DropIndex { table, name, .. } => {
            let t = table_mut(schema, table)?;
            let idx = t
                .indexes
                .iter()
                .position(|ix| ix.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| ApplyError::UnknownObject {
                    table: table.clone(),
                    name: name.clone(),
                })?;
            t.indexes.remove(idx);
        }

        MigrationOperation::SetDescription {
            table,
            target,
            text,
            ..
        } => {
            let t = table_mut(schema, table)?;
            match target {
                DescriptionTarget::Table => t.description = Some(text.clone()),
                DescriptionTarget::Column(column) => {
                    let c = t.get_column_mut(column).ok_or_else(|| {
                        ApplyError::UnknownColumn {
                            table: table.clone(),
                            column: column.clone(),
                        }
                    })?;
                    c.description = Some(text.clone());
                }
                DescriptionTarget::Index(index) => {
                    let ix = t
                        .indexes
                        .iter_mut()
                        .find(|ix| ix.name.eq_ignore_ascii_case(index))
                        .ok_or_else(|| ApplyError::UnknownObject {
                            table: table.clone(),
                            name: index.clone(),
                        })?;
                    ix.description = Some(text.clone());
                }
            }
        }
    }

    Ok(())
}

fn table_mut<'a>(
    schema: &'a mut DatabaseSchema,
    name: &str,
) -> Result<&'a mut stele_core::schema::TableSchema, ApplyError> {
    schema
        .get_table_mut(name)
        .ok_or_else(|| ApplyError::UnknownTable(name.to_string()))
}
