//! Model validation.
//!
//! Runs once over the complete table set, after every table has been built
//! and relationship inference has finished. Checking the whole set at once
//! lets foreign keys reference tables declared later in provider order.

use crate::error::{Result, SchemaError};
use crate::schema::TableSchema;

/// Validates a complete table set.
///
/// The first violation found aborts the run; the differ never sees a model
/// that failed validation.
pub fn validate(tables: &[TableSchema]) -> Result<()> {
    for table in tables {
        validate_table(table)?;
        validate_foreign_keys(table, tables)?;
    }
    Ok(())
}

fn validate_table(table: &TableSchema) -> Result<()> {
    // Column names are unique case-insensitively.
    for (i, col) in table.columns.iter().enumerate() {
        let duplicated = table.columns[..i]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&col.name));
        if duplicated {
            return Err(SchemaError::DuplicateColumn {
                table: table.name.clone(),
                column: col.name.clone(),
            });
        }

        if let Some(computed) = &col.computed {
            if col.identity {
                return Err(SchemaError::ComputedIdentity {
                    table: table.name.clone(),
                    column: col.name.clone(),
                });
            }
            if col.default.to_sql().is_some() {
                return Err(SchemaError::ComputedDefault {
                    table: table.name.clone(),
                    column: col.name.clone(),
                });
            }
            debug_assert!(!computed.expression.is_empty());
        }
    }

    if let Some(pk) = &table.primary_key {
        for key_col in &pk.columns {
            let column = table.get_column(key_col).ok_or_else(|| {
                SchemaError::MissingKeyColumn {
                    table: table.name.clone(),
                    constraint: pk.name.clone(),
                    column: key_col.clone(),
                }
            })?;

            // Identity is legal on a single-column key only.
            if column.identity && pk.columns.len() > 1 {
                return Err(SchemaError::CompositeIdentity {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_foreign_keys(table: &TableSchema, all: &[TableSchema]) -> Result<()> {
    for fk in &table.foreign_keys {
        for local in &fk.columns {
            if !table.has_column(local) {
                return Err(SchemaError::MissingForeignKeyColumn {
                    table: table.name.clone(),
                    constraint: fk.name.clone(),
                    column: local.clone(),
                });
            }
        }

        let target_exists = all
            .iter()
            .any(|t| t.name.eq_ignore_ascii_case(&fk.references_table));
        if !target_exists {
            return Err(SchemaError::UnknownReferencedTable {
                table: table.name.clone(),
                constraint: fk.name.clone(),
                target: fk.references_table.clone(),
            });
        }
    }
    Ok(())
}
