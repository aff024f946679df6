//! Snapshot source contracts and parallel gathering.
//!
//! The engine never reads application metadata or database catalogs
//! itself; both sides arrive as [`TableSchema`] sets through these
//! contracts. Building per-entity snapshots is side-effect-free and
//! embarrassingly parallel, so a bounded-concurrency gather helper is
//! provided; results arrive unordered and callers re-impose the dependency
//! sorter's order afterwards.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use stele_core::error::SchemaError;
use stele_core::schema::TableSchema;

/// Produces the desired schema model.
///
/// Implementations resolve application-level entity declarations into
/// tables with raw navigation hints; relationship inference has *not* run
/// yet when tables leave this contract.
pub trait SchemaSource {
    /// Yields the full desired table set.
    fn desired_schema(&self) -> Result<Vec<TableSchema>, SchemaError>;
}

/// Reads the live structural snapshot of single tables.
pub trait TableReader {
    /// Returns the live snapshot of `schema.name`, or the absent sentinel
    /// (zero columns, zero constraints) when the table does not exist,
    /// signalling "create" rather than "alter".
    fn current_table(&self, schema: &str, name: &str) -> Result<TableSchema, SchemaError>;
}

/// Runs blocking per-entity snapshot builders with a bounded concurrency
/// limit and collects their tables, unordered.
///
/// The first builder error aborts the gather. A `limit` of zero is treated
/// as one.
pub async fn gather_tables<F>(builders: Vec<F>, limit: usize) -> Result<Vec<TableSchema>, SchemaError>
where
    F: FnOnce() -> Result<TableSchema, SchemaError> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();

    for builder in builders {
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SchemaError::Provider(format!("gather aborted: {e}")))?;
            tokio::task::spawn_blocking(builder)
                .await
                .map_err(|e| SchemaError::Provider(format!("snapshot task failed: {e}")))?
        });
    }

    let mut tables = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        let table =
            joined.map_err(|e| SchemaError::Provider(format!("snapshot task failed: {e}")))??;
        debug!(table = %table.qualified_name(), "snapshot gathered");
        tables.push(table);
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use stele_core::schema::ColumnSchema;
    use stele_core::types::SqlType;

    fn builder(name: String) -> impl FnOnce() -> Result<TableSchema, SchemaError> + Send {
        move || {
            Ok(TableSchema::new(name).column(ColumnSchema::new("Id", SqlType::Int).identity()))
        }
    }

    #[tokio::test]
    async fn test_gather_collects_all_tables() {
        let builders: Vec<_> = (0..12).map(|i| builder(format!("Table{i}"))).collect();
        let tables = gather_tables(builders, 3).await.unwrap();

        assert_eq!(tables.len(), 12);
        let names: HashSet<String> = tables.iter().map(|t| t.name.clone()).collect();
        assert_eq!(names.len(), 12);
    }

    #[tokio::test]
    async fn test_gather_surfaces_builder_error() {
        let ok = builder("Good".to_string());
        let failing =
            move || -> Result<TableSchema, SchemaError> {
                Err(SchemaError::Provider("metadata unavailable".to_string()))
            };

        let result = gather_tables(
            vec![
                Box::new(ok) as Box<dyn FnOnce() -> Result<TableSchema, SchemaError> + Send>,
                Box::new(failing),
            ],
            2,
        )
        .await;

        assert!(matches!(result, Err(SchemaError::Provider(_))));
    }

    #[tokio::test]
    async fn test_zero_limit_is_clamped() {
        let tables = gather_tables(vec![builder("Solo".to_string())], 0)
            .await
            .unwrap();
        assert_eq!(tables.len(), 1);
    }
}
