//! SQL Server dialect.
//!
//! Every generated statement carries its own existence guard
//! (`OBJECT_ID`, `COL_LENGTH`, `sys.indexes`), so a script assembled from
//! these statements can be applied repeatedly: objects that already match
//! are skipped by the guard rather than erroring the batch.

use stele_core::schema::{
    ColumnSchema, ForeignKeySchema, IndexSchema, PrimaryKeySchema, TableSchema, UniqueConstraint,
};

use crate::operations::{DescriptionTarget, MigrationOperation};

use super::SqlDialect;

/// Maximum total byte width of a SQL Server index key.
pub const MAX_INDEX_KEY_BYTES: u32 = 900;

/// Byte width an unbounded column is counted at when sizing index keys.
pub const UNBOUNDED_KEY_FALLBACK_BYTES: u32 = 900;

/// Widest `nvarchar` length that still fits an index key (900 bytes / 2).
pub const SAFE_UNICODE_KEY_CHARS: u16 = 450;

/// Widest single-byte text length that still fits an index key.
pub const SAFE_ANSI_KEY_CHARS: u16 = 900;

/// SQL Server migration dialect.
#[derive(Debug, Clone, Default)]
pub struct MssqlDialect;

impl MssqlDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn qualified(&self, schema: &str, table: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(schema),
            self.quote_identifier(table)
        )
    }

    /// `[Name] nvarchar(50) NOT NULL DEFAULT N'x'`, or the computed form.
    fn column_definition(&self, column: &ColumnSchema) -> String {
        let mut parts = vec![self.quote_identifier(&column.name)];

        if let Some(computed) = &column.computed {
            parts.push(format!("AS ({})", computed.expression));
            if computed.persisted {
                parts.push("PERSISTED".to_string());
            }
            return parts.join(" ");
        }

        parts.push(column.sql_type.type_name());

        if let Some(collation) = &column.collation {
            parts.push(format!("COLLATE {collation}"));
        }

        if column.identity {
            parts.push("IDENTITY(1,1)".to_string());
        }

        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());

        if let Some(default_sql) = column.default.to_sql() {
            parts.push(format!("DEFAULT {default_sql}"));
        }

        parts.join(" ")
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn create_table_sql(&self, table: &TableSchema) -> String {
        let target = self.qualified(&table.schema, &table.name);
        let mut body: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("    {}", self.column_definition(c)))
            .collect();

        if let Some(pk) = &table.primary_key {
            body.push(format!(
                "    CONSTRAINT {} PRIMARY KEY ({})",
                self.quote_identifier(&pk.name),
                self.column_list(&pk.columns)
            ));
        }

        format!(
            "IF OBJECT_ID(N'{target}', N'U') IS NULL\nBEGIN\nCREATE TABLE {target} (\n{}\n);\nEND",
            body.join(",\n")
        )
    }

    fn drop_table_sql(&self, schema: &str, name: &str) -> String {
        let target = self.qualified(schema, name);
        format!("IF OBJECT_ID(N'{target}', N'U') IS NOT NULL\n    DROP TABLE {target};")
    }

    fn add_column_sql(&self, schema: &str, table: &str, column: &ColumnSchema) -> String {
        let target = self.qualified(schema, table);
        format!(
            "IF COL_LENGTH(N'{schema}.{table}', N'{}') IS NULL\n    ALTER TABLE {target} ADD {};",
            column.name,
            self.column_definition(column)
        )
    }

    fn drop_column_sql(&self, schema: &str, table: &str, column: &str) -> String {
        let target = self.qualified(schema, table);
        format!(
            "IF COL_LENGTH(N'{schema}.{table}', N'{column}') IS NOT NULL\n    ALTER TABLE {target} DROP COLUMN {};",
            self.quote_identifier(column)
        )
    }

    /// `ALTER COLUMN` redefines type, collation and nullability in one
    /// statement; default constraints are managed separately because SQL
    /// Server stores them as named objects.
    fn alter_column_sql(
        &self,
        schema: &str,
        table: &str,
        column: &ColumnSchema,
        original: Option<&ColumnSchema>,
    ) -> Vec<String> {
        let target = self.qualified(schema, table);
        let mut parts = vec![
            self.quote_identifier(&column.name),
            column.sql_type.type_name(),
        ];
        if let Some(collation) = &column.collation {
            parts.push(format!("COLLATE {collation}"));
        }
        if column.identity {
            parts.push("IDENTITY(1,1)".to_string());
        }
        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());

        let mut statements = vec![format!(
            "ALTER TABLE {target} ALTER COLUMN {};",
            parts.join(" ")
        )];

        let old_default = original.and_then(|c| c.default.to_sql());
        let new_default = column.default.to_sql();
        if old_default != new_default {
            let df_name = format!("DF_{table}_{}", column.name);
            let df = self.quote_identifier(&df_name);
            statements.push(format!(
                "IF OBJECT_ID(N'{schema}.{df_name}', N'D') IS NOT NULL\n    ALTER TABLE {target} DROP CONSTRAINT {df};"
            ));
            if let Some(default_sql) = new_default {
                statements.push(format!(
                    "ALTER TABLE {target} ADD CONSTRAINT {df} DEFAULT {default_sql} FOR {};",
                    self.quote_identifier(&column.name)
                ));
            }
        }

        statements
    }

    fn add_constraint_sql(
        &self,
        schema: &str,
        table: &str,
        name: &str,
        object_type: &str,
        definition: &str,
    ) -> String {
        let target = self.qualified(schema, table);
        format!(
            "IF OBJECT_ID(N'{schema}.{name}', N'{object_type}') IS NULL\n    ALTER TABLE {target} ADD CONSTRAINT {} {definition};",
            self.quote_identifier(name)
        )
    }

    fn drop_constraint_sql(
        &self,
        schema: &str,
        table: &str,
        name: &str,
        object_type: &str,
    ) -> String {
        let target = self.qualified(schema, table);
        format!(
            "IF OBJECT_ID(N'{schema}.{name}', N'{object_type}') IS NOT NULL\n    ALTER TABLE {target} DROP CONSTRAINT {};",
            self.quote_identifier(name)
        )
    }

    fn add_primary_key_sql(&self, schema: &str, table: &str, pk: &PrimaryKeySchema) -> String {
        self.add_constraint_sql(
            schema,
            table,
            &pk.name,
            "PK",
            &format!("PRIMARY KEY ({})", self.column_list(&pk.columns)),
        )
    }

    fn add_unique_sql(&self, schema: &str, table: &str, constraint: &UniqueConstraint) -> String {
        self.add_constraint_sql(
            schema,
            table,
            &constraint.name,
            "UQ",
            &format!("UNIQUE ({})", self.column_list(&constraint.columns)),
        )
    }

    fn add_foreign_key_sql(&self, schema: &str, table: &str, fk: &ForeignKeySchema) -> String {
        let mut definition = format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.column_list(&fk.columns),
            self.qualified(schema, &fk.references_table),
            self.column_list(&fk.references_columns)
        );
        if fk.on_delete != stele_core::relation::ForeignKeyAction::NoAction {
            definition.push_str(&format!(" ON DELETE {}", fk.on_delete.to_sql()));
        }
        if fk.on_update != stele_core::relation::ForeignKeyAction::NoAction {
            definition.push_str(&format!(" ON UPDATE {}", fk.on_update.to_sql()));
        }
        self.add_constraint_sql(schema, table, &fk.name, "F", &definition)
    }

    fn create_index_sql(&self, schema: &str, table: &str, index: &IndexSchema) -> String {
        let target = self.qualified(schema, table);
        let ix = self.quote_identifier(&index.name);

        if index.fulltext {
            return format!(
                "IF NOT EXISTS (SELECT 1 FROM sys.fulltext_indexes WHERE [object_id] = OBJECT_ID(N'{schema}.{table}'))\n    CREATE FULLTEXT INDEX ON {target} ({});",
                self.column_list(&index.columns)
            );
        }

        let mut create = format!(
            "CREATE {}INDEX {ix} ON {target} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.column_list(&index.columns)
        );
        if !index.include_columns.is_empty() {
            create.push_str(&format!(
                " INCLUDE ({})",
                self.column_list(&index.include_columns)
            ));
        }
        if let Some(filter) = &index.filter {
            create.push_str(&format!(" WHERE {filter}"));
        }

        format!(
            "IF NOT EXISTS (SELECT 1 FROM sys.indexes WHERE [name] = N'{}' AND [object_id] = OBJECT_ID(N'{schema}.{table}'))\n    {create};",
            index.name
        )
    }

    fn drop_index_sql(&self, schema: &str, table: &str, name: &str) -> String {
        let target = self.qualified(schema, table);
        format!(
            "IF EXISTS (SELECT 1 FROM sys.indexes WHERE [name] = N'{name}' AND [object_id] = OBJECT_ID(N'{schema}.{table}'))\n    DROP INDEX {} ON {target};",
            self.quote_identifier(name)
        )
    }

    fn set_description_sql(
        &self,
        schema: &str,
        table: &str,
        target: &DescriptionTarget,
        text: &str,
    ) -> String {
        let value = text.replace('\'', "''");
        let mut exec = format!(
            "EXEC sys.sp_addextendedproperty @name = N'MS_Description', @value = N'{value}', \
             @level0type = N'SCHEMA', @level0name = N'{schema}', \
             @level1type = N'TABLE', @level1name = N'{table}'"
        );
        let (filter, minor) = match target {
            DescriptionTarget::Table => (String::new(), "AND [minor_id] = 0 ".to_string()),
            DescriptionTarget::Column(column) => {
                exec.push_str(&format!(
                    ", @level2type = N'COLUMN', @level2name = N'{column}'"
                ));
                (
                    format!(
                        "AND [minor_id] = COLUMNPROPERTY(OBJECT_ID(N'{schema}.{table}'), N'{column}', 'ColumnId') "
                    ),
                    String::new(),
                )
            }
            DescriptionTarget::Index(index) => {
                exec.push_str(&format!(
                    ", @level2type = N'INDEX', @level2name = N'{index}'"
                ));
                (String::new(), String::new())
            }
        };

        format!(
            "IF NOT EXISTS (SELECT 1 FROM sys.extended_properties WHERE [name] = N'MS_Description' \
             AND [major_id] = OBJECT_ID(N'{schema}.{table}') {minor}{filter})\n    {exec};"
        )
    }
}

impl SqlDialect for MssqlDialect {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn generate_sql(&self, operation: &MigrationOperation) -> Vec<String> {
        match operation {
            MigrationOperation::CreateTable { table } => vec![self.create_table_sql(table)],

            MigrationOperation::DropTable { schema, name } => {
                vec![self.drop_table_sql(schema, name)]
            }

            MigrationOperation::AddColumn {
                schema,
                table,
                column,
            } => vec![self.add_column_sql(schema, table, column)],

            MigrationOperation::AlterColumn {
                schema,
                table,
                column,
                original,
            } => self.alter_column_sql(schema, table, column, original.as_ref()),

            MigrationOperation::DropColumn {
                schema,
                table,
                column,
            } => vec![self.drop_column_sql(schema, table, column)],

            MigrationOperation::AddPrimaryKey {
                schema,
                table,
                primary_key,
            } => vec![self.add_primary_key_sql(schema, table, primary_key)],

            MigrationOperation::DropPrimaryKey {
                schema,
                table,
                name,
            } => vec![self.drop_constraint_sql(schema, table, name, "PK")],

            MigrationOperation::AddUniqueConstraint {
                schema,
                table,
                constraint,
            } => vec![self.add_unique_sql(schema, table, constraint)],

            MigrationOperation::DropUniqueConstraint {
                schema,
                table,
                name,
            } => vec![self.drop_constraint_sql(schema, table, name, "UQ")],

            MigrationOperation::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => vec![self.add_foreign_key_sql(schema, table, foreign_key)],

            MigrationOperation::DropForeignKey {
                schema,
                table,
                name,
            } => vec![self.drop_constraint_sql(schema, table, name, "F")],

            MigrationOperation::AddCheckConstraint {
                schema,
                table,
                check,
            } => vec![self.add_constraint_sql(
                schema,
                table,
                &check.name,
                "C",
                &format!("CHECK ({})", check.expression),
            )],

            MigrationOperation::DropCheckConstraint {
                schema,
                table,
                name,
            } => vec![self.drop_constraint_sql(schema, table, name, "C")],

            MigrationOperation::CreateIndex {
                schema,
                table,
                index,
            } => vec![self.create_index_sql(schema, table, index)],

            MigrationOperation::DropIndex {
                schema,
                table,
                name,
            } => vec![self.drop_index_sql(schema, table, name)],

            MigrationOperation::SetDescription {
                schema,
                table,
                target,
                text,
            } => vec![self.set_description_sql(schema, table, target, text)],
        }
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn batch_separator(&self) -> &'static str {
        "GO"
    }

    fn max_index_key_bytes(&self) -> u32 {
        MAX_INDEX_KEY_BYTES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stele_core::schema::DefaultValue;
    use stele_core::types::{SqlType, TextLength};

    fn dialect() -> MssqlDialect {
        MssqlDialect::new()
    }

    #[test]
    fn test_create_table() {
        let table = TableSchema::new("Customer")
            .column(ColumnSchema::new("Id", SqlType::Int).identity())
            .column(
                ColumnSchema::new("Name", SqlType::NVarChar(TextLength::Chars(50))).not_null(),
            )
            .primary_key(PrimaryKeySchema::auto("Customer", vec!["Id".to_string()]));

        let sql = dialect().generate_sql(&MigrationOperation::create_table(table));
        assert_eq!(sql.len(), 1);
        assert!(sql[0].contains("IF OBJECT_ID(N'[dbo].[Customer]', N'U') IS NULL"));
        assert!(sql[0].contains("CREATE TABLE [dbo].[Customer]"));
        assert!(sql[0].contains("[Id] int IDENTITY(1,1) NOT NULL"));
        assert!(sql[0].contains("[Name] nvarchar(50) NOT NULL"));
        assert!(sql[0].contains("CONSTRAINT [PK_Customer] PRIMARY KEY ([Id])"));
    }

    #[test]
    fn test_add_column_is_guarded() {
        let op = MigrationOperation::add_column(
            "dbo",
            "Customer",
            ColumnSchema::new("Email", SqlType::NVarChar(TextLength::Chars(100))),
        );

        let sql = dialect().generate_sql(&op);
        assert_eq!(sql.len(), 1);
        assert!(sql[0].contains("IF COL_LENGTH(N'dbo.Customer', N'Email') IS NULL"));
        assert!(sql[0].contains("ALTER TABLE [dbo].[Customer] ADD [Email] nvarchar(100) NULL"));
    }

    #[test]
    fn test_computed_column_definition() {
        let column = ColumnSchema::new("Total", SqlType::Decimal(18, 2)).computed("[Net] + [Tax]", true);
        assert_eq!(
            dialect().column_definition(&column),
            "[Total] AS ([Net] + [Tax]) PERSISTED"
        );
    }

    #[test]
    fn test_alter_column_replaces_default_constraint() {
        let op = MigrationOperation::alter_column(
            "dbo",
            "Customer",
            ColumnSchema::new("Active", SqlType::Bit)
                .not_null()
                .default(DefaultValue::Bool(true)),
            Some(ColumnSchema::new("Active", SqlType::Bit).not_null()),
        );

        let sql = dialect().generate_sql(&op);
        assert_eq!(sql.len(), 3);
        assert!(sql[0].contains("ALTER COLUMN [Active] bit NOT NULL"));
        assert!(sql[1].contains("DROP CONSTRAINT [DF_Customer_Active]"));
        assert!(sql[2].contains("ADD CONSTRAINT [DF_Customer_Active] DEFAULT 1 FOR [Active]"));
    }

    #[test]
    fn test_foreign_key_with_cascade() {
        let fk = ForeignKeySchema::single("FK_Order_Customer", "CustomerId", "Customer", "Id")
            .on_delete(stele_core::relation::ForeignKeyAction::Cascade);
        let op = MigrationOperation::add_foreign_key("dbo", "Order", fk);

        let sql = dialect().generate_sql(&op);
        assert!(sql[0].contains("IF OBJECT_ID(N'dbo.FK_Order_Customer', N'F') IS NULL"));
        assert!(sql[0].contains(
            "ADD CONSTRAINT [FK_Order_Customer] FOREIGN KEY ([CustomerId]) \
             REFERENCES [dbo].[Customer] ([Id]) ON DELETE CASCADE"
        ));
    }

    #[test]
    fn test_create_index_with_include_and_filter() {
        let index = IndexSchema::new(
            "IX_Order_CustomerId",
            vec!["CustomerId".to_string()],
        )
        .include(vec!["PlacedAt".to_string()])
        .filter("[CustomerId] IS NOT NULL");
        let op = MigrationOperation::create_index("dbo", "Order", index);

        let sql = dialect().generate_sql(&op);
        assert!(sql[0].contains("IF NOT EXISTS (SELECT 1 FROM sys.indexes"));
        assert!(sql[0].contains(
            "CREATE INDEX [IX_Order_CustomerId] ON [dbo].[Order] ([CustomerId]) \
             INCLUDE ([PlacedAt]) WHERE [CustomerId] IS NOT NULL"
        ));
    }

    #[test]
    fn test_drop_index() {
        let sql = dialect().generate_sql(&MigrationOperation::drop_index(
            "dbo",
            "Order",
            "IX_Order_CustomerId",
        ));
        assert!(sql[0].contains("DROP INDEX [IX_Order_CustomerId] ON [dbo].[Order]"));
    }

    #[test]
    fn test_description_statement() {
        let op = MigrationOperation::set_description(
            "dbo",
            "Customer",
            DescriptionTarget::Column("Email".to_string()),
            "Primary contact address",
        );

        let sql = dialect().generate_sql(&op);
        assert!(sql[0].contains("sp_addextendedproperty"));
        assert!(sql[0].contains("@level2type = N'COLUMN', @level2name = N'Email'"));
        assert!(sql[0].contains("N'Primary contact address'"));
    }

    #[test]
    fn test_quote_identifier_escapes_brackets() {
        assert_eq!(dialect().quote_identifier("odd]name"), "[odd]]name]");
    }
}
