//! Schema representation types.
//!
//! These types describe the structure of database tables and are shared by
//! the desired-schema provider (what the application declares) and the live
//! snapshot reader (what the database currently has). They are plain values:
//! construction happens once per run, and after the inference and ordering
//! passes both snapshots are treated as read-only by the differ.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::relation::{ForeignKeyAction, NavigationHint, Relationship};
use crate::types::SqlType;

/// Default value for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum DefaultValue {
    /// No default value.
    #[default]
    None,
    /// Boolean default.
    Bool(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// SQL expression (e.g. `SYSUTCDATETIME()`).
    Expression(String),
}

impl DefaultValue {
    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(format!("N'{}'", s.replace('\'', "''"))),
            Self::Expression(expr) => Some(expr.clone()),
        }
    }
}

/// A computed column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedSpec {
    /// The computation expression.
    pub expression: String,
    /// Whether the value is persisted to storage.
    pub persisted: bool,
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// SQL data type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether this column is an `IDENTITY` column.
    pub identity: bool,
    /// Default value.
    pub default: DefaultValue,
    /// Computed column definition, if any.
    pub computed: Option<ComputedSpec>,
    /// Explicit collation, if any.
    pub collation: Option<String>,
    /// Extended description emitted as an `MS_Description` property.
    pub description: Option<String>,
}

impl ColumnSchema {
    /// Creates a new nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            identity: false,
            default: DefaultValue::None,
            computed: None,
            collation: None,
            description: None,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as `IDENTITY`.
    #[must_use]
    pub fn identity(mut self) -> Self {
        self.identity = true;
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = value;
        self
    }

    /// Makes this a computed column.
    #[must_use]
    pub fn computed(mut self, expression: impl Into<String>, persisted: bool) -> Self {
        self.computed = Some(ComputedSpec {
            expression: expression.into(),
            persisted,
        });
        self
    }

    /// Sets an explicit collation.
    #[must_use]
    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Primary key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeySchema {
    /// Constraint name.
    pub name: String,
    /// Ordered key columns.
    pub columns: Vec<String>,
    /// True when the name was generated rather than declared; name-only
    /// differences on auto-named keys are cosmetic.
    pub auto_named: bool,
}

impl PrimaryKeySchema {
    /// Creates a primary key over the given columns with the conventional
    /// `PK_<table>` name.
    #[must_use]
    pub fn auto(table: &str, columns: Vec<String>) -> Self {
        Self {
            name: format!("PK_{table}"),
            columns,
            auto_named: true,
        }
    }

    /// Creates a primary key with an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            auto_named: false,
        }
    }
}

/// Schema definition for a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueConstraint {
    /// Constraint name.
    pub name: String,
    /// Columns that form the unique constraint.
    pub columns: Vec<String>,
}

/// Schema definition for a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    /// Constraint name.
    pub name: String,
    /// Column(s) in the referencing table.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub references_table: String,
    /// Referenced column(s).
    pub references_columns: Vec<String>,
    /// Action on delete.
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    pub on_update: ForeignKeyAction,
}

impl ForeignKeySchema {
    /// Creates a single-column foreign key with default actions.
    #[must_use]
    pub fn single(
        name: impl Into<String>,
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: vec![column.into()],
            references_table: references_table.into(),
            references_columns: vec![references_column.into()],
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// Schema definition for a check constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,
    /// The boolean SQL expression.
    pub expression: String,
    /// Columns the expression references.
    pub columns: Vec<String>,
}

impl CheckConstraint {
    /// Creates a check constraint.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        expression: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            columns,
        }
    }
}

/// Schema definition for an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Key columns.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    pub unique: bool,
    /// Non-key columns carried in the leaf level (`INCLUDE`).
    pub include_columns: Vec<String>,
    /// Partial index condition (filtered index `WHERE` clause).
    pub filter: Option<String>,
    /// Whether this is a full-text index.
    pub fulltext: bool,
    /// Extended description emitted as an `MS_Description` property.
    pub description: Option<String>,
}

impl IndexSchema {
    /// Creates a non-unique index over the given columns.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
            include_columns: Vec::new(),
            filter: None,
            fulltext: false,
            description: None,
        }
    }

    /// Makes this a unique index.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Adds INCLUDE columns.
    #[must_use]
    pub fn include(mut self, columns: Vec<String>) -> Self {
        self.include_columns = columns;
        self
    }

    /// Sets a filter condition.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filter = Some(condition.into());
        self
    }
}

/// Complete schema definition for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Schema (namespace) the table lives in.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Ordered column definitions.
    pub columns: Vec<ColumnSchema>,
    /// Primary key, if any.
    pub primary_key: Option<PrimaryKeySchema>,
    /// Unique constraint definitions.
    pub unique_constraints: Vec<UniqueConstraint>,
    /// Foreign key definitions.
    pub foreign_keys: Vec<ForeignKeySchema>,
    /// Check constraint definitions.
    pub check_constraints: Vec<CheckConstraint>,
    /// Index definitions.
    pub indexes: Vec<IndexSchema>,
    /// Raw navigation hints, consumed by relationship inference.
    pub navigations: Vec<NavigationHint>,
    /// Inferred relationships; populated by the inference pass.
    pub relationships: Vec<Relationship>,
    /// Extended description emitted as an `MS_Description` property.
    pub description: Option<String>,
}

impl TableSchema {
    /// Creates a new table in the default `dbo` schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: "dbo".to_string(),
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            check_constraints: Vec::new(),
            indexes: Vec::new(),
            navigations: Vec::new(),
            relationships: Vec::new(),
            description: None,
        }
    }

    /// The sentinel for a table that does not exist in the live database:
    /// zero columns, zero constraints. Diffing against it produces the
    /// full CREATE path rather than an ALTER sequence.
    #[must_use]
    pub fn absent(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let mut table = Self::new(name);
        table.schema = schema.into();
        table
    }

    /// Whether this is the "table does not exist" sentinel.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.columns.is_empty() && self.primary_key.is_none() && self.indexes.is_empty()
    }

    /// Moves the table into a different schema.
    #[must_use]
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// `schema.name`, used for memoization keys and logging.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key.
    #[must_use]
    pub fn primary_key(mut self, pk: PrimaryKeySchema) -> Self {
        self.primary_key = Some(pk);
        self
    }

    /// Adds a unique constraint.
    #[must_use]
    pub fn unique_constraint(mut self, constraint: UniqueConstraint) -> Self {
        self.unique_constraints.push(constraint);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeySchema) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Adds a check constraint.
    #[must_use]
    pub fn check_constraint(mut self, check: CheckConstraint) -> Self {
        self.check_constraints.push(check);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a navigation hint.
    #[must_use]
    pub fn navigation(mut self, hint: NavigationHint) -> Self {
        self.navigations.push(hint);
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Gets a column by name (case-insensitive).
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Gets a mutable column by name (case-insensitive).
    #[must_use]
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnSchema> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Whether a column exists (case-insensitive).
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// The foreign key whose local column list is exactly `[column]`, if
    /// one exists.
    #[must_use]
    pub fn fk_on_column(&self, column: &str) -> Option<&ForeignKeySchema> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.columns.len() == 1 && fk.columns[0].eq_ignore_ascii_case(column))
    }

    /// Whether `column` is covered by a unique constraint, a unique index,
    /// or the primary key.
    #[must_use]
    pub fn column_is_unique_or_key(&self, column: &str) -> bool {
        let in_pk = self
            .primary_key
            .as_ref()
            .is_some_and(|pk| pk.columns.iter().any(|c| c.eq_ignore_ascii_case(column)));
        let in_unique = self.unique_constraints.iter().any(|uc| {
            uc.columns.len() == 1 && uc.columns[0].eq_ignore_ascii_case(column)
        });
        let in_unique_index = self.indexes.iter().any(|ix| {
            ix.unique && ix.columns.len() == 1 && ix.columns[0].eq_ignore_ascii_case(column)
        });
        in_pk || in_unique || in_unique_index
    }

    /// Whether any index (or the primary key) covers `column` as a key
    /// column.
    #[must_use]
    pub fn column_is_indexed(&self, column: &str) -> bool {
        let in_pk = self
            .primary_key
            .as_ref()
            .is_some_and(|pk| pk.columns.iter().any(|c| c.eq_ignore_ascii_case(column)));
        let in_index = self
            .indexes
            .iter()
            .any(|ix| ix.columns.iter().any(|c| c.eq_ignore_ascii_case(column)));
        in_pk || in_index
    }
}

/// A complete schema snapshot (all tables at one point in time).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// All tables in the snapshot.
    pub tables: Vec<TableSchema>,
}

impl DatabaseSchema {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot from a table set.
    #[must_use]
    pub fn from_tables(tables: Vec<TableSchema>) -> Self {
        Self { tables }
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.push(table);
        self
    }

    /// Gets a table by name (case-insensitive).
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Gets a mutable table by name (case-insensitive).
    #[must_use]
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut TableSchema> {
        self.tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Returns table names in snapshot order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Serializes the snapshot to JSON. Snapshots are the exchange format
    /// between the provider/reader processes and the engine.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads a snapshot back from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
