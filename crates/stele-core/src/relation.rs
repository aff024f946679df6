//! Relationship metadata.
//!
//! Providers hand over flat [`NavigationHint`]s alongside each table; the
//! inference pass in `stele-migrate` turns those into foreign keys and
//! [`Relationship`] records, synthesizing join tables for many-to-many
//! pairs.

use serde::{Deserialize, Serialize};

/// Foreign key referential action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ForeignKeyAction {
    /// No action (error if the referenced row is deleted/updated).
    #[default]
    NoAction,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub const fn to_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// A raw navigation/reference hint attached to a table by the provider.
///
/// A non-collection hint named `Customer` pairs with a `CustomerId` column
/// to produce a foreign key; a collection hint declares the inverse side of
/// a one-to-many or many-to-many association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationHint {
    /// Navigation name as declared (`Customer`, `Orders`).
    pub name: String,
    /// Target table name.
    pub target: String,
    /// Whether this navigation is a collection (the "many" side).
    pub collection: bool,
    /// Explicit foreign key column, overriding the `<name>Id` convention.
    pub fk_column: Option<String>,
    /// Delete behavior for the foreign key this hint produces.
    pub on_delete: ForeignKeyAction,
}

impl NavigationHint {
    /// Creates a single-reference hint (`name` points at one `target` row).
    #[must_use]
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            collection: false,
            fk_column: None,
            on_delete: ForeignKeyAction::NoAction,
        }
    }

    /// Creates a collection hint (`name` holds many `target` rows).
    #[must_use]
    pub fn collection(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            collection: true,
            fk_column: None,
            on_delete: ForeignKeyAction::NoAction,
        }
    }

    /// Overrides the conventional `<name>Id` foreign key column.
    #[must_use]
    pub fn fk_column(mut self, column: impl Into<String>) -> Self {
        self.fk_column = Some(column.into());
        self
    }

    /// Sets the delete behavior.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// The foreign key column this hint maps to (`Customer` → `CustomerId`
    /// unless overridden).
    #[must_use]
    pub fn fk_column_name(&self) -> String {
        self.fk_column
            .clone()
            .unwrap_or_else(|| format!("{}Id", self.name))
    }
}

/// Cardinality of an inferred association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Each side owns at most one row of the other.
    OneToOne,
    /// The source owns many target rows.
    OneToMany,
    /// Many source rows reference one target row.
    ManyToOne,
    /// Realized through a join table.
    ManyToMany,
}

impl RelationshipKind {
    /// Whether two kinds describe the same association seen from opposite
    /// ends (`OneToMany` vs `ManyToOne`).
    #[must_use]
    pub const fn is_inverse_of(&self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::OneToMany, Self::ManyToOne) | (Self::ManyToOne, Self::OneToMany)
        )
    }
}

/// An inferred association between two tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Owning (source) table.
    pub source: String,
    /// Target table.
    pub target: String,
    /// Cardinality seen from the source.
    pub kind: RelationshipKind,
    /// Navigation name on the source side, when declared.
    pub source_navigation: Option<String>,
    /// Navigation name on the target side, when declared.
    pub target_navigation: Option<String>,
    /// Delete behavior carried onto the realizing foreign key.
    pub on_delete: ForeignKeyAction,
    /// Join table realizing a many-to-many association.
    pub join_table: Option<String>,
    /// True when the join table was synthesized rather than declared.
    pub synthesized_join: bool,
}

impl Relationship {
    /// Creates a relationship record between two tables.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
            source_navigation: None,
            target_navigation: None,
            on_delete: ForeignKeyAction::NoAction,
            join_table: None,
            synthesized_join: false,
        }
    }

    /// Sets the navigation names on both ends.
    #[must_use]
    pub fn navigations(
        mut self,
        source: Option<impl Into<String>>,
        target: Option<impl Into<String>>,
    ) -> Self {
        self.source_navigation = source.map(Into::into);
        self.target_navigation = target.map(Into::into);
        self
    }

    /// Sets the delete behavior.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Attaches the join table realizing this association.
    #[must_use]
    pub fn join_table(mut self, name: impl Into<String>, synthesized: bool) -> Self {
        self.join_table = Some(name.into());
        self.synthesized_join = synthesized;
        self
    }

    /// Whether this relationship connects the same (unordered) pair of
    /// tables as `source`/`target`, case-insensitively.
    #[must_use]
    pub fn links_pair(&self, a: &str, b: &str) -> bool {
        let fwd = self.source.eq_ignore_ascii_case(a) && self.target.eq_ignore_ascii_case(b);
        let rev = self.source.eq_ignore_ascii_case(b) && self.target.eq_ignore_ascii_case(a);
        fwd || rev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fk_column_name_convention() {
        let hint = NavigationHint::reference("Customer", "Customer");
        assert_eq!(hint.fk_column_name(), "CustomerId");

        let hint = NavigationHint::reference("Owner", "User").fk_column("OwnerUserId");
        assert_eq!(hint.fk_column_name(), "OwnerUserId");
    }

    #[test]
    fn test_links_pair_is_symmetric() {
        let rel = Relationship::new("Order", "Customer", RelationshipKind::ManyToOne);
        assert!(rel.links_pair("customer", "order"));
        assert!(rel.links_pair("Order", "Customer"));
        assert!(!rel.links_pair("Order", "Product"));
    }

    #[test]
    fn test_inverse_kinds() {
        assert!(RelationshipKind::OneToMany.is_inverse_of(RelationshipKind::ManyToOne));
        assert!(!RelationshipKind::OneToOne.is_inverse_of(RelationshipKind::OneToOne));
    }
}
