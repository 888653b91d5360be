use std::collections::{BTreeMap, BTreeSet};

/// What a live database already contains for one table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ExistingTable {
    pub columns: BTreeSet<String>,
    /// `None` when the key is unknown; key changes are then not checked.
    pub primary_key: Option<Vec<String>>,
    pub indexes: BTreeSet<String>,
    pub foreign_keys: BTreeSet<String>,
}

impl ExistingTable {
    /// A table with nothing declared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a column that exists.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.insert(name.into());
        self
    }

    /// Records the live primary key, in key order.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Records an index that exists on this table.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.indexes.insert(name.into());
        self
    }

    /// Records a foreign key constraint that exists on this table.
    #[must_use]
    pub fn foreign_key(mut self, name: impl Into<String>) -> Self {
        self.foreign_keys.insert(name.into());
        self
    }
}

/// A read of the live database's schema, used to drop only what exists and
/// to create only what is missing.
///
/// Sequence names are stored as rendered, e.g. `billing.invoice_seq`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExistingSchema {
    pub tables: BTreeMap<String, ExistingTable>,
    pub sequences: BTreeSet<String>,
}

impl ExistingSchema {
    /// An empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a table that exists.
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: ExistingTable) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Records a sequence by its rendered name.
    #[must_use]
    pub fn with_sequence(mut self, name: impl Into<String>) -> Self {
        self.sequences.insert(name.into());
        self
    }

    /// The live definition of `name`, if it exists.
    pub fn table(&self, name: &str) -> Option<&ExistingTable> {
        self.tables.get(name)
    }

    /// Returns `true` if table `name` exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns `true` if `table` exists and has `column`.
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table).is_some_and(|t| t.columns.contains(column))
    }

    /// Returns `true` if `table` exists and has `index`.
    pub fn has_index(&self, table: &str, index: &str) -> bool {
        self.table(table).is_some_and(|t| t.indexes.contains(index))
    }

    /// Returns `true` if `table` exists and has the constraint `foreign_key`.
    pub fn has_foreign_key(&self, table: &str, foreign_key: &str) -> bool {
        self.table(table)
            .is_some_and(|t| t.foreign_keys.contains(foreign_key))
    }

    /// Returns `true` if a sequence with the rendered name `name` exists.
    pub fn has_sequence(&self, name: &str) -> bool {
        self.sequences.contains(name)
    }
}
