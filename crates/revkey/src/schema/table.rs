/// A column declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Column {
    pub name: String,
    /// The column type exactly as the target dialect spells it, e.g.
    /// `INT64` or `STRING(MAX)`.
    pub sql_type: String,
    #[cfg_attr(feature = "serde", serde(default = "nullable_default"))]
    pub nullable: bool,
}

#[cfg(feature = "serde")]
const fn nullable_default() -> bool {
    true
}

impl Column {
    /// A nullable column.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
        }
    }

    /// Marks the column `not null`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A secondary index declared on a table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub unique: bool,
}

impl Index {
    /// A non-unique index over `columns`, in order.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A classic foreign-key constraint. These never take part in the
/// interleaving order; they are added once every table exists and removed
/// before any table is dropped.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// A constraint from `columns` to the same number of `referenced_columns`.
    pub fn new<I, J, S>(
        name: impl Into<String>,
        columns: I,
        referenced_table: impl Into<String>,
        referenced_columns: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_table: referenced_table.into(),
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Physical co-location of a table's rows with its parent's.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Interleave {
    pub parent: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_delete_cascade: bool,
}

/// One declared table.
///
/// `primary_key` lists only the table's own key columns; the key columns of
/// interleaved ancestors are prepended when the schema graph is built.
///
/// ```
/// use revkey::{Column, Index, TableNode};
///
/// let albums = TableNode::new("Albums")
///     .column(Column::new("AlbumId", "INT64").not_null())
///     .column(Column::new("Title", "STRING(MAX)"))
///     .primary_key(["AlbumId"])
///     .interleave_in("Singers", true)
///     .index(Index::new("AlbumsByTitle", ["Title"]));
///
/// assert_eq!(albums.parent(), Some("Singers"));
/// assert_eq!(albums.index_names().collect::<Vec<_>>(), ["AlbumsByTitle"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TableNode {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub columns: Vec<Column>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub primary_key: Vec<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub interleave: Option<Interleave>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub indexes: Vec<Index>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableNode {
    /// A table with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a declared column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the table's own key columns. Ancestor key columns are prepended
    /// when the graph is built.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Interleaves the table in `parent`.
    #[must_use]
    pub fn interleave_in(mut self, parent: impl Into<String>, on_delete_cascade: bool) -> Self {
        self.interleave = Some(Interleave {
            parent: parent.into(),
            on_delete_cascade,
        });
        self
    }

    /// Adds a secondary index.
    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key constraint.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// The interleaved parent, if any.
    pub fn parent(&self) -> Option<&str> {
        self.interleave.as_ref().map(|i| i.parent.as_str())
    }

    /// Names of the table's secondary indexes.
    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|i| i.name.as_str())
    }

    /// Names of the table's foreign key constraints.
    pub fn foreign_key_names(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys.iter().map(|fk| fk.name.as_str())
    }

    /// Looks up a declared column by name.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}
