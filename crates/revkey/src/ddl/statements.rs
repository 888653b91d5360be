use crate::{
    Column, Dialect, DialectKind, ForeignKey, Index, Result, SchemaObject, SchemaObjectGraph,
    SequenceDescriptor, TableNode,
};

/// Renders individual DDL statements as literal text for one dialect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatementRenderer {
    dialect: Dialect,
}

impl StatementRenderer {
    /// A renderer quoting identifiers for `dialect`.
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect statements are rendered for.
    pub const fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Renders the create statement for any schema object.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedDdlOperation`] for a foreign key when the
    /// dialect lacks them.
    ///
    /// [`Error::UnsupportedDdlOperation`]: crate::Error::UnsupportedDdlOperation
    pub fn create_statement(
        &self,
        graph: &SchemaObjectGraph,
        object: SchemaObject<'_>,
    ) -> Result<String> {
        Ok(match object {
            SchemaObject::Sequence(descriptor) => self.create_sequence(descriptor),
            SchemaObject::Table(table) => self.create_table(graph, table),
            SchemaObject::Index { table, index } => self.create_index(table, index),
            SchemaObject::ForeignKey { table, foreign_key } => {
                self.add_foreign_key(table, foreign_key)?
            }
        })
    }

    /// Renders the drop statement for any schema object.
    pub fn drop_statement(&self, object: SchemaObject<'_>) -> String {
        match object {
            SchemaObject::Sequence(descriptor) => self.drop_sequence(descriptor),
            SchemaObject::Table(table) => self.drop_table(table),
            SchemaObject::Index { index, .. } => self.drop_index(index),
            SchemaObject::ForeignKey { table, foreign_key } => {
                self.drop_foreign_key(table, foreign_key)
            }
        }
    }

    /// `create table`, with the key resolved parent-first and the
    /// interleave clause when the table has a parent.
    pub fn create_table(&self, graph: &SchemaObjectGraph, table: &TableNode) -> String {
        let name = self.dialect.quote(&table.name);
        let columns = graph
            .columns(&table.name)
            .map(|column| self.column_definition(column))
            .collect::<Vec<_>>()
            .join(",");
        let keys = graph
            .key_columns(&table.name)
            .iter()
            .map(|k| self.dialect.quote(k))
            .collect::<Vec<_>>()
            .join(",");
        let interleave = table.interleave.as_ref().map(|interleave| {
            let cascade = if interleave.on_delete_cascade {
                " ON DELETE CASCADE"
            } else {
                ""
            };
            format!(
                "INTERLEAVE IN PARENT {}{cascade}",
                self.dialect.quote(&interleave.parent)
            )
        });

        match self.dialect.kind() {
            DialectKind::GoogleSql => {
                let interleave = interleave.map(|i| format!(", {i}")).unwrap_or_default();
                format!("create table {name} ({columns}) PRIMARY KEY ({keys}){interleave}")
            }
            DialectKind::PostgreSql => {
                let interleave = interleave.map(|i| format!(" {i}")).unwrap_or_default();
                format!("create table {name} ({columns},PRIMARY KEY ({keys})){interleave}")
            }
        }
    }

    /// `drop table`, without `if exists`.
    pub fn drop_table(&self, table: &TableNode) -> String {
        format!("drop table {}", self.dialect.quote(&table.name))
    }

    /// `create [unique] index` over the index's columns.
    pub fn create_index(&self, table: &TableNode, index: &Index) -> String {
        let unique = if index.unique { "unique " } else { "" };
        format!(
            "create {unique}index {} on {} ({})",
            self.dialect.quote(&index.name),
            self.dialect.quote(&table.name),
            self.column_list(&index.columns)
        )
    }

    /// `drop index` by name alone.
    pub fn drop_index(&self, index: &Index) -> String {
        format!("drop index {}", self.dialect.quote(&index.name))
    }

    /// Adds `foreign_key` to `table` as a named constraint.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedDdlOperation`] when the dialect lacks
    /// foreign keys.
    ///
    /// [`Error::UnsupportedDdlOperation`]: crate::Error::UnsupportedDdlOperation
    pub fn add_foreign_key(&self, table: &TableNode, foreign_key: &ForeignKey) -> Result<String> {
        self.dialect.ensure_foreign_keys(&foreign_key.name)?;
        Ok(format!(
            "alter table {} add constraint {} foreign key ({}) references {} ({})",
            self.dialect.quote(&table.name),
            self.dialect.quote(&foreign_key.name),
            self.column_list(&foreign_key.columns),
            self.dialect.quote(&foreign_key.referenced_table),
            self.column_list(&foreign_key.referenced_columns)
        ))
    }

    /// Drops the constraint from its owning table.
    pub fn drop_foreign_key(&self, table: &TableNode, foreign_key: &ForeignKey) -> String {
        format!(
            "alter table {} drop constraint {}",
            self.dialect.quote(&table.name),
            self.dialect.quote(&foreign_key.name)
        )
    }

    /// Adds `column` to an existing `table`.
    pub fn add_column(&self, table: &TableNode, column: &Column) -> String {
        format!(
            "alter table {} ADD COLUMN {}",
            self.dialect.quote(&table.name),
            self.column_definition(column)
        )
    }

    /// `create sequence` for a bit-reversed sequence. The start counter is
    /// only spelled out when it differs from 1, and the exclusion set is
    /// passed on as a single skip range spanning all of its ranges.
    pub fn create_sequence(&self, descriptor: &SequenceDescriptor) -> String {
        let name = self.dialect.render_sequence_name(descriptor.name());
        let start = descriptor.start_counter();
        let skip = descriptor.exclusions().bounds();

        match self.dialect.kind() {
            DialectKind::GoogleSql => {
                let mut options = vec![r#"sequence_kind="bit_reversed_positive""#.to_owned()];
                if start != 1 {
                    options.push(format!("start_with_counter={start}"));
                }
                if let Some((min, max)) = skip {
                    options.push(format!("skip_range_min={min}, skip_range_max={max}"));
                }
                format!("create sequence {name} options({})", options.join(", "))
            }
            DialectKind::PostgreSql => {
                let mut statement = format!("create sequence {name} bit_reversed_positive");
                if let Some((min, max)) = skip {
                    statement.push_str(&format!(" skip range {min} {max}"));
                }
                if start != 1 {
                    statement.push_str(&format!(" start counter with {start}"));
                }
                statement
            }
        }
    }

    /// `drop sequence` by rendered name.
    pub fn drop_sequence(&self, descriptor: &SequenceDescriptor) -> String {
        format!(
            "drop sequence {}",
            self.dialect.render_sequence_name(descriptor.name())
        )
    }

    fn column_definition(&self, column: &Column) -> String {
        let not_null = if column.nullable { "" } else { " not null" };
        format!(
            "{} {}{not_null}",
            self.dialect.quote(&column.name),
            column.sql_type
        )
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.dialect.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
