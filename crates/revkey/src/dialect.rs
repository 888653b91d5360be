use crate::{Error, QualifiedSequenceName, Result, SequenceDescriptor};

/// Statement hints prefixed to every refill query. The first forces a
/// read/write transaction for what looks like a read; the second keeps an
/// aborted-and-retried transaction from replaying the select, since a
/// sequence advances whether or not the transaction commits.
pub const REFILL_HINTS: &str = "/* spanner.force_read_write_transaction=true */ \
                                /* spanner.ignore_during_internal_retry=true */ ";

/// Largest pool the PostgreSQL interface can fetch in one statement.
pub const POSTGRESQL_MAX_POOL_SIZE: u32 = 1000;

const GOOGLE_SQL_RESERVED: &[&str] = &[
    "ALL", "AND", "ANY", "ARRAY", "AS", "ASC", "ASSERT_ROWS_MODIFIED", "AT", "BETWEEN", "BY",
    "CASE", "CAST", "COLLATE", "CONTAINS", "CREATE", "CROSS", "CUBE", "CURRENT", "DEFAULT",
    "DEFINE", "DESC", "DISTINCT", "ELSE", "END", "ENUM", "ESCAPE", "EXCEPT", "EXCLUDE", "EXISTS",
    "EXTRACT", "FALSE", "FETCH", "FOLLOWING", "FOR", "FROM", "FULL", "GROUP", "GROUPING",
    "GROUPS", "HASH", "HAVING", "IF", "IGNORE", "IN", "INNER", "INTERSECT", "INTERVAL", "INTO",
    "IS", "JOIN", "LATERAL", "LEFT", "LIKE", "LIMIT", "LOOKUP", "MERGE", "NATURAL", "NEW", "NO",
    "NOT", "NULL", "NULLS", "OF", "ON", "OR", "ORDER", "OUTER", "OVER", "PARTITION", "PRECEDING",
    "PROTO", "RANGE", "RECURSIVE", "RESPECT", "RIGHT", "ROLLUP", "ROWS", "SELECT", "SET", "SOME",
    "STRUCT", "TABLESAMPLE", "THEN", "TO", "TREAT", "TRUE", "UNBOUNDED", "UNION", "UNNEST",
    "USING", "WHEN", "WHERE", "WINDOW", "WITH", "WITHIN",
];

const POSTGRESQL_RESERVED: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH", "CASE",
    "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_CATALOG",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE", "FETCH",
    "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY", "INTERSECT", "INTO",
    "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT", "NULL", "OFFSET", "ON",
    "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES", "RETURNING", "SELECT",
    "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN", "TO", "TRAILING", "TRUE", "UNION",
    "UNIQUE", "USER", "USING", "VARIADIC", "WHEN", "WHERE", "WINDOW", "WITH",
];

/// Which SQL surface of the database is being targeted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DialectKind {
    GoogleSql,
    PostgreSql,
}

/// What the target database can and cannot express.
///
/// Operations the database structurally rejects are refused up front with
/// [`Error::UnsupportedDdlOperation`] rather than being emitted and failing
/// later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` is accepted.
    pub foreign_keys: bool,
    /// A single insert may target several tables at once.
    pub bulk_multi_table_insert: bool,
    /// Schema changes may be grouped between batch markers.
    pub batch_ddl: bool,
}

impl Capabilities {
    /// Foreign keys and batched DDL, but no multi-table inserts.
    pub const DEFAULT: Self = Self {
        foreign_keys: true,
        bulk_multi_table_insert: false,
        batch_ddl: true,
    };
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The strategy object for everything dialect specific: identifier quoting,
/// sequence SQL and the capability checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dialect {
    kind: DialectKind,
    capabilities: Capabilities,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::google_sql()
    }
}

impl From<DialectKind> for Dialect {
    fn from(kind: DialectKind) -> Self {
        match kind {
            DialectKind::GoogleSql => Self::google_sql(),
            DialectKind::PostgreSql => Self::postgresql(),
        }
    }
}

impl Dialect {
    /// The GoogleSQL surface with default capabilities.
    pub const fn google_sql() -> Self {
        Self {
            kind: DialectKind::GoogleSql,
            capabilities: Capabilities::DEFAULT,
        }
    }

    /// The PostgreSQL interface with default capabilities.
    pub const fn postgresql() -> Self {
        Self {
            kind: DialectKind::PostgreSql,
            capabilities: Capabilities::DEFAULT,
        }
    }

    /// Overrides the capability set, e.g. for a database version that lacks
    /// foreign keys.
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Which SQL surface this is.
    pub const fn kind(&self) -> DialectKind {
        self.kind
    }

    /// What the target database supports.
    pub const fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Character used to quote identifiers.
    pub const fn quote_char(&self) -> char {
        match self.kind {
            DialectKind::GoogleSql => '`',
            DialectKind::PostgreSql => '"',
        }
    }

    /// Returns `true` if `ident` must be quoted to be used as an
    /// identifier: it is a reserved word or not a plain
    /// `[A-Za-z_][A-Za-z0-9_]*` name.
    pub fn needs_quoting(&self, ident: &str) -> bool {
        let mut chars = ident.chars();
        let plain = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !plain {
            return true;
        }
        let reserved = match self.kind {
            DialectKind::GoogleSql => GOOGLE_SQL_RESERVED,
            DialectKind::PostgreSql => POSTGRESQL_RESERVED,
        };
        reserved.iter().any(|kw| kw.eq_ignore_ascii_case(ident))
    }

    /// Quotes `ident` only if it needs it.
    ///
    /// ```
    /// use revkey::Dialect;
    ///
    /// assert_eq!(Dialect::google_sql().quote("Singers"), "Singers");
    /// assert_eq!(Dialect::google_sql().quote("Order"), "`Order`");
    /// assert_eq!(Dialect::postgresql().quote("user"), "\"user\"");
    /// ```
    pub fn quote(&self, ident: &str) -> String {
        if self.needs_quoting(ident) {
            let q = self.quote_char();
            let escaped = ident.replace(q, &format!("{q}{q}"));
            format!("{q}{escaped}{q}")
        } else {
            ident.to_owned()
        }
    }

    /// Renders `name` as it appears in SQL, quoting each part only if needed.
    pub fn render_sequence_name(&self, name: &QualifiedSequenceName) -> String {
        match name.schema() {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(name.name())),
            None => self.quote(name.name()),
        }
    }

    /// The single statement that fetches a whole pool's worth of values.
    pub fn next_values_query(&self, descriptor: &SequenceDescriptor) -> String {
        let name = self.render_sequence_name(descriptor.name());
        let count = descriptor.pool_size();
        match self.kind {
            DialectKind::GoogleSql => format!(
                "{REFILL_HINTS} select get_next_sequence_value(sequence {name}) AS n \
                 from unnest(generate_array(1, {count}))"
            ),
            DialectKind::PostgreSql => {
                let columns = (0..count)
                    .map(|_| format!("nextval('{name}') as n"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{REFILL_HINTS} select {columns}")
            }
        }
    }

    /// Checks dialect-specific limits on a descriptor.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the pool is larger than the
    /// dialect can fetch in one round trip.
    pub fn validate_descriptor(&self, descriptor: &SequenceDescriptor) -> Result<()> {
        if self.kind == DialectKind::PostgreSql && descriptor.pool_size() > POSTGRESQL_MAX_POOL_SIZE
        {
            return Err(Error::configuration(format!(
                "pool size of sequence '{}' must not exceed {POSTGRESQL_MAX_POOL_SIZE} \
                 for PostgreSQL, got {}",
                descriptor.name(),
                descriptor.pool_size()
            )));
        }
        Ok(())
    }

    /// Checks that foreign key constraint `constraint` can be added.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedDdlOperation`] when foreign keys are not
    /// supported.
    pub fn ensure_foreign_keys(&self, constraint: &str) -> Result<()> {
        if self.capabilities.foreign_keys {
            return Ok(());
        }
        Err(Error::unsupported(
            format!("add foreign key {constraint}"),
            "foreign key constraints are not supported by the target database",
        ))
    }

    /// Primary keys are fixed at table creation on every supported dialect,
    /// so this always fails.
    ///
    /// # Errors
    /// Always returns [`Error::UnsupportedDdlOperation`].
    pub fn ensure_alter_primary_key(&self, table: &str) -> Result<()> {
        Err(Error::unsupported(
            format!("alter primary key of {table}"),
            "the primary key of an existing table cannot be changed",
        ))
    }

    /// Checks that one insert may write rows into several tables at once.
    /// Call it before building such an insert and fall back to one insert per
    /// table when it fails.
    ///
    /// ```
    /// use revkey::{Capabilities, Dialect, Error};
    ///
    /// let tables = ["Singers", "Albums"];
    /// let inserts = match Dialect::google_sql().ensure_bulk_multi_table_insert(&tables) {
    ///     Ok(()) => vec![format!("insert all into {}", tables.join(", "))],
    ///     Err(Error::UnsupportedDdlOperation { .. }) => tables
    ///         .iter()
    ///         .map(|table| format!("insert into {table}"))
    ///         .collect(),
    ///     Err(err) => return Err(err),
    /// };
    /// assert_eq!(inserts, ["insert into Singers", "insert into Albums"]);
    ///
    /// let bulk = Dialect::google_sql().with_capabilities(Capabilities {
    ///     bulk_multi_table_insert: true,
    ///     ..Capabilities::DEFAULT
    /// });
    /// assert!(bulk.ensure_bulk_multi_table_insert(&tables).is_ok());
    /// # Ok::<(), Error>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedDdlOperation`] when a single insert may not
    /// span several tables.
    pub fn ensure_bulk_multi_table_insert(&self, tables: &[&str]) -> Result<()> {
        if self.capabilities.bulk_multi_table_insert {
            return Ok(());
        }
        Err(Error::unsupported(
            format!("bulk insert into [{}]", tables.join(", ")),
            "multi-table bulk inserts are not supported by the target database",
        ))
    }
}
