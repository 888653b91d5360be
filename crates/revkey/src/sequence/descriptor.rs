use core::fmt;

use crate::{Dialect, Error, ExclusionRangeSet, Result};

/// Pool size used when none is configured.
pub const DEFAULT_POOL_SIZE: u32 = 50;

/// First raw counter used when none is configured.
pub const DEFAULT_START_COUNTER: u64 = 1;

/// A sequence name with an optional schema qualifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualifiedSequenceName {
    schema: Option<String>,
    name: String,
}

impl QualifiedSequenceName {
    /// Builds a name from its parts. A blank schema means "unqualified".
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `name` is blank.
    pub fn new(schema: Option<&str>, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::configuration("sequence name must not be empty"));
        }
        let schema = schema
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        Ok(Self {
            schema,
            name: name.to_owned(),
        })
    }

    /// Resolves a possibly dotted name. `"billing.invoice_seq"` carries its
    /// own schema; otherwise `default_schema` applies.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if either part is blank.
    pub fn resolve(name: &str, default_schema: Option<&str>) -> Result<Self> {
        match name.trim().split_once('.') {
            Some((schema, _)) if schema.trim().is_empty() => Err(Error::configuration(format!(
                "sequence name '{name}' has an empty schema qualifier"
            ))),
            Some((schema, unqualified)) => Self::new(Some(schema), unqualified),
            None => Self::new(default_schema, name),
        }
    }

    /// The schema qualifier, if any.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// The unqualified name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for QualifiedSequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Declarative sequence metadata, as it arrives from entity mappings or a
/// snapshot file.
///
/// Numeric fields are signed so that nonsense such as a negative pool size is
/// reported as a configuration error instead of failing to deserialize.
///
/// # Example
/// ```
/// use revkey::SequenceConfig;
///
/// let descriptor = SequenceConfig::new("ticket_sale_seq")
///     .start_with_counter(50_000)
///     .exclude_range("[1,1000]")
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.start_counter(), 50_000);
/// assert_eq!(descriptor.pool_size(), 50);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct SequenceConfig {
    pub sequence_name: String,
    pub schema: String,
    pub start_with_counter: i64,
    pub pool_size: i64,
    pub exclude_range: String,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            sequence_name: String::new(),
            schema: String::new(),
            start_with_counter: DEFAULT_START_COUNTER as i64,
            pool_size: i64::from(DEFAULT_POOL_SIZE),
            exclude_range: String::new(),
        }
    }
}

impl SequenceConfig {
    /// Metadata for `sequence_name` with every other field at its default.
    pub fn new(sequence_name: impl Into<String>) -> Self {
        Self {
            sequence_name: sequence_name.into(),
            ..Self::default()
        }
    }

    /// Default schema for an unqualified name.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    #[must_use]
    pub const fn start_with_counter(mut self, start: i64) -> Self {
        self.start_with_counter = start;
        self
    }

    /// Values to fetch per round trip.
    #[must_use]
    pub const fn pool_size(mut self, pool_size: i64) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Counter ranges never to issue, in `[from,to];[from,to]` form.
    #[must_use]
    pub fn exclude_range(mut self, spec: impl Into<String>) -> Self {
        self.exclude_range = spec.into();
        self
    }

    /// Validates the metadata and produces an immutable descriptor.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the name is missing, the start
    /// counter or pool size is not positive, or the exclusion spec is
    /// malformed.
    pub fn build(&self) -> Result<SequenceDescriptor> {
        let name = QualifiedSequenceName::resolve(&self.sequence_name, Some(&self.schema))?;

        if self.start_with_counter <= 0 {
            return Err(Error::configuration(format!(
                "start counter of sequence '{name}' must be positive, got {}",
                self.start_with_counter
            )));
        }
        if self.pool_size <= 0 {
            return Err(Error::configuration(format!(
                "pool size of sequence '{name}' must be positive, got {}",
                self.pool_size
            )));
        }
        let pool_size = u32::try_from(self.pool_size).map_err(|_| {
            Error::configuration(format!(
                "pool size of sequence '{name}' must not exceed {}, got {}",
                u32::MAX,
                self.pool_size
            ))
        })?;

        Ok(SequenceDescriptor {
            name,
            start_counter: self.start_with_counter.unsigned_abs(),
            pool_size,
            exclusions: ExclusionRangeSet::parse(&self.exclude_range)?,
        })
    }

    /// Like [`build`](Self::build), but also applies the limits of the
    /// dialect the descriptor will be allocated through.
    ///
    /// ```
    /// use revkey::{Dialect, SequenceConfig};
    ///
    /// let config = SequenceConfig::new("s").pool_size(5000);
    /// assert!(config.build_for(&Dialect::google_sql()).is_ok());
    /// assert!(config.build_for(&Dialect::postgresql()).is_err());
    /// ```
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] for anything [`build`](Self::build)
    /// rejects, or if the pool is larger than `dialect` can fetch in one
    /// round trip.
    pub fn build_for(&self, dialect: &Dialect) -> Result<SequenceDescriptor> {
        let descriptor = self.build()?;
        dialect.validate_descriptor(&descriptor)?;
        Ok(descriptor)
    }
}

impl TryFrom<SequenceConfig> for SequenceDescriptor {
    type Error = Error;

    fn try_from(config: SequenceConfig) -> Result<Self> {
        config.build()
    }
}

/// The validated identity of one backing database sequence.
///
/// Two descriptors are the same pool key only if every field matches, so the
/// same sequence name in different schemas never shares a pool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SequenceDescriptor {
    name: QualifiedSequenceName,
    start_counter: u64,
    pool_size: u32,
    exclusions: ExclusionRangeSet,
}

impl SequenceDescriptor {
    /// A descriptor with default start counter, pool size and no
    /// exclusions.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `name` is blank.
    pub fn new(name: &str) -> Result<Self> {
        SequenceConfig::new(name).build()
    }

    /// The backing sequence.
    pub const fn name(&self) -> &QualifiedSequenceName {
        &self.name
    }

    /// First raw counter the backing sequence hands out.
    pub const fn start_counter(&self) -> u64 {
        self.start_counter
    }

    /// Values fetched per round trip.
    pub const fn pool_size(&self) -> u32 {
        self.pool_size
    }

    /// Raw counters that are never turned into keys.
    pub const fn exclusions(&self) -> &ExclusionRangeSet {
        &self.exclusions
    }

    /// Converts back into declarative form.
    pub fn to_config(&self) -> SequenceConfig {
        SequenceConfig {
            sequence_name: self.name.name().to_owned(),
            schema: self.name.schema().unwrap_or_default().to_owned(),
            start_with_counter: i64::try_from(self.start_counter).unwrap_or(i64::MAX),
            pool_size: i64::from(self.pool_size),
            exclude_range: self.exclusions.to_string(),
        }
    }
}

impl fmt::Display for SequenceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (start {}, pool {})",
            self.name, self.start_counter, self.pool_size
        )?;
        if !self.exclusions.is_empty() {
            write!(f, " excluding {}", self.exclusions)?;
        }
        Ok(())
    }
}
