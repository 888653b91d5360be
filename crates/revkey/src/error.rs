use core::time::Duration;

/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `revkey` can produce.
///
/// Configuration problems surface when a descriptor or graph is built, never
/// while allocating. Refill failures are reported as-is; the pool that
/// produced them is left empty and can be retried.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Sequence metadata is malformed: a bad exclusion range, a non-positive
    /// pool size or start counter, or a missing sequence name.
    #[error("invalid configuration: {reason}")]
    Configuration {
        /// What was wrong with the supplied metadata.
        reason: String,
    },

    /// The interleaving hierarchy is not a forest, or it refers to tables
    /// that are not part of the supplied schema.
    #[error("schema integrity violated for [{}]: {reason}", .tables.join(", "))]
    SchemaIntegrity {
        /// The offending tables.
        tables: Vec<String>,
        /// Why the schema was rejected.
        reason: String,
    },

    /// The round trip to the backing sequence failed.
    #[error("refill of sequence `{sequence}` failed: {source}")]
    BackingStore {
        /// The rendered name of the sequence being refilled.
        sequence: String,
        /// The underlying failure.
        #[source]
        source: BackingStoreError,
    },

    /// The target database cannot express the requested schema change.
    #[error("unsupported DDL operation `{operation}`: {reason}")]
    UnsupportedDdlOperation {
        /// The operation that was requested.
        operation: String,
        /// Why the dialect rejects it.
        reason: String,
    },

    /// A lock guarding a pool was poisoned by a panicking thread.
    ///
    /// With the `parking-lot` feature enabled mutexes do not poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn integrity<I, S>(tables: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::SchemaIntegrity {
            tables: tables.into_iter().map(Into::into).collect(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedDdlOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single round trip to a backing sequence.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BackingStoreError {
    /// The database or transport reported an error.
    #[error("round trip failed: {0}")]
    RoundTrip(String),

    /// The round trip did not finish within the caller's deadline.
    #[error("round trip timed out after {0:?}")]
    TimedOut(Duration),

    /// The sequence has no values left to hand out.
    #[error("sequence exhausted")]
    Exhausted,
}

#[cfg(not(feature = "parking-lot"))]
impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}
