use std::{collections::HashMap, sync::Arc};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Dialect, Result, SequenceDescriptor, SequenceIdPool, SequenceSource,
    mutex::{RwLock, read, write},
};

/// The per-insert key endpoint.
///
/// Pools are created lazily, one per distinct [`SequenceDescriptor`], and
/// live as long as the generator. Unused pooled values are discarded when
/// the generator is dropped; the backing sequence never hands them out
/// again.
///
/// # Example
/// ```
/// use revkey::{
///     InMemorySequenceSource, PooledBitReversedSequenceGenerator, SequenceConfig, reverse,
/// };
///
/// let generator = PooledBitReversedSequenceGenerator::new(InMemorySequenceSource::new());
/// let descriptor = SequenceConfig::new("ticket_sale_seq")
///     .start_with_counter(50_000)
///     .pool_size(1)
///     .build()
///     .unwrap();
///
/// assert_eq!(generator.next_id(&descriptor).unwrap(), reverse(50_000));
/// assert_eq!(generator.next_id(&descriptor).unwrap(), reverse(50_001));
/// ```
pub struct PooledBitReversedSequenceGenerator<S> {
    source: Arc<S>,
    dialect: Dialect,
    pools: RwLock<HashMap<SequenceDescriptor, Arc<SequenceIdPool<S>>>>,
}

impl<S> PooledBitReversedSequenceGenerator<S>
where
    S: SequenceSource,
{
    /// A generator over `source` for the default (GoogleSQL) dialect.
    pub fn new(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }

    /// Shares an existing source, e.g. one connection pool across several
    /// generators.
    pub fn from_arc(source: Arc<S>) -> Self {
        Self {
            source,
            dialect: Dialect::default(),
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Applies dialect limits to descriptors before their pool is created.
    /// Descriptors from [`SequenceConfig::build_for`] have already passed
    /// them.
    ///
    /// [`SequenceConfig::build_for`]: crate::SequenceConfig::build_for
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Returns the next bit-reversed key for `descriptor`.
    ///
    /// # Errors
    /// - [`Error::Configuration`] if the descriptor exceeds the dialect's
    ///   limits.
    /// - [`Error::BackingStore`] if a refill fails.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    /// [`Error::BackingStore`]: crate::Error::BackingStore
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self, descriptor: &SequenceDescriptor) -> Result<u64> {
        self.pool(descriptor)?.next_id()
    }

    /// Resolves or lazily creates the pool for `descriptor`.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the descriptor exceeds the
    /// dialect's limits.
    ///
    /// [`Error::Configuration`]: crate::Error::Configuration
    pub fn pool(&self, descriptor: &SequenceDescriptor) -> Result<Arc<SequenceIdPool<S>>> {
        if let Some(pool) = read(&self.pools, |pools| pools.get(descriptor).cloned())? {
            return Ok(pool);
        }

        self.dialect.validate_descriptor(descriptor)?;
        write(&self.pools, |pools| {
            Arc::clone(pools.entry(descriptor.clone()).or_insert_with(|| {
                #[cfg(feature = "tracing")]
                tracing::debug!(%descriptor, "creating sequence pool");
                Arc::new(SequenceIdPool::new(
                    descriptor.clone(),
                    Arc::clone(&self.source),
                ))
            }))
        })
    }

    /// Number of distinct pools created so far.
    ///
    /// # Errors
    /// Returns [`Error::LockPoisoned`] if the pool map lock is poisoned (only
    /// without the `parking-lot` feature).
    ///
    /// [`Error::LockPoisoned`]: crate::Error
    pub fn pool_count(&self) -> Result<usize> {
        read(&self.pools, HashMap::len)
    }

    /// The dialect whose limits are applied to new pools.
    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// The backing source shared by every pool.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }
}
