use core::time::Duration;
use std::{collections::HashMap, sync::Arc};

use ::tokio::sync::Mutex as AsyncMutex;
use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    AsyncSequenceSource, BackingStoreError, BlockRequest, Dialect, Error, Result,
    SequenceDescriptor,
    mutex::{RwLock, read, write},
    reverse,
    sequence::PoolState,
};

/// A [`SequenceIdPool`](crate::SequenceIdPool) whose refills are awaited
/// rather than blocking a thread.
///
/// The pool lock is a [`tokio::sync::Mutex`] held across the refill, so
/// tasks that arrive mid-refill queue behind it and then take from the
/// refilled pool instead of issuing their own round trips. Cancelling the
/// refilling task (for example through
/// [`allocate_raw_timeout`](Self::allocate_raw_timeout)) drops the guard
/// before any fetched values are folded in, leaving the pool as it was.
///
/// [`tokio::sync::Mutex`]: ::tokio::sync::Mutex
pub struct AsyncSequenceIdPool<S> {
    descriptor: SequenceDescriptor,
    source: Arc<S>,
    state: AsyncMutex<PoolState>,
    refills: AtomicU64,
}

impl<S> AsyncSequenceIdPool<S>
where
    S: AsyncSequenceSource + Send + Sync,
{
    /// An empty pool; the first allocation triggers a refill.
    pub fn new(descriptor: SequenceDescriptor, source: Arc<S>) -> Self {
        let state = PoolState::new(descriptor.start_counter());
        Self {
            descriptor,
            source,
            state: AsyncMutex::new(state),
            refills: AtomicU64::new(0),
        }
    }

    /// Hands out a raw counter no other caller has received.
    ///
    /// # Errors
    /// Returns [`Error::BackingStore`] if a refill round trip fails.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), fields(sequence = %self.descriptor.name())))]
    pub async fn allocate_raw(&self) -> Result<u64> {
        let mut state = self.state.lock().await;
        loop {
            if let Some(raw) = state.pop() {
                return Ok(raw);
            }
            self.refill(&mut state).await?;
        }
    }

    /// Like [`allocate_raw`](Self::allocate_raw), bounded by `timeout`
    /// including any time spent waiting behind another caller's refill.
    ///
    /// # Errors
    /// Returns [`Error::BackingStore`] with
    /// [`BackingStoreError::TimedOut`] if the deadline passes first.
    pub async fn allocate_raw_timeout(&self, timeout: Duration) -> Result<u64> {
        match ::tokio::time::timeout(timeout, self.allocate_raw()).await {
            Ok(result) => result,
            Err(_) => Err(self.backing_store_error(BackingStoreError::TimedOut(timeout))),
        }
    }

    /// Allocates a raw counter and returns it bit-reversed.
    ///
    /// # Errors
    /// See [`allocate_raw`](Self::allocate_raw).
    pub async fn next_id(&self) -> Result<u64> {
        self.allocate_raw().await.map(reverse)
    }

    /// Bit-reversed variant of
    /// [`allocate_raw_timeout`](Self::allocate_raw_timeout).
    ///
    /// # Errors
    /// See [`allocate_raw_timeout`](Self::allocate_raw_timeout).
    pub async fn next_id_timeout(&self, timeout: Duration) -> Result<u64> {
        self.allocate_raw_timeout(timeout).await.map(reverse)
    }

    /// The sequence this pool allocates from.
    pub fn descriptor(&self) -> &SequenceDescriptor {
        &self.descriptor
    }

    /// Number of successful refills so far.
    pub fn refills(&self) -> u64 {
        self.refills.load(Ordering::Relaxed)
    }

    pub async fn available(&self) -> usize {
        self.state.lock().await.len()
    }

    async fn refill(&self, state: &mut PoolState) -> Result<()> {
        let exclusions = self.descriptor.exclusions();
        let resume_at = state
            .resume_at(exclusions)
            .map_err(|e| self.backing_store_error(e))?;

        let request = BlockRequest {
            sequence: self.descriptor.name(),
            start_with: self.descriptor.start_counter(),
            resume_at,
            count: self.descriptor.pool_size(),
        };
        let block = AsyncSequenceSource::fetch_block(&*self.source, &request)
            .await
            .map_err(|e| self.backing_store_error(e))?;
        if block.is_empty() {
            return Err(self.backing_store_error(BackingStoreError::Exhausted));
        }
        self.refills.fetch_add(1, Ordering::Relaxed);

        let discarded = state.accept_block(block, exclusions);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            sequence = %self.descriptor.name(),
            resume_at,
            available = state.len(),
            discarded,
            "refilled sequence pool"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = discarded;

        Ok(())
    }

    fn backing_store_error(&self, source: BackingStoreError) -> Error {
        #[cfg(feature = "tracing")]
        tracing::warn!(sequence = %self.descriptor.name(), error = %source, "sequence refill failed");
        Error::BackingStore {
            sequence: self.descriptor.name().to_string(),
            source,
        }
    }
}

/// Async counterpart of
/// [`PooledBitReversedSequenceGenerator`](crate::PooledBitReversedSequenceGenerator).
///
/// # Example
/// ```
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// use revkey::{AsyncPooledBitReversedSequenceGenerator, InMemorySequenceSource, SequenceDescriptor, reverse};
///
/// let generator = AsyncPooledBitReversedSequenceGenerator::new(InMemorySequenceSource::new());
/// let descriptor = SequenceDescriptor::new("order_seq").unwrap();
///
/// assert_eq!(generator.next_id(&descriptor).await.unwrap(), reverse(1));
/// # });
/// ```
pub struct AsyncPooledBitReversedSequenceGenerator<S> {
    source: Arc<S>,
    dialect: Dialect,
    pools: RwLock<HashMap<SequenceDescriptor, Arc<AsyncSequenceIdPool<S>>>>,
}

impl<S> AsyncPooledBitReversedSequenceGenerator<S>
where
    S: AsyncSequenceSource + Send + Sync,
{
    /// A generator over `source` for the default (GoogleSQL) dialect.
    pub fn new(source: S) -> Self {
        Self::from_arc(Arc::new(source))
    }

    /// Shares an existing source between generators.
    pub fn from_arc(source: Arc<S>) -> Self {
        Self {
            source,
            dialect: Dialect::default(),
            pools: RwLock::new(HashMap::new()),
        }
    }

    /// Applies dialect limits to descriptors before their pool is created.
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
    pub async fn next_id(&self, descriptor: &SequenceDescriptor) -> Result<u64> {
        self.pool(descriptor)?.next_id().await
    }

    /// Like [`next_id`](Self::next_id), bounded by `timeout`.
    ///
    /// # Errors
    /// See [`AsyncSequenceIdPool::allocate_raw_timeout`].
    pub async fn next_id_timeout(
        &self,
        descriptor: &SequenceDescriptor,
        timeout: Duration,
    ) -> Result<u64> {
        self.pool(descriptor)?.next_id_timeout(timeout).await
    }

    /// Resolves or lazily creates the pool for `descriptor`.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the descriptor exceeds the
    /// dialect's limits.
    pub fn pool(&self, descriptor: &SequenceDescriptor) -> Result<Arc<AsyncSequenceIdPool<S>>> {
        if let Some(pool) = read(&self.pools, |pools| pools.get(descriptor).cloned())? {
            return Ok(pool);
        }

        self.dialect.validate_descriptor(descriptor)?;
        write(&self.pools, |pools| {
            Arc::clone(pools.entry(descriptor.clone()).or_insert_with(|| {
                Arc::new(AsyncSequenceIdPool::new(
                    descriptor.clone(),
                    Arc::clone(&self.source),
                ))
            }))
        })
    }

    /// Number of distinct pools created so far.
    ///
    /// # Errors
    /// Fails only if the pool map lock is poisoned.
    pub fn pool_count(&self) -> Result<usize> {
        read(&self.pools, HashMap::len)
    }
}
