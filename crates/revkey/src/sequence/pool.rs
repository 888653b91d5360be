use std::{collections::VecDeque, sync::Arc};

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    BackingStoreError, BlockRequest, Error, ExclusionRangeSet, Result, SequenceDescriptor,
    SequenceSource,
    mutex::{Mutex, lock},
    reverse,
};

/// The mutable half of a pool: the refill high-water mark and the raw
/// counters fetched but not yet issued.
#[derive(Debug)]
pub(crate) struct PoolState {
    next_raw_counter: u64,
    available: VecDeque<u64>,
}

impl PoolState {
    pub(crate) fn new(start_counter: u64) -> Self {
        Self {
            next_raw_counter: start_counter,
            available: VecDeque::new(),
        }
    }

    pub(crate) fn pop(&mut self) -> Option<u64> {
        self.available.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.available.len()
    }

    /// The first raw counter a refill may usefully return.
    pub(crate) fn resume_at(&self, exclusions: &ExclusionRangeSet) -> Result<u64, BackingStoreError> {
        exclusions
            .next_allowed(self.next_raw_counter)
            .ok_or(BackingStoreError::Exhausted)
    }

    /// Folds a fetched block into the pool and returns how many values were
    /// discarded.
    ///
    /// Values below the previous high-water mark may already have been
    /// issued and are dropped, as are excluded values. Both are permanently
    /// consumed from the backing sequence.
    pub(crate) fn accept_block(&mut self, block: Vec<u64>, exclusions: &ExclusionRangeSet) -> usize {
        let floor = self.next_raw_counter;
        let fetched = block.len();
        let before = self.available.len();

        for raw in block {
            if raw < floor {
                continue;
            }
            if raw >= self.next_raw_counter {
                self.next_raw_counter = raw.saturating_add(1);
            }
            if !exclusions.is_excluded(raw) {
                self.available.push_back(raw);
            }
        }

        fetched - (self.available.len() - before)
    }
}

/// A per-sequence pool of pre-fetched raw counters.
///
/// [`allocate_raw`](Self::allocate_raw) is a single critical section: pop a
/// counter, or refill from the [`SequenceSource`] and pop. Callers arriving
/// while a refill is in flight wait on the lock and then take from the
/// refilled pool, so only one caller ever talks to the backing sequence at a
/// time and no counter is issued twice.
///
/// A failed refill leaves the pool empty and unchanged; the next call simply
/// tries again.
pub struct SequenceIdPool<S> {
    descriptor: SequenceDescriptor,
    source: Arc<S>,
    state: Mutex<PoolState>,
    refills: AtomicU64,
}

impl<S> SequenceIdPool<S>
where
    S: SequenceSource,
{
    /// An empty pool; the first allocation triggers a refill.
    pub fn new(descriptor: SequenceDescriptor, source: Arc<S>) -> Self {
        let state = PoolState::new(descriptor.start_counter());
        Self {
            descriptor,
            source,
            state: Mutex::new(state),
            refills: AtomicU64::new(0),
        }
    }

    /// Hands out a raw counter that no other caller, in this process or any
    /// other sharing the backing sequence, has received.
    ///
    /// # Errors
    /// - [`Error::BackingStore`] if a refill round trip fails or the sequence
    ///   has nothing left to give.
    /// - [`Error::LockPoisoned`] if a thread panicked while holding the pool
    ///   (only without the `parking-lot` feature).
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self), fields(sequence = %self.descriptor.name())))]
    pub fn allocate_raw(&self) -> Result<u64> {
        let mut state = lock(&self.state)?;
        loop {
            if let Some(raw) = state.pop() {
                return Ok(raw);
            }
            self.refill(&mut state)?;
        }
    }

    /// Allocates a raw counter and returns it bit-reversed.
    ///
    /// # Errors
    /// See [`allocate_raw`](Self::allocate_raw).
    pub fn next_id(&self) -> Result<u64> {
        self.allocate_raw().map(reverse)
    }

    /// The sequence this pool allocates from.
    pub fn descriptor(&self) -> &SequenceDescriptor {
        &self.descriptor
    }

    /// Number of successful round trips to the backing sequence.
    pub fn refills(&self) -> u64 {
        self.refills.load(Ordering::Relaxed)
    }

    /// Raw counters fetched but not yet handed out.
    ///
    /// # Errors
    /// Returns [`Error::LockPoisoned`] if the pool lock is poisoned (only
    /// without the `parking-lot` feature).
    pub fn available(&self) -> Result<usize> {
        Ok(lock(&self.state)?.len())
    }

    fn refill(&self, state: &mut PoolState) -> Result<()> {
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
        let block = self
            .source
            .fetch_block(&request)
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

impl<S> core::fmt::Debug for SequenceIdPool<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SequenceIdPool")
            .field("descriptor", &self.descriptor)
            .field("refills", &self.refills.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_block_skips_excluded_and_advances_watermark() {
        let exclusions = ExclusionRangeSet::parse("[3,5]").unwrap();
        let mut state = PoolState::new(1);

        let discarded = state.accept_block((1..=8).collect(), &exclusions);

        assert_eq!(discarded, 3);
        assert_eq!(state.next_raw_counter, 9);
        let issued: Vec<_> = core::iter::from_fn(|| state.pop()).collect();
        assert_eq!(issued, [1, 2, 6, 7, 8]);
    }

    #[test]
    fn accept_block_drops_values_below_watermark() {
        let mut state = PoolState::new(100);
        let discarded = state.accept_block(vec![98, 99, 100, 101], &ExclusionRangeSet::empty());

        assert_eq!(discarded, 2);
        assert_eq!(state.len(), 2);
        assert_eq!(state.next_raw_counter, 102);
    }

    #[test]
    fn resume_at_jumps_over_exclusions() {
        let exclusions = ExclusionRangeSet::parse("[1,1000]").unwrap();
        let state = PoolState::new(1);
        assert_eq!(state.resume_at(&exclusions), Ok(1001));
    }
}
