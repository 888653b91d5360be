use std::{collections::HashMap, sync::Arc};

use portable_atomic::{AtomicU64, Ordering};

use crate::{
    BackingStoreError, QualifiedSequenceName,
    mutex::{Mutex, lock},
};

/// One refill round trip: "give me the next `count` contiguous raw counters
/// of `sequence`".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRequest<'a> {
    /// The sequence to advance.
    pub sequence: &'a QualifiedSequenceName,
    /// Where a never-used sequence begins counting.
    pub start_with: u64,
    /// The smallest raw counter the pool can still accept. Sources that can
    /// skip ahead should start at or after this value.
    pub resume_at: u64,
    /// How many values to fetch.
    pub count: u32,
}

/// The backing database sequence: the single authority on which raw counters
/// have already been consumed by anyone, in any process.
///
/// Implementations perform exactly one round trip per call. A failure must
/// not be retried here; the caller's transaction decides whether to retry.
pub trait SequenceSource {
    /// Fetches the next block of raw counters.
    ///
    /// # Errors
    /// Returns a [`BackingStoreError`] if the round trip fails. An empty
    /// block is treated by the pool as an exhausted sequence.
    fn fetch_block(&self, request: &BlockRequest<'_>) -> Result<Vec<u64>, BackingStoreError>;
}

impl<S> SequenceSource for Arc<S>
where
    S: SequenceSource + ?Sized,
{
    fn fetch_block(&self, request: &BlockRequest<'_>) -> Result<Vec<u64>, BackingStoreError> {
        (**self).fetch_block(request)
    }
}

impl<S> SequenceSource for &S
where
    S: SequenceSource + ?Sized,
{
    fn fetch_block(&self, request: &BlockRequest<'_>) -> Result<Vec<u64>, BackingStoreError> {
        (**self).fetch_block(request)
    }
}

/// A process-local stand-in for a database sequence.
///
/// Each named sequence starts at the request's `start_with` and hands out
/// contiguous blocks. Every call counts as one round trip, which makes it
/// useful for tests, benches and offline tooling.
///
/// # Example
/// ```
/// use revkey::{InMemorySequenceSource, PooledBitReversedSequenceGenerator, SequenceDescriptor, reverse};
///
/// let generator = PooledBitReversedSequenceGenerator::new(InMemorySequenceSource::new());
/// let descriptor = SequenceDescriptor::new("order_seq").unwrap();
///
/// assert_eq!(generator.next_id(&descriptor).unwrap(), reverse(1));
/// assert_eq!(generator.next_id(&descriptor).unwrap(), reverse(2));
/// ```
#[derive(Debug, Default)]
pub struct InMemorySequenceSource {
    counters: Mutex<HashMap<QualifiedSequenceName, u64>>,
    round_trips: AtomicU64,
}

impl InMemorySequenceSource {
    /// A source with no sequences yet; each starts on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `fetch_block` calls served, across all sequences.
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    /// The next value `sequence` would hand out, if it has been used.
    pub fn position(&self, sequence: &QualifiedSequenceName) -> Option<u64> {
        lock(&self.counters)
            .ok()
            .and_then(|counters| counters.get(sequence).copied())
    }
}

impl SequenceSource for InMemorySequenceSource {
    fn fetch_block(&self, request: &BlockRequest<'_>) -> Result<Vec<u64>, BackingStoreError> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);

        let mut counters = lock(&self.counters)
            .map_err(|e| BackingStoreError::RoundTrip(e.to_string()))?;
        let counter = counters
            .entry(request.sequence.clone())
            .or_insert(request.start_with);

        let begin = (*counter).max(request.resume_at);
        let end = begin
            .checked_add(u64::from(request.count))
            .ok_or(BackingStoreError::Exhausted)?;
        *counter = end;

        Ok((begin..end).collect())
    }
}
