use core::future::{Future, ready};
use std::sync::Arc;

use crate::{BackingStoreError, BlockRequest, InMemorySequenceSource, SequenceSource};

/// The async counterpart of [`SequenceSource`]: one awaited round trip per
/// refill.
///
/// Dropping the returned future cancels the round trip. Values the database
/// may already have advanced past are lost, never reissued.
pub trait AsyncSequenceSource {
    /// Fetches the next block of raw counters.
    ///
    /// # Errors
    /// Resolves to a [`BackingStoreError`] if the round trip fails.
    fn fetch_block(
        &self,
        request: &BlockRequest<'_>,
    ) -> impl Future<Output = Result<Vec<u64>, BackingStoreError>> + Send;
}

impl<S> AsyncSequenceSource for Arc<S>
where
    S: AsyncSequenceSource + Sync,
{
    fn fetch_block(
        &self,
        request: &BlockRequest<'_>,
    ) -> impl Future<Output = Result<Vec<u64>, BackingStoreError>> + Send {
        (**self).fetch_block(request)
    }
}

impl AsyncSequenceSource for InMemorySequenceSource {
    fn fetch_block(
        &self,
        request: &BlockRequest<'_>,
    ) -> impl Future<Output = Result<Vec<u64>, BackingStoreError>> + Send {
        ready(SequenceSource::fetch_block(self, request))
    }
}
