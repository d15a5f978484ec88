use super::FetchError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

/// Bounds the number of requests in flight at once.
///
/// Wrap in an `Arc` via [`Throttler::new`], then call [`Throttler::acquire`] before
/// each outbound request. At most `max_concurrent` permits exist; waiting for
/// one can be abandoned through the cancellation token.
#[derive(Debug)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Throttler {
    /// Create a new throttler that allows at most `max_concurrent` requests at a time.
    ///
    /// A limit of zero is raised to one.
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        let max_concurrent = max_concurrent.max(1);
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        })
    }

    /// Wait for a concurrency slot, or give up when `cancel` fires.
    ///
    /// The returned permit must be held for the duration of the request. When it
    /// is dropped, the slot becomes available for another caller.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            permit = Arc::clone(&self.semaphore).acquire_owned() => permit.map_err(|_closed| FetchError::Cancelled),
        }
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub const fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
