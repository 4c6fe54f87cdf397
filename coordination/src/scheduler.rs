//! Parallelism scheduler: three memory-class semaphores plus a cooperative
//! cancellation token observed at every acquire and at subprocess-wait
//! resumption.

use crate::error::{HarnessError, HarnessResult};
pub use crate::states::MemoryClass;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PARALLEL_HIGH: usize = 1;
pub const DEFAULT_PARALLEL_MED: usize = 4;
pub const DEFAULT_PARALLEL_LOW: usize = 8;

pub struct ParallelismScheduler {
    high: Arc<Semaphore>,
    med: Arc<Semaphore>,
    low: Arc<Semaphore>,
    cancellation: CancellationToken,
}

impl Default for ParallelismScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_HIGH, DEFAULT_PARALLEL_MED, DEFAULT_PARALLEL_LOW)
    }
}

impl ParallelismScheduler {
    pub fn new(high: usize, med: usize, low: usize) -> Self {
        Self {
            high: Arc::new(Semaphore::new(high)),
            med: Arc::new(Semaphore::new(med)),
            low: Arc::new(Semaphore::new(low)),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    fn semaphore(&self, class: MemoryClass) -> &Arc<Semaphore> {
        match class {
            MemoryClass::High => &self.high,
            MemoryClass::Med => &self.med,
            MemoryClass::Low => &self.low,
        }
    }

    /// Acquire the semaphore for `class`, observing cancellation while
    /// blocked. Returns `ShutdownInterrupted` if cancelled before (or while)
    /// acquiring.
    pub async fn acquire(&self, class: MemoryClass) -> HarnessResult<SemaphorePermit<'_>> {
        if self.cancellation.is_cancelled() {
            return Err(HarnessError::ShutdownInterrupted);
        }
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(HarnessError::ShutdownInterrupted),
            permit = self.semaphore(class).acquire() => {
                permit.map_err(|_| HarnessError::workspace("semaphore closed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_within_limit() {
        let sched = ParallelismScheduler::new(1, 4, 8);
        let permit = sched.acquire(MemoryClass::High).await.unwrap();
        drop(permit);
    }

    #[tokio::test]
    async fn cancelled_token_blocks_acquire() {
        let sched = ParallelismScheduler::new(1, 4, 8);
        sched.cancel();
        let result = sched.acquire(MemoryClass::Low).await;
        assert!(matches!(result, Err(HarnessError::ShutdownInterrupted)));
    }

    #[tokio::test]
    async fn default_limits_match_spec() {
        let sched = ParallelismScheduler::default();
        assert_eq!(sched.high.available_permits(), 1);
        assert_eq!(sched.med.available_permits(), 4);
        assert_eq!(sched.low.available_permits(), 8);
    }
}
