//! Bounded fan-out / fan-in with first-error cancellation
//!
//! [`TaskGroup`] is the barrier primitive of the enhancement pipeline:
//! - `spawn` submits a task; at most `limit` tasks run at once
//! - the first task returning `Err` cancels the shared [`CancelSignal`]
//! - tasks that have not started when the signal fires are skipped
//! - `wait` drains every task and returns the first error, if any
//!
//! Nothing already done by a task is rolled back on cancellation.

use crate::cancel::CancelSignal;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default concurrency limit of a group
pub const DEFAULT_LIMIT: usize = 16;

/// Group of concurrent tasks sharing one cancellation signal
#[derive(Debug)]
pub struct TaskGroup<T, E> {
    tasks: Mutex<JoinSet<Option<Result<T, E>>>>,
    cancel: CancelSignal,
    permits: Arc<Semaphore>,
}

impl<T, E> TaskGroup<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a group with its own cancellation signal
    ///
    /// A `limit` of zero is treated as one.
    #[inline]
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self::with_signal(limit, CancelSignal::new())
    }

    /// Create a group bound to an existing signal
    ///
    /// Groups created from the same signal cancel each other.
    #[must_use]
    pub fn with_signal(limit: usize, cancel: CancelSignal) -> Self {
        Self {
            tasks: Mutex::new(JoinSet::new()),
            cancel,
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Signal shared by the tasks of this group
    #[inline]
    #[must_use]
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Number of tasks submitted and not yet joined
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Check whether no task is pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Submit a task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let cancel = self.cancel.clone();
        let permits = Arc::clone(&self.permits);

        self.tasks.lock().spawn(async move {
            let _permit = tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                permit = permits.acquire_owned() => permit.ok()?,
            };
            if cancel.is_cancelled() {
                return None;
            }

            match task.await {
                Ok(value) => Some(Ok(value)),
                Err(err) => {
                    cancel.cancel();
                    Some(Err(err))
                }
            }
        });
    }

    /// Join every task submitted so far
    ///
    /// Results of successful tasks are returned in completion order. Tasks
    /// spawned while waiting belong to the next `wait`.
    ///
    /// # Errors
    /// Returns the first error reported by a task, after all tasks finished.
    ///
    /// # Panics
    /// Re-raises the panic of a task that panicked.
    pub async fn wait(&self) -> Result<Vec<T>, E> {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        let mut results = Vec::with_capacity(tasks.len());
        let mut first_error = None;
        let mut skipped = 0usize;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(Ok(value))) => results.push(value),
                Ok(Some(Err(err))) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
                Ok(None) => skipped += 1,
                Err(err) if err.is_panic() => {
                    self.cancel.cancel();
                    std::panic::resume_unwind(err.into_panic());
                }
                Err(_) => skipped += 1,
            }
        }

        match first_error {
            Some(err) => {
                tracing::debug!(completed = results.len(), skipped, "task group failed");
                Err(err)
            }
            None => Ok(results),
        }
    }
}

impl<T, E> Default for TaskGroup<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}
