use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// A cancellable delayed callback with at most one pending run.
///
/// Scheduling again aborts whatever was pending. Dropping the debouncer aborts the
/// pending run as well, so nothing fires after its owner is gone.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Runs `task` once `delay` has elapsed without another call to `schedule`.
    ///
    /// Outside a tokio runtime there is no timer to wait on: any pending run is
    /// cancelled and `task` is handed back as `Err`, so the caller can run it once it
    /// no longer holds locks the task needs.
    pub fn schedule<F>(&self, task: F) -> Result<(), F>
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            tracing::debug!("No tokio runtime available; debounced task not scheduled");
            self.cancel();
            return Err(task);
        };

        let delay = self.delay;
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// Aborts the pending run, if any. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) => {
                let was_waiting = !handle.is_finished();
                handle.abort();
                was_waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
