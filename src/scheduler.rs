//! Re-schedule-on-completion timers.
//!
//! A [`PeriodicTask`] runs its job, waits one period, and only then runs it
//! again, so a slow job delays the next run instead of overlapping with it.
//! Cancellation is checked before every run and while sleeping.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct PeriodicTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `job` on the current runtime. The first run starts immediately.
    pub fn spawn<F, Fut>(
        name: &'static str,
        period: Duration,
        cancel: CancellationToken,
        mut job: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                if token.is_cancelled() {
                    break;
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = job() => {}
                }
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(period) => {}
                }
            }
            debug!("[Scheduler] {} stopped", name);
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel and wait for the loop to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
