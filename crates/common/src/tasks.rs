//! Background work owned by a view: repeating refreshes and listeners.
//!
//! Every task is tied to a [`TaskHandle`]. `stop().await` signals shutdown
//! and joins the task; dropping the handle aborts it, so no work outlives
//! its owner.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shutdown signal handed to a task body
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    /// Resolves once shutdown was requested or the handle is gone
    pub async fn wait(&mut self) {
        let _ = self.0.wait_for(|stop| *stop).await;
    }
}

#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(Shutdown) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(body(Shutdown(rx)));
        tracing::debug!(task = name, "background task started");
        Self {
            name,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Run `tick` every `period`, starting immediately. A slow tick delays
    ///  the next one instead of bunching them up.
    pub fn periodic<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(name, move |mut shutdown| async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    _ = interval.tick() => tick().await,
                }
            }
        })
    }

    /// Signal shutdown and wait for the task to finish its current step
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(task = self.name, "background task panicked");
                }
            }
        }
        tracing::debug!(task = self.name, "background task stopped");
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_periodic_ticks_and_stops() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let task = TaskHandle::periodic("counter", Duration::from_secs(30), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // first tick fires immediately, then once per period
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.stop().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let task = TaskHandle::periodic("counter", Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(task);
        let seen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
