//! Fixed-interval refresh of status endpoints, tied to the lifetime of the
//! page that started it.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::Result;

/// Default ceiling for the failure backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Delay schedule: `base` while polls succeed, doubling per consecutive
/// failure up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max: max.max(base), failures: 0 }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Delay before the next poll given the outcome of the last one.
    pub fn next_delay(&mut self, succeeded: bool) -> Duration {
        if succeeded {
            self.failures = 0;
            return self.base;
        }
        self.failures = self.failures.saturating_add(1);
        let factor = 2u32.saturating_pow(self.failures.min(16));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Owner of a running poller. Dropping it stops the task.
#[derive(Debug)]
pub struct PollerHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        debug!("stopping {} poller", self.name);
        self.task.abort();
    }
}

/// The poller a page owns. Nothing starts while the page is hidden, and
/// hiding the page stops what runs.
#[derive(Debug, Default)]
pub struct PollerSlot {
    shown: bool,
    running: Option<PollerHandle>,
}

impl PollerSlot {
    pub fn show(&mut self) {
        self.shown = true;
    }

    /// Returns whether a poller was stopped.
    pub fn hide(&mut self) -> bool {
        self.shown = false;
        self.stop()
    }

    pub fn stop(&mut self) -> bool {
        self.running.take().is_some()
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Replaces the running poller with the one `start` spawns. `start` is
    /// not called while hidden.
    pub fn restart(&mut self, start: impl FnOnce() -> PollerHandle) -> bool {
        self.stop();
        if !self.shown {
            return false;
        }
        self.running = Some(start());
        true
    }
}

/// Spawns `fetch` on `rt`: first poll immediately, then per `backoff`.
/// Every outcome goes to `sink`; the poller never stops by itself.
pub fn spawn<T, F, Fut, S>(rt: &Handle, name: &'static str, mut backoff: Backoff, mut fetch: F, mut sink: S) -> PollerHandle
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
    S: FnMut(Result<T>) + Send + 'static,
{
    let task = rt.spawn(async move {
        loop {
            let result = fetch().await;
            let ok = result.is_ok();
            if let Err(e) = &result {
                warn!("{name} poll failed: {e}");
            }
            sink(result);
            let delay = backoff.next_delay(ok);
            if !ok {
                debug!("{name} poll retry in {delay:?} after {} failure(s)", backoff.failures());
            }
            tokio::time::sleep(delay).await;
        }
    });
    PollerHandle { name, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConsoleError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_doubles_caps_and_resets() {
        let mut b = Backoff::new(Duration::from_secs(10), Duration::from_secs(45));
        assert_eq!(b.next_delay(true), Duration::from_secs(10));
        assert_eq!(b.next_delay(false), Duration::from_secs(20));
        assert_eq!(b.next_delay(false), Duration::from_secs(40));
        assert_eq!(b.next_delay(false), Duration::from_secs(45));
        assert_eq!(b.failures(), 3);
        assert_eq!(b.next_delay(true), Duration::from_secs(10));
        assert_eq!(b.failures(), 0);
    }

    #[test]
    fn backoff_never_overflows() {
        let mut b = Backoff::new(Duration::from_secs(15), MAX_BACKOFF);
        for _ in 0..100 {
            assert!(b.next_delay(false) <= MAX_BACKOFF);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_on_interval() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _handle = spawn(
            &Handle::current(),
            "test",
            Backoff::new(Duration::from_secs(10), MAX_BACKOFF),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_| {},
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_slow_the_poller_down() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _handle = spawn(
            &Handle::current(),
            "test",
            Backoff::new(Duration::from_secs(10), MAX_BACKOFF),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ConsoleError::Api("down".into()))
                }
            },
            |_| {},
        );

        // Polls at 0, 20, 60: the 140s poll is outside the window.
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_polling() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handle = spawn(
            &Handle::current(),
            "test",
            Backoff::new(Duration::from_secs(10), MAX_BACKOFF),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_| {},
        );

        tokio::time::sleep(Duration::from_secs(15)).await;
        drop(handle);
        let seen = hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(hits.load(Ordering::SeqCst), seen);
    }

    fn counting(hits: &Arc<AtomicUsize>) -> PollerHandle {
        let counter = hits.clone();
        spawn(
            &Handle::current(),
            "test",
            Backoff::new(Duration::from_secs(10), MAX_BACKOFF),
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_| {},
        )
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_slot_refuses_to_start() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot = PollerSlot::default();
        assert!(!slot.restart(|| counting(&hits)));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!slot.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_keeps_a_single_poller() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot = PollerSlot::default();
        slot.show();
        assert!(slot.restart(|| counting(&hits)));
        assert!(slot.restart(|| counting(&hits)));
        // The replaced poller never got to run: polls at 0 and 10 only.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hiding_stops_the_poller() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut slot = PollerSlot::default();
        slot.show();
        slot.restart(|| counting(&hits));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(slot.hide());
        assert!(!slot.is_shown());
        let seen = hits.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(hits.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_receives_every_outcome() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _handle = spawn(
            &Handle::current(),
            "test",
            Backoff::new(Duration::from_secs(15), MAX_BACKOFF),
            || async { Ok(7u32) },
            move |r| {
                let _ = tx.send(r);
            },
        );
        let first = rx.recv().await.unwrap();
        assert_eq!(first.unwrap(), 7);
    }
}
