/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Dead-man's switch for message sources.
//!
//! The timer runs as a tokio task that waits for either a feed or the
//! timeout.  On timeout the callback fires once; it does not fire again
//! until the timer has been fed at least once more.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Smallest accepted timeout.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

/// Cheap, cloneable handle used to feed a [`ReminderTimer`].
#[derive(Debug, Clone, Default)]
pub struct WatchdogFeed(Arc<Notify>);

impl WatchdogFeed {
    pub fn feed(&self) {
        self.0.notify_one();
    }
}

/// Background timer that calls back when it has not been fed in time.
#[derive(Debug)]
pub struct ReminderTimer {
    name: String,
    timeout: Duration,
    feed: WatchdogFeed,
    task: Option<JoinHandle<()>>,
}

impl ReminderTimer {
    /// Returns `None` if `timeout` is shorter than [`MIN_TIMEOUT`].
    pub fn new(name: impl Into<String>, timeout: Duration) -> Option<Self> {
        if timeout < MIN_TIMEOUT {
            return None;
        }
        Some(Self {
            name: name.into(),
            timeout,
            feed: WatchdogFeed::default(),
            task: None,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Handle that can feed this timer from another owner.
    pub fn feeder(&self) -> WatchdogFeed {
        self.feed.clone()
    }

    pub fn feed(&self) {
        self.feed.feed();
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Spawns the timer task.  Must be called from within a tokio runtime.
    /// Calling it while the timer is already running has no effect.
    pub fn start<F>(&mut self, mut on_timeout: F)
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_running() {
            return;
        }

        let feed = self.feed.0.clone();
        let timeout = self.timeout;
        let name = self.name.clone();

        self.task = Some(tokio::spawn(async move {
            let mut armed = true;
            loop {
                match tokio::time::timeout(timeout, feed.notified()).await {
                    Ok(()) => armed = true,
                    Err(_) if armed => {
                        armed = false;
                        debug!(watchdog = %name, timeout = ?timeout, "watchdog expired");
                        on_timeout();
                    }
                    Err(_) => {}
                }
            }
        }));
    }

    /// Stops the timer and waits until its task has finished.  Safe to call
    /// at any time, also repeatedly; no callback fires after it returns.
    pub async fn cancel_and_wait(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // A cancelled JoinError is the expected outcome here.
            let _ = task.await;
            debug!(watchdog = %self.name, "watchdog stopped");
        }
    }
}

impl Drop for ReminderTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counting_timer(ms: u64) -> (ReminderTimer, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let mut timer = ReminderTimer::new("test", Duration::from_millis(ms)).unwrap();
        let c = count.clone();
        timer.start(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (timer, count)
    }

    #[test]
    fn timeout_below_minimum_is_rejected() {
        assert!(ReminderTimer::new("t", Duration::from_millis(99)).is_none());
        assert!(ReminderTimer::new("t", MIN_TIMEOUT).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_and_rearms_on_feed() {
        let (mut timer, count) = counting_timer(100);
        timer.feed();

        sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Not fed: no further callbacks.
        sleep(Duration::from_millis(1_000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        timer.feed();
        sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        timer.cancel_and_wait().await;
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn regular_feeding_prevents_callback() {
        let (mut timer, count) = counting_timer(100);
        for _ in 0..20 {
            timer.feed();
            sleep(Duration::from_millis(60)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        timer.cancel_and_wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_callbacks() {
        let (mut timer, count) = counting_timer(100);
        assert!(timer.is_running());

        timer.cancel_and_wait().await;
        timer.cancel_and_wait().await;
        assert!(!timer.is_running());

        sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn feeder_handle_feeds_the_timer() {
        let (mut timer, count) = counting_timer(100);
        let feeder = timer.feeder();
        for _ in 0..5 {
            feeder.feed();
            sleep(Duration::from_millis(80)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        timer.cancel_and_wait().await;
    }
}
