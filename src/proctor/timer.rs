use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::info;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// One-second countdown over a test's time budget. The tick task decrements
/// a shared cell; hitting zero fires the expiry hook exactly once and the
/// task stops. A stopped timer never fires.
pub struct CountdownTimer {
    remaining: Arc<AtomicU64>,
    stopped: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self {
            remaining: Arc::new(AtomicU64::new(0)),
            stopped: Arc::new(AtomicBool::new(true)),
            handle: Mutex::new(None),
        }
    }

    /// Arms the countdown with a fresh budget, replacing any earlier run.
    pub fn start<F, Fut>(&self, total_seconds: u64, on_expire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.remaining.store(total_seconds, Ordering::SeqCst);
        self.stopped.store(false, Ordering::SeqCst);

        let remaining = Arc::clone(&self.remaining);
        let stopped = Arc::clone(&self.stopped);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            // The first tick of an interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                let left = remaining.load(Ordering::SeqCst);
                if left <= 1 {
                    remaining.store(0, Ordering::SeqCst);
                    stopped.store(true, Ordering::SeqCst);
                    info!("⏱️ Time budget exhausted");
                    on_expire().await;
                    break;
                }
                remaining.store(left - 1, Ordering::SeqCst);
            }
        });
        *self.handle.lock() = Some(handle);
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Halts the countdown. Safe to call repeatedly.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_fires_expiry_once_at_zero() {
        let timer = CountdownTimer::new();
        let fired = Arc::new(AtomicU64::new(0));

        let fired_clone = Arc::clone(&fired);
        timer.start(3, move || async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(timer.remaining_seconds(), 3);

        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.remaining_seconds(), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(timer.remaining_seconds(), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_timer_never_fires() {
        let timer = CountdownTimer::new();
        let fired = Arc::new(AtomicU64::new(0));

        let fired_clone = Arc::clone(&fired);
        timer.start(2, move || async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        timer.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
