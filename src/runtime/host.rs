use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15);
const IDLE_POLL: Duration = Duration::from_secs(1);

/// Counts running scrape jobs and remembers when the last one finished.
pub struct JobTracker {
    running: AtomicUsize,
    idle_since: Mutex<Instant>,
}

/// Held for the lifetime of one job.
pub struct JobGuard {
    tracker: Arc<JobTracker>,
}

impl JobTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicUsize::new(0),
            idle_since: Mutex::new(Instant::now()),
        })
    }

    pub fn start(self: &Arc<Self>) -> JobGuard {
        self.running.fetch_add(1, Ordering::SeqCst);
        JobGuard {
            tracker: Arc::clone(self),
        }
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// How long the host has had nothing to do; `None` while a job runs.
    pub fn idle_for(&self) -> Option<Duration> {
        if self.running() > 0 {
            return None;
        }
        let since = self.idle_since.lock().ok()?;
        Some(since.elapsed())
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if let Ok(mut since) = self.tracker.idle_since.lock() {
            *since = Instant::now();
        }
        self.tracker.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Resolves once the host has been idle for `timeout`, counting from
/// startup or from the end of the last job.
pub async fn idle_shutdown(tracker: Arc<JobTracker>, timeout: Duration) {
    let mut ticks = tokio::time::interval(IDLE_POLL);
    loop {
        ticks.tick().await;
        if tracker.idle_for().is_some_and(|idle| idle >= timeout) {
            tracing::info!("[Scraper] Idle for {}s, shutting down", timeout.as_secs());
            return;
        }
    }
}
