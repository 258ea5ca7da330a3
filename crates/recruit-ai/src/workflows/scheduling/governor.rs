use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Keeps consecutive store writes at least `interval` apart. Spreadsheet backends
/// throttle bursts of single-cell writes.
#[derive(Debug)]
pub struct WriteGovernor {
    interval: Duration,
    last_write: Mutex<Option<Instant>>,
}

impl WriteGovernor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_write: Mutex::new(None),
        }
    }

    /// No pacing; used by in-memory stores and tests.
    pub fn unthrottled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the next write is allowed, then record it.
    pub fn throttle(&self) {
        let mut last_write = self
            .last_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(previous) = *last_write {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        *last_write = Some(Instant::now());
    }
}

impl Default for WriteGovernor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
