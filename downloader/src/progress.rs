/// Throttled progress reporting for a streaming body.
///
/// Ticks are held back for an initial `delay` after the stream starts, then
/// emitted at most once per `throttle` interval. A high-water mark survives
/// across attempts of the same download so the persisted byte count never
/// moves backwards while the record is still in progress.
use std::time::{Duration, Instant};

use fetchkeep_shared::models::ProgressState;

#[derive(Debug)]
pub struct ProgressTracker {
    delay: Duration,
    throttle: Duration,
    started: Instant,
    last_emit: Option<Instant>,
    total: Option<u64>,
    received: u64,
    high_water: u64,
}

impl ProgressTracker {
    pub fn new(delay: Duration, throttle: Duration) -> Self {
        Self {
            delay,
            throttle,
            started: Instant::now(),
            last_emit: None,
            total: None,
            received: 0,
            high_water: 0,
        }
    }

    /// Reset per-attempt counters for a new response; the high-water mark is kept.
    pub fn start_attempt(&mut self, total: Option<u64>, now: Instant) {
        self.started = now;
        self.last_emit = None;
        self.total = total;
        self.received = 0;
    }

    /// Bytes received in the current attempt.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Account for `bytes` more bytes and return a tick if one is due.
    pub fn advance(&mut self, bytes: u64, now: Instant) -> Option<ProgressState> {
        self.received += bytes;

        if now.saturating_duration_since(self.started) < self.delay {
            return None;
        }
        if let Some(last) = self.last_emit {
            if now.saturating_duration_since(last) < self.throttle {
                return None;
            }
        }
        // A retried attempt stays silent until it catches up with what was
        // already persisted.
        if self.received < self.high_water {
            return None;
        }

        self.last_emit = Some(now);
        self.high_water = self.received;
        Some(ProgressState::new(self.received, self.total))
    }
}
