//! Pipeline state shared between the capture loop and the recognition worker
//!
//! Every field has a single writer at a time, so plain atomics are enough.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

const NO_LATENCY: u64 = u64::MAX;

/// Process-wide pipeline flags and counters
#[derive(Debug)]
pub struct PipelineState {
    /// 1 while the worker holds an unfinished job
    in_flight: AtomicU32,
    /// Suspends new dispatches
    paused: AtomicBool,
    /// Suppresses the periodic stats report
    stats_hidden: AtomicBool,
    /// Set once at shutdown, never reset
    closing: AtomicBool,
    last_capture_latency_us: AtomicU64,
    last_recognition_latency_us: AtomicU64,
    completed_jobs: AtomicU64,
    failed_jobs: AtomicU64,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            in_flight: AtomicU32::new(0),
            paused: AtomicBool::new(false),
            stats_hidden: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            last_capture_latency_us: AtomicU64::new(NO_LATENCY),
            last_recognition_latency_us: AtomicU64::new(NO_LATENCY),
            completed_jobs: AtomicU64::new(0),
            failed_jobs: AtomicU64::new(0),
        }
    }
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single job slot. Returns false if a job is already in flight.
    pub fn try_begin_job(&self) -> bool {
        self.in_flight
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the job slot
    pub fn finish_job(&self) {
        // Never goes below zero, even if called without a matching begin
        let _ = self
            .in_flight
            .compare_exchange(1, 0, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_stats_hidden(&self) -> bool {
        self.stats_hidden.load(Ordering::Acquire)
    }

    pub fn set_stats_hidden(&self, hidden: bool) {
        self.stats_hidden.store(hidden, Ordering::Release);
    }

    /// Flip the stats flag, returning the new value
    pub fn toggle_stats_hidden(&self) -> bool {
        !self.stats_hidden.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Mark the pipeline as closing. Returns true on the first call only.
    pub fn begin_closing(&self) -> bool {
        !self.closing.swap(true, Ordering::AcqRel)
    }

    pub fn record_capture_latency(&self, latency: Duration) {
        self.last_capture_latency_us
            .store(duration_to_us(latency), Ordering::Release);
    }

    pub fn last_capture_latency(&self) -> Option<Duration> {
        us_to_duration(self.last_capture_latency_us.load(Ordering::Acquire))
    }

    pub fn record_recognition_latency(&self, latency: Duration) {
        self.last_recognition_latency_us
            .store(duration_to_us(latency), Ordering::Release);
    }

    pub fn last_recognition_latency(&self) -> Option<Duration> {
        us_to_duration(self.last_recognition_latency_us.load(Ordering::Acquire))
    }

    pub fn record_completed_job(&self) {
        self.completed_jobs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed_jobs(&self) -> u64 {
        self.completed_jobs.load(Ordering::Relaxed)
    }

    pub fn record_failed_job(&self) {
        self.failed_jobs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_jobs(&self) -> u64 {
        self.failed_jobs.load(Ordering::Relaxed)
    }
}

fn duration_to_us(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(NO_LATENCY - 1)
}

fn us_to_duration(us: u64) -> Option<Duration> {
    (us != NO_LATENCY).then(|| Duration::from_micros(us))
}
