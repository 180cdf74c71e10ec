//! Throughput and latency statistics
//!
//! The aggregator counts captured frames and, once per wall-clock tick,
//! produces a report with the frame rate measured since the previous tick
//! and the most recent capture and recognition latencies.

use std::fmt;
use std::time::{Duration, Instant};

use crate::shared::PipelineState;

/// Default reporting period
pub const STATS_TICK: Duration = Duration::from_secs(1);

/// One periodic stats report
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    /// Frames per second since the previous tick
    pub fps: f64,
    /// Frames counted in this tick
    pub frames: u64,
    /// Time since the previous tick
    pub elapsed: Duration,
    pub capture_latency: Option<Duration>,
    pub recognition_latency: Option<Duration>,
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "# FPS: {:.1} (last capture ms: {}, read ms: {})",
            self.fps,
            millis_or_unset(self.capture_latency),
            millis_or_unset(self.recognition_latency)
        )
    }
}

fn millis_or_unset(latency: Option<Duration>) -> i128 {
    latency.map(|d| d.as_millis() as i128).unwrap_or(-1)
}

#[derive(Debug)]
pub struct StatsAggregator {
    tick: Duration,
    frames: u64,
    last_tick: Instant,
    next_tick: Instant,
}

impl StatsAggregator {
    pub fn new(now: Instant) -> Self {
        Self::with_tick(now, STATS_TICK)
    }

    pub fn with_tick(now: Instant, tick: Duration) -> Self {
        Self {
            tick,
            frames: 0,
            last_tick: now,
            next_tick: now + tick,
        }
    }

    /// Count one captured frame observed at `now`.
    ///
    /// Returns a report when a tick boundary has passed and reporting is
    /// neither hidden nor paused. The counter restarts and the next boundary
    /// is set one tick after `now` whether or not a report was produced.
    pub fn on_frame(&mut self, now: Instant, state: &PipelineState) -> Option<StatsReport> {
        self.frames += 1;

        if now < self.next_tick {
            return None;
        }

        let elapsed = now.saturating_duration_since(self.last_tick);
        let frames = self.frames;

        self.frames = 0;
        self.last_tick = now;
        self.next_tick = now + self.tick;

        if state.is_stats_hidden() || state.is_paused() {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let fps = if secs > 0.0 { frames as f64 / secs } else { 0.0 };

        Some(StatsReport {
            fps,
            frames,
            elapsed,
            capture_latency: state.last_capture_latency(),
            recognition_latency: state.last_recognition_latency(),
        })
    }

    /// Frames counted since the last tick
    #[cfg(test)]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
