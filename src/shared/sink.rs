//! Operator-facing output
//!
//! Recognized text and stats reports are line oriented and go to stdout,
//! separate from the tracing log.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::analysis::StatsReport;
use crate::shared::messages::RegionText;

/// Destination for recognition results and stats reports
pub trait ReportSink: Send + Sync {
    /// Emit one non-empty region result
    fn text(&self, result: &RegionText);

    /// Emit one periodic stats report
    fn stats(&self, report: &StatsReport);

    /// True once the output can no longer be written
    fn is_closed(&self) -> bool {
        false
    }
}

/// Writes whole lines to a writer, stdout for the binary
///
/// A broken pipe closes the sink; other write errors are logged and the line
/// is lost.
pub struct LineSink<W> {
    out: Mutex<W>,
    closed: AtomicBool,
}

pub type ConsoleSink = LineSink<io::Stdout>;

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            closed: AtomicBool::new(false),
        }
    }

    fn write_line(&self, line: &str) {
        if self.is_closed() {
            return;
        }

        // Holding the lock for the whole line keeps worker and capture output apart
        let mut out = self.out.lock();
        let result = writeln!(out, "{}", line).and_then(|_| out.flush());

        match result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                if !self.closed.swap(true, Ordering::AcqRel) {
                    warn!("Report output closed: {}", e);
                }
            }
            Err(e) => debug!("Failed to write report line: {}", e),
        }
    }
}

impl<W: Write + Send> ReportSink for LineSink<W> {
    fn text(&self, result: &RegionText) {
        self.write_line(&format!("# Text {}: {}", result.index, result.to_output()));
    }

    fn stats(&self, report: &StatsReport) {
        self.write_line(&report.to_string());
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Sink that records everything, for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub texts: Mutex<Vec<RegionText>>,
    pub reports: Mutex<Vec<StatsReport>>,
    pub closed: AtomicBool,
}

#[cfg(test)]
impl RecordingSink {
    pub fn texts(&self) -> Vec<RegionText> {
        self.texts.lock().clone()
    }

    pub fn reports(&self) -> Vec<StatsReport> {
        self.reports.lock().clone()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
impl ReportSink for RecordingSink {
    fn text(&self, result: &RegionText) {
        self.texts.lock().push(result.clone());
    }

    fn stats(&self, report: &StatsReport) {
        self.reports.lock().push(report.clone());
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
