//! Message types exchanged between the capture loop and the recognition worker

use std::sync::Arc;

use crate::capture::frame::CapturedFrame;
use crate::regions::Region;

/// A frame submitted for recognition together with the regions to scan
#[derive(Debug)]
pub struct Job {
    /// Dispatch sequence number, starting at 1
    pub sequence: u64,
    /// Independent copy of the captured frame, owned by the worker
    pub frame: CapturedFrame,
    /// Region list as it was at dispatch time
    pub regions: Arc<[Region]>,
}

/// Messages sent over the single-slot handoff to the worker
#[derive(Debug)]
pub enum WorkerMessage {
    /// Process one job
    Recognize(Job),
    /// Sentinel: stop receiving and exit
    Shutdown,
}

/// Text recognized in one region of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionText {
    /// Index of the region in the job's region list
    pub index: usize,
    /// Recognized text, possibly empty
    pub text: String,
}

impl RegionText {
    /// Text formatted for single-line output (newlines become spaces)
    pub fn to_output(&self) -> String {
        to_output(&self.text)
    }
}

/// Replace embedded newlines with spaces
pub fn to_output(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_output_replaces_newlines() {
        assert_eq!(to_output("line one\nline two"), "line one line two");
        assert_eq!(to_output("a\r\nb\rc"), "a b c");
        assert_eq!(to_output("plain"), "plain");
    }

    #[test]
    fn test_region_text_output() {
        let text = RegionText {
            index: 2,
            text: "HP\n100".to_string(),
        };
        assert_eq!(text.to_output(), "HP 100");
    }
}
