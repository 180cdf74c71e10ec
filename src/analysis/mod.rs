//! Frame Analysis Layer
//!
//! Per-frame decisions made on the capture thread: whether to dispatch a
//! frame for recognition, and when to report throughput.

pub mod admission;
pub mod stats;

pub use admission::{Admission, AdmissionController};
pub use stats::{StatsAggregator, StatsReport};
