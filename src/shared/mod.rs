//! State and messaging shared between the capture loop and the worker
//!
//! The two tasks exchange jobs over a single-slot handoff and everything else
//! through the atomics in [`PipelineState`].

pub mod messages;
pub mod sink;
pub mod state;

pub use messages::{Job, RegionText, WorkerMessage};
pub use sink::{ConsoleSink, ReportSink};
pub use state::PipelineState;
