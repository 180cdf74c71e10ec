//! Recognition worker
//!
//! A single dedicated thread that owns the recognition engine. It receives one
//! job at a time over a zero-capacity (rendezvous) channel, recognizes every
//! region of the job's frame, emits the text through the [`ReportSink`] and
//! hands a [`JobOutcome`] back to the coordinator, which decides what a failed
//! job means for the pipeline. A [`WorkerMessage::Shutdown`] sentinel ends the
//! loop.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::shared::{Job, PipelineState, RegionText, ReportSink, WorkerMessage};
use crate::vision::ocr_preprocess::{prepare_region, to_luma};
use crate::vision::{RecognitionError, TextRecognizer};

#[derive(Debug, Error)]
#[error("recognition worker is not running")]
pub struct WorkerStopped;

/// Result of one job, reported back to the capture side
#[derive(Debug)]
pub enum JobOutcome {
    Completed { sequence: u64, latency: Duration },
    Failed { sequence: u64, error: RecognitionError },
}

pub struct RecognitionWorker {
    engine: Box<dyn TextRecognizer>,
    state: Arc<PipelineState>,
    sink: Arc<dyn ReportSink>,
    /// Region scale factor, already clamped
    scale: f64,
}

impl RecognitionWorker {
    pub fn new(engine: Box<dyn TextRecognizer>, state: Arc<PipelineState>, sink: Arc<dyn ReportSink>, scale: f64) -> Self {
        Self {
            engine,
            state,
            sink,
            scale,
        }
    }

    /// Start the worker thread
    pub fn spawn(self) -> std::io::Result<WorkerHandle> {
        let (sender, receiver) = bounded(0);
        let (outcome_tx, outcome_rx) = unbounded();

        let thread = std::thread::Builder::new()
            .name("ocr-worker".to_string())
            .spawn(move || self.run(receiver, outcome_tx))?;

        Ok(WorkerHandle {
            sender: Some(sender),
            outcomes: outcome_rx,
            thread: Some(thread),
        })
    }

    fn run(mut self, receiver: Receiver<WorkerMessage>, outcomes: Sender<JobOutcome>) {
        info!("Recognition worker started ({})", self.engine.name());

        loop {
            // Only suspension point: wait for a job or the sentinel
            let job = match receiver.recv() {
                Ok(WorkerMessage::Recognize(job)) => job,
                Ok(WorkerMessage::Shutdown) => {
                    debug!("Recognition worker received shutdown");
                    break;
                }
                Err(_) => {
                    debug!("Recognition handoff disconnected");
                    break;
                }
            };

            let started = Instant::now();
            let sequence = job.sequence;
            debug!(
                "Job {} picked up {:?} after capture",
                sequence,
                started.saturating_duration_since(job.frame.timestamp)
            );
            let result = self.process_job(&job);
            drop(job);

            // Results of a job that straddles shutdown are never reported
            if self.state.is_closing() {
                debug!("Discarding results of job {} during shutdown", sequence);
                break;
            }

            let outcome = match result {
                Ok(texts) => {
                    let latency = started.elapsed();
                    self.state.record_recognition_latency(latency);
                    self.state.record_completed_job();

                    debug!("Job {} finished in {:?}", sequence, latency);
                    for text in texts.iter().filter(|t| !t.text.trim().is_empty()) {
                        self.sink.text(text);
                    }
                    JobOutcome::Completed { sequence, latency }
                }
                Err(error) => {
                    self.state.record_failed_job();
                    JobOutcome::Failed { sequence, error }
                }
            };

            // The outcome is queued before the slot frees up, so the
            // coordinator sees it no later than it can dispatch again
            if outcomes.send(outcome).is_err() {
                debug!("Outcome receiver dropped");
            }
            self.state.finish_job();
        }

        info!("Recognition worker exiting");
    }

    /// Recognize every region of a job, in region order
    pub fn process_job(&mut self, job: &Job) -> Result<Vec<RegionText>, RecognitionError> {
        let gray = to_luma(&job.frame);
        let mut results = Vec::with_capacity(job.regions.len());

        for (index, region) in job.regions.iter().enumerate() {
            let text = match prepare_region(&gray, region, self.scale)? {
                Some(png) => self.engine.recognize(&png)?,
                None => String::new(),
            };
            results.push(RegionText { index, text });
        }

        Ok(results)
    }
}

/// Capture-side handle to the worker thread
pub struct WorkerHandle {
    sender: Option<Sender<WorkerMessage>>,
    outcomes: Receiver<JobOutcome>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Hand a job to the worker. Blocks until the worker takes it.
    pub fn submit(&self, job: Job) -> Result<(), WorkerStopped> {
        let sender = self.sender.as_ref().ok_or(WorkerStopped)?;
        sender
            .send(WorkerMessage::Recognize(job))
            .map_err(|_| WorkerStopped)
    }

    /// Outcomes of finished jobs not yet collected, without blocking
    pub fn outcomes(&self) -> impl Iterator<Item = JobOutcome> + '_ {
        self.outcomes.try_iter()
    }

    /// Send the shutdown sentinel and wait for the thread to exit.
    ///
    /// Only the first call does anything; it returns true.
    pub fn shutdown(&mut self) -> bool {
        let Some(sender) = self.sender.take() else {
            return false;
        };

        // Fails only if the worker already left its loop
        if sender.send(WorkerMessage::Shutdown).is_err() {
            debug!("Recognition worker already stopped");
        }
        drop(sender);

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Recognition worker panicked");
            }
        }
        true
    }

    /// Whether the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
