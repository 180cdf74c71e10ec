//! Pipeline Coordinator
//!
//! Runs the capture/render/input loop on the calling thread, feeds the
//! recognition worker through the admission controller, and owns the
//! shutdown sequence: set `closing`, send the sentinel once, join the worker,
//! then release the source and display.

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analysis::{Admission, AdmissionController, StatsAggregator};
use crate::capture::{CaptureError, FrameSource};
use crate::config::{AppConfig, ConfigError, JobErrorPolicy};
use crate::hotkey::{KeyBindings, UiAction, UiController};
use crate::overlay::{annotate_frame, DisplaySurface};
use crate::regions::RegionModel;
use crate::shared::{Job, PipelineState, ReportSink};
use crate::vision::{JobOutcome, RecognitionWorker, TextRecognizer, WorkerHandle};

/// Settings the coordinator needs, resolved from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub interval_frames: u32,
    pub frame_delay: Duration,
    pub scale: f64,
    pub on_job_error: JobErrorPolicy,
    pub bindings: KeyBindings,
    pub install_drawn_regions: bool,
}

impl PipelineSettings {
    /// Expects a normalized config
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            interval_frames: config.ocr.interval_frames,
            frame_delay: Duration::from_millis(config.capture.frame_delay_ms),
            scale: config.ocr.scale,
            on_job_error: config.ocr.on_job_error,
            bindings: KeyBindings::from_settings(&config.ui)?,
            install_drawn_regions: config.ui.install_drawn_regions,
        })
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            interval_frames: 8,
            frame_delay: Duration::from_millis(1),
            scale: 1.0,
            on_job_error: JobErrorPolicy::Isolate,
            bindings: KeyBindings::default(),
            install_drawn_regions: true,
        }
    }
}

/// Fixed-delay pacing between capture iterations
#[derive(Debug, Clone, Copy)]
pub struct FramePacer {
    delay: Duration,
}

impl FramePacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn wait(&self) {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    /// Terminal
    ShuttingDown,
}

/// Why the capture loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Operator pressed the quit key
    Quit,
    /// The source has no more frames
    EndOfStream,
    /// Nobody is reading the report output any more
    OutputClosed,
}

/// Counters reported when the pipeline stops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    /// Non-empty frames captured
    pub frames: u64,
    /// Jobs handed to the worker
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
}

enum Step {
    Continue,
    Stop(StopReason),
}

pub struct PipelineCoordinator {
    source: Box<dyn FrameSource>,
    display: Box<dyn DisplaySurface>,
    regions: RegionModel,
    state: Arc<PipelineState>,
    sink: Arc<dyn ReportSink>,
    worker: WorkerHandle,
    on_job_error: JobErrorPolicy,
    admission: AdmissionController,
    stats: StatsAggregator,
    ui: UiController,
    pacer: FramePacer,
    phase: Phase,
    frames: u64,
    dispatched: u64,
}

impl PipelineCoordinator {
    /// Spawn the recognition worker and assemble the pipeline
    pub fn start(
        settings: &PipelineSettings,
        source: Box<dyn FrameSource>,
        display: Box<dyn DisplaySurface>,
        engine: Box<dyn TextRecognizer>,
        regions: RegionModel,
        state: Arc<PipelineState>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self> {
        let worker = RecognitionWorker::new(engine, state.clone(), sink.clone(), settings.scale)
            .spawn()
            .context("Failed to start recognition worker")?;

        Ok(Self {
            source,
            display,
            regions,
            state,
            sink,
            worker,
            on_job_error: settings.on_job_error,
            admission: AdmissionController::new(settings.interval_frames),
            stats: StatsAggregator::new(Instant::now()),
            ui: UiController::new(settings.bindings, settings.install_drawn_regions),
            pacer: FramePacer::new(settings.frame_delay),
            phase: Phase::Running,
            frames: 0,
            dispatched: 0,
        })
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run until quit, end of stream or a fatal error, then shut down
    pub fn run(mut self) -> Result<RunSummary> {
        info!(
            "Pipeline running (source: {}, {} regions)",
            self.source.name(),
            self.regions.len()
        );

        let outcome = loop {
            match self.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Stop(reason)) => break Ok(reason),
                Err(e) => break Err(e),
            }
        };

        self.shutdown();
        let reason = outcome?;

        let summary = RunSummary {
            reason,
            frames: self.frames,
            dispatched: self.dispatched,
            completed: self.state.completed_jobs(),
            failed: self.state.failed_jobs(),
        };
        info!(
            "Pipeline stopped ({:?}): {} frames, {} jobs dispatched, {} completed, {} failed",
            summary.reason, summary.frames, summary.dispatched, summary.completed, summary.failed
        );
        Ok(summary)
    }

    /// One capture iteration
    fn step(&mut self) -> Result<Step> {
        let outcomes: Vec<JobOutcome> = self.worker.outcomes().collect();
        for outcome in outcomes {
            self.on_outcome(outcome)?;
        }

        // The worker only leaves its loop on shutdown, so a dead thread here
        // crashed and will never release the job slot
        if !self.worker.is_running() {
            return Err(anyhow!(
                "Recognition worker stopped unexpectedly ({} job in flight)",
                self.state.in_flight()
            ));
        }

        if self.sink.is_closed() {
            info!("Report output closed");
            return Ok(Step::Stop(StopReason::OutputClosed));
        }

        self.pacer.wait();

        let capture_start = Instant::now();
        let mut frame = match self.source.read() {
            Ok(frame) => frame,
            Err(CaptureError::EndOfStream) => {
                info!("Source {} reached end of stream", self.source.name());
                return Ok(Step::Stop(StopReason::EndOfStream));
            }
            Err(e) => {
                warn!("Unable to read frame: {}", e);
                return Ok(Step::Continue);
            }
        };
        self.state.record_capture_latency(capture_start.elapsed());

        if frame.is_empty() {
            debug!("Skipping empty frame");
            return Ok(Step::Continue);
        }
        self.frames += 1;

        if self.admission.on_frame(&self.state) == Admission::Dispatch {
            self.dispatched += 1;
            let job = Job {
                sequence: self.dispatched,
                frame: frame.clone(),
                regions: self.regions.regions(),
            };
            if self.worker.submit(job).is_err() {
                self.state.finish_job();
                return Err(anyhow!("Recognition worker stopped unexpectedly"));
            }
        }

        annotate_frame(&mut frame.image, &self.regions.regions(), self.ui.gesture().preview());
        if let Err(e) = self.display.show(&frame) {
            warn!("Display error: {:#}", e);
        }

        let event = self.display.poll_event();
        if self.ui.handle_event(event, &self.state, &self.regions) == UiAction::Terminate {
            return Ok(Step::Stop(StopReason::Quit));
        }

        if let Some(report) = self.stats.on_frame(Instant::now(), &self.state) {
            self.sink.stats(&report);
        }

        Ok(Step::Continue)
    }

    /// Apply the job error policy to a finished job
    fn on_outcome(&self, outcome: JobOutcome) -> Result<()> {
        match outcome {
            JobOutcome::Completed { sequence, latency } => {
                debug!("Job {} completed in {:?}", sequence, latency);
                Ok(())
            }
            JobOutcome::Failed { sequence, error } => match self.on_job_error {
                JobErrorPolicy::Isolate => {
                    warn!("Recognition job {} failed, results dropped: {}", sequence, error);
                    Ok(())
                }
                JobErrorPolicy::Escalate => {
                    Err(anyhow::Error::new(error).context(format!("Recognition job {} failed", sequence)))
                }
            },
        }
    }

    /// `Running -> ShuttingDown`. Only the first call has any effect.
    pub fn shutdown(&mut self) {
        if self.phase == Phase::ShuttingDown {
            return;
        }
        self.phase = Phase::ShuttingDown;
        info!("Shutting down");

        // Closing goes up before the sentinel so a job still in flight stays silent
        self.state.begin_closing();
        self.worker.shutdown();
        debug!("Recognition worker joined");
    }
}

impl Drop for PipelineCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
