//! Admission control for recognition jobs
//!
//! Frames are never queued. While the worker is busy or recognition is paused,
//! frames are only counted; the first frame that meets the interval once the
//! slot is free gets dispatched.

use crate::shared::PipelineState;

/// Outcome of offering one frame to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The job slot was claimed; the caller must send the frame
    Dispatch,
    /// Recognition is paused
    Paused,
    /// Not enough frames since the last dispatch
    Waiting,
    /// A job is still in flight
    Busy,
}

#[derive(Debug)]
pub struct AdmissionController {
    interval_frames: u32,
    frames_since_dispatch: u32,
}

impl AdmissionController {
    pub fn new(interval_frames: u32) -> Self {
        Self {
            interval_frames: interval_frames.max(1),
            frames_since_dispatch: 0,
        }
    }

    /// Called once per captured, non-empty frame.
    ///
    /// On [`Admission::Dispatch`] the in-flight slot is already held; if the
    /// handoff then fails the caller must release it.
    pub fn on_frame(&mut self, state: &PipelineState) -> Admission {
        self.frames_since_dispatch = self.frames_since_dispatch.saturating_add(1);

        if state.is_paused() {
            return Admission::Paused;
        }
        if self.frames_since_dispatch < self.interval_frames {
            return Admission::Waiting;
        }
        if !state.try_begin_job() {
            return Admission::Busy;
        }

        self.frames_since_dispatch = 0;
        Admission::Dispatch
    }

    /// Frames counted since the last dispatch
    #[cfg(test)]
    pub fn frames_since_dispatch(&self) -> u32 {
        self.frames_since_dispatch
    }

    #[cfg(test)]
    pub fn interval_frames(&self) -> u32 {
        self.interval_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_on_interval() {
        let state = PipelineState::new();
        let mut admission = AdmissionController::new(3);

        assert_eq!(admission.on_frame(&state), Admission::Waiting);
        assert_eq!(admission.on_frame(&state), Admission::Waiting);
        assert_eq!(admission.on_frame(&state), Admission::Dispatch);
        assert_eq!(state.in_flight(), 1);
        assert_eq!(admission.frames_since_dispatch(), 0);
    }

    #[test]
    fn test_at_most_one_in_flight() {
        let state = PipelineState::new();
        let mut admission = AdmissionController::new(1);
        let mut dispatched = 0;

        for frame in 0..100 {
            if admission.on_frame(&state) == Admission::Dispatch {
                dispatched += 1;
            }
            assert!(state.in_flight() <= 1);
            // Worker finishes every fifth frame
            if frame % 5 == 4 {
                state.finish_job();
            }
        }

        assert_eq!(dispatched, 20);
    }

    #[test]
    fn test_busy_frames_are_dropped_not_queued() {
        let state = PipelineState::new();
        let mut admission = AdmissionController::new(2);

        admission.on_frame(&state);
        assert_eq!(admission.on_frame(&state), Admission::Dispatch);

        // Frames arriving while the job is in flight are only counted
        for expected in 1..=6u32 {
            let result = admission.on_frame(&state);
            if expected < 2 {
                assert_eq!(result, Admission::Waiting);
            } else {
                assert_eq!(result, Admission::Busy);
            }
            assert_eq!(admission.frames_since_dispatch(), expected);
        }

        state.finish_job();

        // Threshold already met, so the very next frame dispatches
        assert_eq!(admission.on_frame(&state), Admission::Dispatch);
        assert_eq!(admission.frames_since_dispatch(), 0);
        // One dispatch for the whole busy stretch
        assert_eq!(admission.on_frame(&state), Admission::Waiting);
    }

    #[test]
    fn test_pause_suppresses_dispatch() {
        let state = PipelineState::new();
        let mut admission = AdmissionController::new(1);
        state.set_paused(true);

        for _ in 0..50 {
            assert_eq!(admission.on_frame(&state), Admission::Paused);
        }
        assert_eq!(state.in_flight(), 0);
        assert_eq!(admission.frames_since_dispatch(), 50);

        state.set_paused(false);
        assert_eq!(admission.on_frame(&state), Admission::Dispatch);
    }

    #[test]
    fn test_zero_interval_treated_as_one() {
        let state = PipelineState::new();
        let mut admission = AdmissionController::new(0);
        assert_eq!(admission.interval_frames(), 1);
        assert_eq!(admission.on_frame(&state), Admission::Dispatch);
    }
}
