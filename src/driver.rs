//! # Frame Driver
//!
//! The main loop: a two-state machine that pumps window events and
//! runs one frame cycle per iteration until told to stop.
//!
//! ## Plain English
//!
//! Every trip around the loop:
//! 1. Ask the display surface whether we should keep running (this
//!    also drains pending input events).
//! 2. If yes, render and submit one stereo frame.
//! 3. If no, stop - and never submit another frame.
//!
//! There is no frame-rate control here on purpose: the compositor's
//! own pacing inside the submission call throttles us.

use log::{info, warn};

use crate::error::{GammaProbeError, GammaProbeResult};

// ============================================
// DRIVER STATE
// ============================================

/// The two states of the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// Pumping events and submitting frames.
    Running,
    /// The event pump reported not-running; no more frames.
    Stopped,
}

// ============================================
// FRAME APPLICATION SEAM
// ============================================

/// What the driver needs from the application.
///
/// This seam exists so the loop's termination behavior can be tested
/// against a mock without a window, a GPU or a headset.
pub trait FrameApp {
    /// Drains pending input/window events without blocking.
    ///
    /// Returns false once the surface wants to shut down.
    fn pump_events(&mut self) -> bool;

    /// Renders and submits one stereo frame.
    fn run_frame(&mut self) -> GammaProbeResult<()>;
}

// ============================================
// FRAME DRIVER
// ============================================

/// Runs the RUNNING -> STOPPED frame loop.
pub struct FrameDriver {
    state: DriverState,
    frames: u64,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Running,
            frames: 0,
        }
    }

    /// Loops until the event pump reports not-running.
    ///
    /// The pump is consulted first each iteration, so the transition
    /// to [`DriverState::Stopped`] happens before any further frame
    /// is submitted. A submission failure is logged and the loop
    /// keeps going; any other frame error is fatal to the loop.
    pub fn run(&mut self, app: &mut impl FrameApp) -> GammaProbeResult<()> {
        info!("Entering frame loop");

        while self.state == DriverState::Running {
            if !app.pump_events() {
                self.state = DriverState::Stopped;
                break;
            }

            match app.run_frame() {
                Ok(()) => self.frames += 1,
                Err(GammaProbeError::Submission(e)) => {
                    // Observed but not acted upon: no retry, no
                    // frame-drop handling. The next iteration simply
                    // tries again.
                    warn!("{}", e);
                    self.frames += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!("Frame loop stopped after {} frames", self.frames);
        Ok(())
    }

    /// Current loop state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Number of frame cycles executed.
    pub fn frames_submitted(&self) -> u64 {
        self.frames
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubmissionErrorKind;

    /// Pumps true `frames_before_stop` times, then false forever.
    struct MockApp {
        frames_before_stop: u32,
        pumps: u32,
        frames_run: u32,
        fail_submission: bool,
    }

    impl MockApp {
        fn new(frames_before_stop: u32) -> Self {
            Self {
                frames_before_stop,
                pumps: 0,
                frames_run: 0,
                fail_submission: false,
            }
        }
    }

    impl FrameApp for MockApp {
        fn pump_events(&mut self) -> bool {
            self.pumps += 1;
            self.pumps <= self.frames_before_stop
        }

        fn run_frame(&mut self) -> GammaProbeResult<()> {
            self.frames_run += 1;
            if self.fail_submission {
                return Err(GammaProbeError::Submission(
                    SubmissionErrorKind::FrameRejected("mock".to_string()),
                ));
            }
            Ok(())
        }
    }

    #[test]
    fn test_stops_on_first_not_running_pump() {
        let mut app = MockApp::new(5);
        let mut driver = FrameDriver::new();

        driver.run(&mut app).unwrap();

        assert_eq!(driver.state(), DriverState::Stopped);
        assert_eq!(app.frames_run, 5);
        assert_eq!(driver.frames_submitted(), 5);
        // The stopping pump itself submitted nothing.
        assert_eq!(app.pumps, 6);
    }

    #[test]
    fn test_no_frame_when_pump_stops_immediately() {
        let mut app = MockApp::new(0);
        let mut driver = FrameDriver::new();

        driver.run(&mut app).unwrap();

        assert_eq!(driver.state(), DriverState::Stopped);
        assert_eq!(app.frames_run, 0);
        assert_eq!(driver.frames_submitted(), 0);
    }

    #[test]
    fn test_submission_failures_do_not_stop_the_loop() {
        let mut app = MockApp::new(3);
        app.fail_submission = true;
        let mut driver = FrameDriver::new();

        driver.run(&mut app).unwrap();

        // Rejections are logged and ignored; all iterations ran.
        assert_eq!(app.frames_run, 3);
        assert_eq!(driver.state(), DriverState::Stopped);
    }

    #[test]
    fn test_non_submission_errors_are_fatal_to_the_loop() {
        struct BrokenApp;

        impl FrameApp for BrokenApp {
            fn pump_events(&mut self) -> bool {
                true
            }

            fn run_frame(&mut self) -> GammaProbeResult<()> {
                Err(GammaProbeError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "boom",
                )))
            }
        }

        let mut driver = FrameDriver::new();
        assert!(driver.run(&mut BrokenApp).is_err());
    }

    #[test]
    fn test_driver_starts_running() {
        let driver = FrameDriver::new();
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.frames_submitted(), 0);
    }
}
