//! # Gamma Probe
//!
//! A stereo HMD diagnostic: renders a gamma calibration image into
//! both eye buffers every frame so you can see, in the headset and in
//! a mirror window, whether the pipeline handles sRGB correctly.
//!
//! ## Architecture Overview
//!
//! The application is structured into independent modules:
//!
//! - `config`: Command-line parsing and settings (the `-sRGB` toggle)
//! - `geometry`: Sizes, rectangles, per-eye viewport derivation
//! - `ring`: Per-eye texture ring and its slot cursor
//! - `driver`: The RUNNING/STOPPED frame loop
//! - `source`: The gamma test image (generated or loaded)
//! - `display`: Win32 window, D3D11 device, swap chain (Windows only)
//! - `hmd`: OpenXR compositor session and mirror (Windows only)
//! - `app`: Wires everything into one frame application (Windows only)
//! - `error`: Error types and the fatal-exit policy
//!
//! Everything GPU- or OS-bound is Windows only; the pure pieces are
//! cross-platform and carry the test suite.

// ============================================
// MODULE DECLARATIONS
// ============================================

pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod ring;
pub mod source;

#[cfg(windows)]
pub mod app;
#[cfg(windows)]
pub mod display;
#[cfg(windows)]
pub mod hmd;

// ============================================
// RE-EXPORTS
// ============================================

pub use config::Config;
pub use driver::{DriverState, FrameApp, FrameDriver};
pub use error::{fatal, GammaProbeError, GammaProbeResult};
pub use geometry::{eye_viewports, Recti, Sizei};
pub use ring::SlotCursor;
pub use source::{SourceImage, TestPattern};

#[cfg(windows)]
pub use app::GammaTestApp;

// ============================================
// LOGGING
// ============================================

/// Initialize logging for the process.
pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
