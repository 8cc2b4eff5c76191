//! # Error Types Module
//!
//! This module defines all the error types used throughout the gamma
//! probe, and the fatal-exit policy for setup failures.
//!
//! ## Plain English Explanation
//!
//! This is a disposable diagnostic tool, so the error policy is
//! deliberately blunt:
//!
//! - Setup problems (window, device, swap chain, HMD runtime) are
//!   fatal: show a blocking message, exit(-1).
//! - A rejected frame submission is logged and otherwise ignored -
//!   the compositor paces us, and the next frame will try again.
//! - Resource allocation problems (ring textures, mirror, source
//!   image) are logged and fatal. Silently ignoring them would mean
//!   staring at a black headset wondering why.

use std::fmt;
use std::io;

use crate::config::ConfigError;

// ============================================
// MAIN APPLICATION ERROR
// ============================================

/// The main error type for the gamma probe.
#[derive(Debug)]
pub enum GammaProbeError {
    /// A setup step failed. Always fatal.
    ///
    /// ## Examples
    /// - Window class registration failed
    /// - No DXGI adapter / D3D11 device
    /// - HMD runtime missing or no headset attached
    Setup(SetupErrorKind),

    /// The compositor rejected or errored a submitted frame.
    ///
    /// Logged at warn level by the frame driver and otherwise
    /// ignored; there is no retry or frame-drop handling.
    Submission(SubmissionErrorKind),

    /// A GPU resource or the source image could not be created.
    Resource(ResourceErrorKind),

    /// A configuration value is out of range.
    Config(ConfigError),

    /// Generic I/O error (source image file).
    Io(io::Error),
}

impl From<io::Error> for GammaProbeError {
    fn from(err: io::Error) -> Self {
        GammaProbeError::Io(err)
    }
}

impl From<ConfigError> for GammaProbeError {
    fn from(err: ConfigError) -> Self {
        GammaProbeError::Config(err)
    }
}

impl fmt::Display for GammaProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup(e) => write!(f, "Setup error: {}", e),
            Self::Submission(e) => write!(f, "Submission error: {}", e),
            Self::Resource(e) => write!(f, "Resource error: {}", e),
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for GammaProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================
// SETUP ERRORS
// ============================================

/// Errors during one-time startup, in rough creation order.
///
/// Every one of these aborts the process: the tool has no partial
/// configuration it could meaningfully run in.
#[derive(Debug)]
pub enum SetupErrorKind {
    /// Window class registration failed.
    WindowClassRegistration,

    /// Native window creation failed.
    WindowCreation(String),

    /// DXGI factory creation or adapter enumeration failed.
    AdapterEnumeration(String),

    /// D3D11 device/context creation failed.
    DeviceCreation(String),

    /// Swap chain creation failed.
    SwapChainCreation(String),

    /// Back buffer retrieval or render-target-view creation failed.
    RenderTargetView(String),

    /// Could not bound the render-ahead queue to one frame.
    FrameLatencyConfiguration(String),

    /// The HMD runtime (OpenXR loader) could not be initialized.
    RuntimeInitialization(String),

    /// No head-mounted display detected.
    HmdNotDetected(String),

    /// HMD session creation failed.
    SessionCreation(String),

    /// Tracking space configuration failed.
    TrackingConfiguration(String),

    /// Per-eye compositor swapchain creation failed.
    EyeSwapchainCreation(String),
}

impl fmt::Display for SetupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowClassRegistration => {
                write!(f, "Failed to register window class")
            }
            Self::WindowCreation(reason) => {
                write!(f, "Failed to create window: {}", reason)
            }
            Self::AdapterEnumeration(reason) => {
                write!(f, "Failed to enumerate graphics adapter: {}", reason)
            }
            Self::DeviceCreation(reason) => {
                write!(f, "Failed to create D3D11 device: {}", reason)
            }
            Self::SwapChainCreation(reason) => {
                write!(f, "Failed to create swap chain: {}", reason)
            }
            Self::RenderTargetView(reason) => {
                write!(f, "Failed to create back buffer view: {}", reason)
            }
            Self::FrameLatencyConfiguration(reason) => {
                write!(f, "Failed to set maximum frame latency: {}", reason)
            }
            Self::RuntimeInitialization(reason) => {
                write!(f, "Failed to initialize HMD runtime: {}", reason)
            }
            Self::HmdNotDetected(reason) => {
                write!(f, "Head-mounted display not detected: {}", reason)
            }
            Self::SessionCreation(reason) => {
                write!(f, "Failed to create HMD session: {}", reason)
            }
            Self::TrackingConfiguration(reason) => {
                write!(f, "Failed to configure tracking: {}", reason)
            }
            Self::EyeSwapchainCreation(reason) => {
                write!(f, "Failed to create eye swapchain: {}", reason)
            }
        }
    }
}

// ============================================
// SUBMISSION ERRORS
// ============================================

/// Errors while handing a finished frame to the compositor.
#[derive(Debug)]
pub enum SubmissionErrorKind {
    /// The compositor refused the frame.
    FrameRejected(String),

    /// Waiting for the compositor's frame timing failed.
    FrameWaitFailed(String),

    /// Acquiring or releasing an eye swapchain image failed.
    ImageCycleFailed(String),
}

impl fmt::Display for SubmissionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameRejected(reason) => {
                write!(f, "Compositor rejected frame: {}", reason)
            }
            Self::FrameWaitFailed(reason) => {
                write!(f, "Frame wait failed: {}", reason)
            }
            Self::ImageCycleFailed(reason) => {
                write!(f, "Eye image acquire/release failed: {}", reason)
            }
        }
    }
}

// ============================================
// RESOURCE ERRORS
// ============================================

/// Errors while creating GPU resources or loading the source image.
#[derive(Debug)]
pub enum ResourceErrorKind {
    /// A ring slot texture could not be allocated.
    RingTextureAllocation(String),

    /// A cached render-target view could not be created.
    RingViewCreation(String),

    /// The mirror texture could not be created.
    MirrorTextureCreation(String),

    /// The source image file could not be decoded.
    SourceImageDecode(String),

    /// The source image could not be uploaded to the GPU.
    SourceTextureUpload(String),
}

impl fmt::Display for ResourceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RingTextureAllocation(reason) => {
                write!(f, "Failed to allocate eye ring texture: {}", reason)
            }
            Self::RingViewCreation(reason) => {
                write!(f, "Failed to create ring render-target view: {}", reason)
            }
            Self::MirrorTextureCreation(reason) => {
                write!(f, "Failed to create mirror texture: {}", reason)
            }
            Self::SourceImageDecode(reason) => {
                write!(f, "Failed to decode source image: {}", reason)
            }
            Self::SourceTextureUpload(reason) => {
                write!(f, "Failed to upload source texture: {}", reason)
            }
        }
    }
}

// ============================================
// RESULT TYPE ALIAS
// ============================================

/// A Result type that uses GammaProbeError.
pub type GammaProbeResult<T> = Result<T, GammaProbeError>;

// ============================================
// FATAL EXIT POLICY
// ============================================

/// Reports a fatal setup failure and terminates the process.
///
/// On Windows this shows a blocking modal message box (the tool may
/// have no console); everywhere it logs the error first. The process
/// exits with -1.
pub fn fatal(err: &GammaProbeError) -> ! {
    log::error!("{}", err);

    #[cfg(windows)]
    {
        use windows::core::PCWSTR;
        use windows::Win32::UI::WindowsAndMessaging::{MessageBoxW, MB_ICONERROR, MB_OK};

        let text: Vec<u16> = format!("{}", err).encode_utf16().chain(Some(0)).collect();
        let caption: Vec<u16> = "Gamma Probe".encode_utf16().chain(Some(0)).collect();
        unsafe {
            MessageBoxW(
                None,
                PCWSTR(text.as_ptr()),
                PCWSTR(caption.as_ptr()),
                MB_ICONERROR | MB_OK,
            );
        }
    }

    std::process::exit(-1);
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display() {
        let err = GammaProbeError::Setup(SetupErrorKind::HmdNotDetected(
            "no runtime installed".to_string(),
        ));
        let message = format!("{}", err);
        assert!(message.contains("Setup"));
        assert!(message.contains("not detected"));
    }

    #[test]
    fn test_submission_error_display() {
        let err = GammaProbeError::Submission(SubmissionErrorKind::FrameRejected(
            "session not focused".to_string(),
        ));
        let message = format!("{}", err);
        assert!(message.contains("rejected"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: GammaProbeError = io_err.into();

        match app_err {
            GammaProbeError::Io(_) => {} // Expected
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_config_error_conversion() {
        let err: GammaProbeError = crate::config::ConfigError::InvalidRingSlots(9).into();
        assert!(format!("{}", err).contains("ring slot count"));
    }
}
