//! # Configuration Module
//!
//! Command-line parsing and settings for the gamma probe.
//!
//! ## Plain English Explanation
//!
//! The probe has exactly one interesting switch: whether the pipeline
//! treats colors as gamma-encoded (sRGB) or linear. Everything else
//! here exists so the tool is portable: the test image path comes
//! from the command line, with a generated pattern as the fallback,
//! instead of being baked into the binary.

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

// ============================================
// ARGUMENT PARSING
// ============================================

/// Parsed `-key value` / bare `-flag` arguments.
///
/// ## Plain English
///
/// The whole command line is treated as one free-form string. Every
/// token starting with `-` names a key; if the next token is not
/// itself a key it becomes that key's value, otherwise the key maps
/// to an empty string. Unrecognized keys are kept and ignored.
#[derive(Clone, Debug, Default)]
pub struct ArgMap {
    values: HashMap<String, String>,
}

impl ArgMap {
    /// Parses a free-form argument string.
    pub fn parse(args: &str) -> Self {
        let mut values = HashMap::new();
        let mut tokens = args.split_whitespace().peekable();

        while let Some(token) = tokens.next() {
            let Some(key) = token.strip_prefix('-') else {
                // Stray value with no key; skip it.
                continue;
            };

            let value = match tokens.peek() {
                Some(next) if !next.starts_with('-') => {
                    tokens.next().unwrap_or_default().to_string()
                }
                _ => String::new(),
            };

            values.insert(key.to_string(), value);
        }

        Self { values }
    }

    /// Returns the raw value for a key, if the key was present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Resolves a default-on boolean: only the literal value "false"
    /// turns the toggle off; absence or any other value leaves it on.
    pub fn bool_default_on(&self, key: &str) -> bool {
        self.get(key) != Some("false")
    }

    /// Number of keys parsed.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no keys were parsed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================
// PIXEL FORMAT SELECTION
// ============================================

/// The two pixel formats the probe runs the pipeline in.
///
/// The whole point of the tool is comparing these: with `Srgb` the
/// GPU applies gamma conversion on reads and writes, with `Linear`
/// the same bytes pass through untouched. Kept platform-independent
/// here; the Windows modules map it to the DXGI constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// DXGI_FORMAT_B8G8R8A8_UNORM_SRGB
    Bgra8Srgb,
    /// DXGI_FORMAT_B8G8R8A8_UNORM
    Bgra8Linear,
}

impl PixelFormat {
    /// Selects the pipeline format from the sRGB toggle.
    pub fn from_srgb_flag(srgb: bool) -> Self {
        if srgb {
            Self::Bgra8Srgb
        } else {
            Self::Bgra8Linear
        }
    }
}

#[cfg(windows)]
impl PixelFormat {
    /// The DXGI constant for this format.
    pub fn to_dxgi(self) -> windows::Win32::Graphics::Dxgi::Common::DXGI_FORMAT {
        use windows::Win32::Graphics::Dxgi::Common::{
            DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
        };

        match self {
            Self::Bgra8Srgb => DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
            Self::Bgra8Linear => DXGI_FORMAT_B8G8R8A8_UNORM,
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

/// All configuration options for the gamma probe.
#[derive(Clone, Debug)]
pub struct Config {
    /// Treat the back buffer and textures as gamma-encoded (sRGB).
    ///
    /// ## Default
    /// On. Pass `-sRGB false` to compare against the linear pipeline.
    pub srgb: bool,

    /// Optional source image file (`-texture <path>`).
    ///
    /// When absent the built-in generated gamma pattern is used.
    pub texture_path: Option<PathBuf>,

    /// Slots per eye texture ring (1..=3).
    ///
    /// Three slots let the compositor read a previously submitted
    /// image while we write the next one.
    pub ring_slots: usize,

    /// Title of the mirror window.
    pub window_title: String,
}

impl Config {
    /// Builds a configuration from a free-form argument string.
    pub fn from_args(args: &str) -> Self {
        let map = ArgMap::parse(args);

        Self {
            srgb: map.bool_default_on("sRGB"),
            texture_path: map
                .get("texture")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            ..Self::default()
        }
    }

    /// The pipeline pixel format implied by the sRGB toggle.
    pub fn pixel_format(&self) -> PixelFormat {
        PixelFormat::from_srgb_flag(self.srgb)
    }

    /// Validates the configuration and returns errors if invalid.
    ///
    /// Returns a list of problems, or empty if all is well.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.ring_slots == 0 || self.ring_slots > 3 {
            errors.push(ConfigError::InvalidRingSlots(self.ring_slots));
        }

        if self.window_title.is_empty() {
            errors.push(ConfigError::EmptyWindowTitle);
        }

        errors
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            srgb: true,
            texture_path: None,
            ring_slots: 3,
            window_title: "Gamma Probe (DX11)".to_string(),
        }
    }
}

// ============================================
// CONFIGURATION ERRORS
// ============================================

/// Errors that can occur with configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Ring slot count is outside the supported range.
    #[error("ring slot count {0} is outside valid range (1-3)")]
    InvalidRingSlots(usize),

    /// Window title must not be empty.
    #[error("window title must not be empty")]
    EmptyWindowTitle,
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_false() {
        let config = Config::from_args("-sRGB false");
        assert!(!config.srgb);
        assert_eq!(config.pixel_format(), PixelFormat::Bgra8Linear);
    }

    #[test]
    fn test_srgb_true() {
        let config = Config::from_args("-sRGB true");
        assert!(config.srgb);
        assert_eq!(config.pixel_format(), PixelFormat::Bgra8Srgb);
    }

    #[test]
    fn test_srgb_default_on() {
        let config = Config::from_args("");
        assert!(config.srgb);

        // Any value other than the literal "false" leaves it on.
        let config = Config::from_args("-sRGB yes");
        assert!(config.srgb);
    }

    #[test]
    fn test_texture_path() {
        let config = Config::from_args("-texture gamma-test.dds -sRGB false");
        assert_eq!(config.texture_path, Some(PathBuf::from("gamma-test.dds")));
        assert!(!config.srgb);
    }

    #[test]
    fn test_bare_flag_and_unrecognized_keys() {
        let map = ArgMap::parse("-fullscreen -sRGB false -unknown thing");
        assert_eq!(map.get("fullscreen"), Some(""));
        assert_eq!(map.get("sRGB"), Some("false"));
        assert_eq!(map.get("unknown"), Some("thing"));
        assert_eq!(map.len(), 3);
        assert!(!map.is_empty());
    }

    #[test]
    fn test_stray_value_skipped() {
        let map = ArgMap::parse("orphan -sRGB false");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("sRGB"), Some("false"));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.ring_slots, 3);
        assert!(config.texture_path.is_none());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();

        config.ring_slots = 4;
        assert!(!config.validate().is_empty());

        config.ring_slots = 3;
        assert!(config.validate().is_empty());

        config.window_title = String::new();
        assert!(!config.validate().is_empty());
    }
}
