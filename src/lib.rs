//! Record a screen region at a steady frame rate and export it as a
//! palette-quantized, forever-looping GIF.
//!
//! - `capture`: frames, regions, frame sources and the timer-paced
//!   [`CaptureLoop`]
//! - `encode`: colour reduction and GIF assembly in [`AnimationEncoder`]

pub mod capture;
pub mod encode;
pub mod error;
pub mod utils;

use std::path::Path;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

pub use capture::{
    CaptureLoop, CaptureRegion, ChannelOrder, Frame, FrameSequence, PixelFormat, RegionSelection,
};
pub use encode::{AnimationEncoder, EncodingSettings, Quality, SequenceMetadata};
pub use error::{CaptureError, EncodeError};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub encode: EncodingSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub fps: u32,
    pub min_region_size: u32,
    /// Upper bound on waiting for the capture thread in `stop`
    pub stop_timeout_ms: u64,
    /// End the recording after this many failed grabs in a row (0 = never)
    pub max_consecutive_failures: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, `RUST_LOG` wins if set
    pub filter: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: 15,
            min_region_size: capture::MIN_REGION_SIZE,
            stop_timeout_ms: 2000,
            max_consecutive_failures: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "opencut=info".into(),
        }
    }
}

impl Config {
    /// Defaults, overlaid by an optional TOML file, overlaid by
    /// `OPENCUT__SECTION__KEY` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("OPENCUT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Encoding settings with the capture rate as the playback rate
    pub fn encoding_settings(&self) -> EncodingSettings {
        EncodingSettings {
            frames_per_second: self.capture.fps,
            ..self.encode.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_without_file_gives_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.capture, CaptureConfig::default());
        assert_eq!(config.encode, EncodingSettings::default());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[capture]\nfps = 24\nmax_consecutive_failures = 5\n\n[encode]\nquality = \"high\"\nsource_channel_order = \"bgr\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.capture.fps, 24);
        assert_eq!(config.capture.max_consecutive_failures, 5);
        assert_eq!(config.capture.stop_timeout_ms, 2000);
        assert_eq!(config.encode.quality, Quality::High);
        assert_eq!(config.encode.source_channel_order, ChannelOrder::Bgr);
        assert_eq!(config.logging.filter, "opencut=info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/opencut.toml"))).is_err());
    }

    #[test]
    fn test_encoding_settings_follow_capture_rate() {
        let mut config = Config::default();
        config.capture.fps = 30;
        config.encode.quality = Quality::Low;
        let settings = config.encoding_settings();
        assert_eq!(settings.frames_per_second, 30);
        assert_eq!(settings.quality, Quality::Low);
    }

    #[test]
    fn test_global_config_swaps() {
        let mut config = Config::default();
        config.capture.fps = 42;
        CONFIG.store(std::sync::Arc::new(config));
        assert_eq!(CONFIG.load().capture.fps, 42);
        CONFIG.store(std::sync::Arc::new(Config::default()));
    }
}
