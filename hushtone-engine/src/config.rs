//! Engine configuration, loadable from TOML.
//!
//! ```toml
//! device = "USB Audio"
//! sample_rate = 48000
//! master_gain = 0.8
//! buffer_seconds = 2.0
//! alarm_gain = 0.3
//! fade_ms = 100
//! seed = 7
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Length of a noise buffer when no duration is requested.
pub const DEFAULT_BUFFER_SECONDS: f32 = 2.0;

/// Peak gain of alarm tones.
pub const DEFAULT_ALARM_GAIN: f32 = 0.3;

/// Fade-in (and fade-out, when bounded) of alarm tones.
pub const DEFAULT_FADE_MS: u32 = 100;

/// Longest accepted alarm fade.
pub const MAX_FADE_MS: u32 = 5_000;

/// Settings for a [`SoundEngine`](crate::SoundEngine) and its output backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Output device name (substring match). Default device if `None`.
    pub device: Option<String>,
    /// Requested sample rate in Hz. Device default if `None`.
    pub sample_rate: Option<u32>,
    /// Requested channel count. Device default if `None`.
    pub channels: Option<u16>,
    /// Linear gain applied after every graph, in [0, 1].
    pub master_gain: f32,
    /// Noise buffer length when no duration is given.
    pub buffer_seconds: f32,
    /// Peak gain of alarm tones, in [0, 1].
    pub alarm_gain: f32,
    /// Alarm fade length in milliseconds, at most [`MAX_FADE_MS`].
    pub fade_ms: u32,
    /// Seed for texture noise. Fresh entropy if `None`.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: None,
            channels: None,
            master_gain: 1.0,
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            alarm_gain: DEFAULT_ALARM_GAIN,
            fade_ms: DEFAULT_FADE_MS,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: EngineConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject values the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        check_unit("master_gain", self.master_gain)?;
        check_unit("alarm_gain", self.alarm_gain)?;
        if !(self.buffer_seconds.is_finite() && self.buffer_seconds > 0.0 && self.buffer_seconds <= 60.0) {
            return Err(EngineError::InvalidConfig {
                field: "buffer_seconds",
                reason: format!("{} is outside (0, 60]", self.buffer_seconds),
            });
        }
        if self.fade_ms > MAX_FADE_MS {
            return Err(EngineError::InvalidConfig {
                field: "fade_ms",
                reason: format!("{} ms is longer than {MAX_FADE_MS} ms", self.fade_ms),
            });
        }
        if self.sample_rate == Some(0) {
            return Err(EngineError::InvalidConfig {
                field: "sample_rate",
                reason: "must be positive".to_string(),
            });
        }
        if self.channels == Some(0) {
            return Err(EngineError::InvalidConfig {
                field: "channels",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn check_unit(field: &'static str, v: f32) -> Result<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig {
            field,
            reason: format!("{v} is outside [0, 1]"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_is_default() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        assert_eq!(cfg.buffer_seconds, 2.0);
        assert_eq!(cfg.fade_ms, 100);
    }

    #[test]
    fn parses_all_keys() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            device = "USB"
            sample_rate = 44100
            channels = 2
            master_gain = 0.5
            buffer_seconds = 3.0
            alarm_gain = 0.25
            fade_ms = 50
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(cfg.device.as_deref(), Some("USB"));
        assert_eq!(cfg.sample_rate, Some(44_100));
        assert_eq!(cfg.channels, Some(2));
        assert_eq!(cfg.alarm_gain, 0.25);
        assert_eq!(cfg.seed, Some(42));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = EngineConfig::from_toml_str("volume = 3").unwrap_err();
        assert!(matches!(err, EngineError::ParseConfig(_)), "{err}");
    }

    #[test]
    fn rejects_out_of_range_gain() {
        let err = EngineConfig::from_toml_str("master_gain = 1.5").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { field: "master_gain", .. }), "{err}");
    }

    #[test]
    fn rejects_zero_buffer() {
        let err = EngineConfig::from_toml_str("buffer_seconds = 0.0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { field: "buffer_seconds", .. }));
    }

    #[test]
    fn bounds_fade_length() {
        assert_eq!(EngineConfig::from_toml_str("fade_ms = 5000").unwrap().fade_ms, MAX_FADE_MS);
        assert_eq!(EngineConfig::from_toml_str("fade_ms = 0").unwrap().fade_ms, 0);
        let err = EngineConfig::from_toml_str("fade_ms = 5001").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { field: "fade_ms", .. }), "{err}");
    }

    #[test]
    fn loads_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "fade_ms = 80").unwrap();
        let cfg = EngineConfig::load(f.path()).unwrap();
        assert_eq!(cfg.fade_ms, 80);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, EngineError::ReadConfig { .. }));
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
