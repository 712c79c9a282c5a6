use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Logging settings
    pub log: LogConfig,
    /// Video frame settings
    pub video: VideoConfig,
}

impl BridgeConfig {
    /// Parse a (possibly partial) JSON document, filling gaps with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no frame or logger could work with
    pub fn validate(&self) -> Result<()> {
        if self.video.max_frame_dimension == 0 {
            return Err(BridgeError::Config(
                "video.max_frame_dimension must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Log verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `EnvFilter` directive for this level
    pub fn filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "rtc_bridge=error",
            LogLevel::Warn => "rtc_bridge=warn",
            LogLevel::Info => "rtc_bridge=info",
            LogLevel::Debug => "rtc_bridge=debug",
            LogLevel::Trace => "rtc_bridge=trace",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level (`RUST_LOG` takes precedence)
    pub level: LogLevel,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Minimum seconds between repeated hot-path warnings
    pub throttle_secs: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
            throttle_secs: 5,
        }
    }
}

/// Video frame configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Largest accepted width or height; bigger frames are refused at construction
    pub max_frame_dimension: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_frame_dimension: 16384,
        }
    }
}
