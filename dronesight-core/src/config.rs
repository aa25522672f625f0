// Configuration system for the dronesight relay

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Which detector implementation the server constructs at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackend {
    /// Always reports an empty detection set
    None,
    /// YOLOv8 ONNX model through ONNX Runtime
    Onnx,
}

/// Listening socket and routes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_address: String,
    pub port: u16,
    pub analyze_path: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            analyze_path: "/analyze".to_string(),
        }
    }
}

/// Bounds on incoming work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted text message, in bytes
    pub max_message_bytes: usize,
    /// Detector calls allowed in flight across all sessions
    pub max_concurrent_inferences: usize,
    /// Optional upper bound on one detector call
    pub inference_timeout_ms: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 8 * 1024 * 1024,
            max_concurrent_inferences: 1,
            inference_timeout_ms: None,
        }
    }
}

impl LimitsConfig {
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_ms.map(Duration::from_millis)
    }
}

/// Detector construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub backend: DetectorBackend,
    pub model_path: Option<PathBuf>,
    /// One class name per line; COCO names when absent
    pub labels_path: Option<PathBuf>,
    pub input_size: u32,
    pub score_threshold: f32,
    pub iou_threshold: f32,
    /// Detections kept per frame after NMS
    pub max_detections: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            backend: DetectorBackend::None,
            model_path: None,
            labels_path: None,
            input_size: 640,
            score_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// Complete relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub network: NetworkConfig,
    pub limits: LimitsConfig,
    pub detector: DetectorConfig,
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            limits: LimitsConfig::default(),
            detector: DetectorConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a JSON or TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        content.parse()
    }

    /// Defaults overlaid with environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Overlay `DRONESIGHT_*` environment variables onto this configuration
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("DRONESIGHT_HOST") {
            self.network.bind_address = host;
        }

        if let Ok(port) = std::env::var("DRONESIGHT_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                self.network.port = p;
            }
        }

        if let Ok(model) = std::env::var("DRONESIGHT_MODEL") {
            self.detector.model_path = Some(PathBuf::from(model));
            self.detector.backend = DetectorBackend::Onnx;
        }

        if let Ok(log_level) = std::env::var("DRONESIGHT_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.port == 0 {
            return Err(ConfigError::Validation("network.port cannot be 0".to_string()));
        }

        if !self.network.analyze_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "network.analyze_path must start with '/'".to_string(),
            ));
        }

        if self.limits.max_message_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits.max_message_bytes must be > 0".to_string(),
            ));
        }

        if self.limits.max_concurrent_inferences == 0 {
            return Err(ConfigError::Validation(
                "limits.max_concurrent_inferences must be > 0".to_string(),
            ));
        }

        if self.limits.inference_timeout_ms == Some(0) {
            return Err(ConfigError::Validation(
                "limits.inference_timeout_ms must be > 0 when set".to_string(),
            ));
        }

        if self.detector.input_size == 0 {
            return Err(ConfigError::Validation(
                "detector.input_size must be > 0".to_string(),
            ));
        }

        if self.detector.max_detections == 0 {
            return Err(ConfigError::Validation(
                "detector.max_detections must be > 0".to_string(),
            ));
        }

        for (name, value) in [
            ("detector.score_threshold", self.detector.score_threshold),
            ("detector.iou_threshold", self.detector.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.detector.backend == DetectorBackend::Onnx && self.detector.model_path.is_none() {
            return Err(ConfigError::Validation(
                "detector.model_path is required for the onnx backend".to_string(),
            ));
        }

        Ok(())
    }
}

impl FromStr for RelayConfig {
    type Err = ConfigError;

    /// Parse configuration text, trying JSON first and then TOML
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        if let Ok(config) = serde_json::from_str::<RelayConfig>(content) {
            return Ok(config);
        }

        toml::from_str::<RelayConfig>(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
