//! Configuration for the monitor and its pipeline.
//!
//! Every field has a default, so a JSON file only needs the keys it
//! overrides.
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use crate::drivers::{
    ChannelExclusion, ClassifierThresholds, NeuroStateError, SpectralMethod, WarmupPolicy,
    WindowFunction,
};
/// Longest analysed window; one hour.
pub const MAX_WINDOW_SECONDS: f64 = 3600.0;
/// Knobs of the buffering/classification loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Length of the analysed window.
    pub window_seconds: f64,
    /// Minimum time between two emitted results.
    pub update_interval_secs: f64,
    /// Sleep between loop iterations.
    pub poll_interval_ms: u64,
    pub pull_timeout_ms: u64,
    pub max_chunk_samples: usize,
    /// Number of raw labels in the majority vote.
    pub smoothing_window: usize,
    pub window_function: WindowFunction,
    pub method: SpectralMethod,
    pub auxiliary_channel: ChannelExclusion,
    /// Channels whose ratios feed the advisory brain-state report.
    pub frontal_channels: Vec<String>,
    pub warmup: WarmupPolicy,
    pub thresholds: ClassifierThresholds,
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_seconds: 4.0,
            update_interval_secs: 3.0,
            poll_interval_ms: 100,
            pull_timeout_ms: 0,
            max_chunk_samples: 1024,
            smoothing_window: 5,
            window_function: WindowFunction::Hamming,
            method: SpectralMethod::Periodogram,
            auxiliary_channel: ChannelExclusion::Last,
            frontal_channels: vec!["AF7".into(), "AF8".into()],
            warmup: WarmupPolicy::BufferFill,
            thresholds: ClassifierThresholds::default(),
        }
    }
}
/// Rejects values `Duration` cannot hold (negative, NaN or too large).
fn checked_seconds(name: &str, seconds: f64) -> Result<Duration, NeuroStateError> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        NeuroStateError::InvalidConfig(format!("{name} is not a usable duration: {seconds}"))
    })
}
impl PipelineConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.update_interval_secs).unwrap_or(Duration::MAX)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn pull_timeout(&self) -> Duration {
        Duration::from_millis(self.pull_timeout_ms)
    }
    pub fn validate(&self) -> Result<(), NeuroStateError> {
        if checked_seconds("window_seconds", self.window_seconds)?.is_zero() {
            return Err(NeuroStateError::InvalidConfig(format!(
                "window_seconds must be positive, got {}",
                self.window_seconds
            )));
        }
        if self.window_seconds > MAX_WINDOW_SECONDS {
            return Err(NeuroStateError::InvalidConfig(format!(
                "window_seconds must be at most {MAX_WINDOW_SECONDS}, got {}",
                self.window_seconds
            )));
        }
        if checked_seconds("update_interval_secs", self.update_interval_secs)?.is_zero() {
            return Err(NeuroStateError::InvalidConfig(format!(
                "update_interval_secs must be positive, got {}",
                self.update_interval_secs
            )));
        }
        if self.smoothing_window == 0 {
            return Err(NeuroStateError::InvalidConfig(
                "smoothing_window must be at least 1".into(),
            ));
        }
        if self.max_chunk_samples == 0 {
            return Err(NeuroStateError::InvalidConfig(
                "max_chunk_samples must be at least 1".into(),
            ));
        }
        if let SpectralMethod::Welch {
            segment_seconds,
            overlap,
        } = self.method
        {
            if !segment_seconds.is_finite() || segment_seconds <= 0.0 {
                return Err(NeuroStateError::InvalidConfig(format!(
                    "welch segment_seconds must be positive, got {segment_seconds}"
                )));
            }
            if !(0.0..1.0).contains(&overlap) {
                return Err(NeuroStateError::InvalidConfig(format!(
                    "welch overlap must be in [0, 1), got {overlap}"
                )));
            }
        }
        if let WarmupPolicy::FixedDelay { seconds } = self.warmup {
            checked_seconds("warm-up delay", seconds)?;
        }
        self.thresholds.validate()
    }
}
/// Top-level settings of the `neurostate` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub stream_type: String,
    pub discovery_timeout_secs: f64,
    pub discovery_retry_ms: u64,
    /// Where CSV recordings are written.
    pub recording_dir: PathBuf,
    pub pipeline: PipelineConfig,
}
impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stream_type: "EEG".into(),
            discovery_timeout_secs: 10.0,
            discovery_retry_ms: 1000,
            recording_dir: PathBuf::from("."),
            pipeline: PipelineConfig::default(),
        }
    }
}
impl MonitorConfig {
    /// Reads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_json(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }
    pub fn from_json(content: &str) -> Result<Self> {
        let config: MonitorConfig =
            serde_json::from_str(content).context("failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }
    /// Loads `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
    pub fn discovery_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.discovery_timeout_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
    pub fn discovery_retry(&self) -> Duration {
        Duration::from_millis(self.discovery_retry_ms)
    }
    pub fn validate(&self) -> Result<(), NeuroStateError> {
        if self.stream_type.trim().is_empty() {
            return Err(NeuroStateError::InvalidConfig(
                "stream_type must not be empty".into(),
            ));
        }
        checked_seconds("discovery_timeout_secs", self.discovery_timeout_secs)?;
        self.pipeline.validate()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    #[test]
    fn defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.update_interval(), Duration::from_secs(3));
        assert_eq!(config.pipeline.smoothing_window, 5);
        assert_eq!(config.pipeline.window_function, WindowFunction::Hamming);
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let config = MonitorConfig::from_json(
            r#"{
                "stream_type": "ExG",
                "pipeline": {
                    "window_function": "hann",
                    "method": { "welch": { "segment_seconds": 1.0, "overlap": 0.5 } },
                    "auxiliary_channel": { "named": "Right AUX" },
                    "warmup": { "fixed_delay": { "seconds": 5.0 } },
                    "thresholds": { "drowsy_theta_beta": 3.0 }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.stream_type, "ExG");
        assert_eq!(config.discovery_timeout_secs, 10.0);
        let p = &config.pipeline;
        assert_eq!(p.window_function, WindowFunction::Hann);
        assert_eq!(
            p.method,
            SpectralMethod::Welch {
                segment_seconds: 1.0,
                overlap: 0.5
            }
        );
        assert_eq!(p.auxiliary_channel, ChannelExclusion::Named("Right AUX".into()));
        assert_eq!(p.warmup, WarmupPolicy::FixedDelay { seconds: 5.0 });
        assert_eq!(p.thresholds.drowsy_theta_beta, 3.0);
        assert_eq!(p.thresholds.microsleep_delta, 0.4);
        assert_eq!(p.window_seconds, 4.0);
    }
    #[test]
    fn unit_variants_parse_as_strings() {
        let config = MonitorConfig::from_json(
            r#"{ "pipeline": { "auxiliary_channel": "none", "warmup": "buffer_fill", "method": "periodogram" } }"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.auxiliary_channel, ChannelExclusion::None);
    }
    #[test]
    fn invalid_values_are_rejected() {
        assert!(MonitorConfig::from_json(r#"{ "pipeline": { "smoothing_window": 0 } }"#).is_err());
        assert!(MonitorConfig::from_json(r#"{ "pipeline": { "window_seconds": -1.0 } }"#).is_err());
        assert!(MonitorConfig::from_json(
            r#"{ "pipeline": { "method": { "welch": { "segment_seconds": 1.0, "overlap": 1.5 } } } }"#
        )
        .is_err());
        assert!(MonitorConfig::from_json(r#"{ "stream_type": "  " }"#).is_err());
        assert!(MonitorConfig::from_json("not json").is_err());
    }
    #[test]
    fn oversized_durations_are_rejected() {
        for json in [
            r#"{ "pipeline": { "update_interval_secs": 1e20 } }"#,
            r#"{ "pipeline": { "window_seconds": 1e20 } }"#,
            r#"{ "pipeline": { "window_seconds": 7200.0 } }"#,
            r#"{ "pipeline": { "warmup": { "fixed_delay": { "seconds": 1e20 } } } }"#,
            r#"{ "pipeline": { "warmup": { "fixed_delay": { "seconds": -1.0 } } } }"#,
            r#"{ "discovery_timeout_secs": 1e20 }"#,
        ] {
            assert!(MonitorConfig::from_json(json).is_err(), "accepted {json}");
        }
        let unchecked = PipelineConfig {
            update_interval_secs: 1e20,
            ..PipelineConfig::default()
        };
        assert!(matches!(unchecked.validate(), Err(NeuroStateError::InvalidConfig(_))));
        assert_eq!(unchecked.update_interval(), Duration::MAX);
        let config = MonitorConfig {
            discovery_timeout_secs: 1e20,
            ..MonitorConfig::default()
        };
        assert_eq!(config.discovery_timeout(), Duration::MAX);
        let hour = MonitorConfig::from_json(r#"{ "pipeline": { "window_seconds": 3600.0 } }"#);
        assert!(hour.is_ok());
    }
    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "pipeline": {{ "update_interval_secs": 1.5 }} }}"#).unwrap();
        let config = MonitorConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.pipeline.update_interval(), Duration::from_millis(1500));
        assert!(MonitorConfig::load(Path::new("/definitely/missing.json")).is_err());
        assert_eq!(MonitorConfig::load_or_default(None).unwrap(), MonitorConfig::default());
    }
}
