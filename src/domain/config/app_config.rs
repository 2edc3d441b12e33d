//! Application configuration value object

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::audio::CaptureConstraints;
use crate::domain::recording::{AudioFormat, Duration};

/// Capture constraint overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintsConfig {
    pub auto_gain_control: Option<bool>,
    pub echo_cancellation: Option<bool>,
    pub noise_suppression: Option<bool>,
    pub channel_count: Option<u16>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub format: Option<String>,
    pub chunk_interval: Option<String>,
    pub output_dir: Option<String>,
    pub input_device: Option<String>,
    pub monitor: Option<bool>,
    pub constraints: Option<ConstraintsConfig>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        let constraints = CaptureConstraints::default();
        Self {
            format: Some(AudioFormat::default().to_string()),
            chunk_interval: Some(Duration::default_chunk_interval().to_string()),
            output_dir: None,
            input_device: None,
            monitor: Some(false),
            constraints: Some(ConstraintsConfig {
                auto_gain_control: Some(constraints.auto_gain_control),
                echo_cancellation: Some(constraints.echo_cancellation),
                noise_suppression: Some(constraints.noise_suppression),
                channel_count: Some(constraints.channel_count),
            }),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            format: other.format.or(self.format),
            chunk_interval: other.chunk_interval.or(self.chunk_interval),
            output_dir: other.output_dir.or(self.output_dir),
            input_device: other.input_device.or(self.input_device),
            monitor: other.monitor.or(self.monitor),
            constraints: Self::merge_constraints(self.constraints, other.constraints),
        }
    }

    /// Merge constraint sections
    fn merge_constraints(
        base: Option<ConstraintsConfig>,
        other: Option<ConstraintsConfig>,
    ) -> Option<ConstraintsConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(ConstraintsConfig {
                auto_gain_control: o.auto_gain_control.or(b.auto_gain_control),
                echo_cancellation: o.echo_cancellation.or(b.echo_cancellation),
                noise_suppression: o.noise_suppression.or(b.noise_suppression),
                channel_count: o.channel_count.or(b.channel_count),
            }),
        }
    }

    /// Get format as parsed AudioFormat, or default if not set/invalid
    pub fn format_or_default(&self) -> AudioFormat {
        self.format
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Get chunk interval as parsed Duration, or default if not set/invalid
    pub fn chunk_interval_or_default(&self) -> Duration {
        self.chunk_interval
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_chunk_interval)
    }

    /// Get monitor setting, or false if not set
    pub fn monitor_or_default(&self) -> bool {
        self.monitor.unwrap_or(false)
    }

    /// Get the preferred input device name, if any
    pub fn input_device(&self) -> Option<&str> {
        self.input_device.as_deref()
    }

    /// Get the output directory, if configured
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(PathBuf::from)
    }

    /// Build capture constraints, filling unset fields with defaults
    pub fn constraints_or_default(&self) -> CaptureConstraints {
        let defaults = CaptureConstraints::default();
        let Some(c) = self.constraints.as_ref() else {
            return defaults;
        };
        CaptureConstraints {
            auto_gain_control: c.auto_gain_control.unwrap_or(defaults.auto_gain_control),
            echo_cancellation: c.echo_cancellation.unwrap_or(defaults.echo_cancellation),
            noise_suppression: c.noise_suppression.unwrap_or(defaults.noise_suppression),
            channel_count: c.channel_count.unwrap_or(defaults.channel_count),
        }
    }
}
