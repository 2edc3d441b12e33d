//! Capture constraints value object

use std::fmt;

use crate::domain::error::ConstraintError;

/// Maximum channel count a capture may request
pub const MAX_CHANNELS: u16 = 2;

/// Requested properties of the microphone stream.
/// Each processing feature is toggled independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureConstraints {
    pub auto_gain_control: bool,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub channel_count: u16,
}

impl Default for CaptureConstraints {
    /// Unprocessed mono capture
    fn default() -> Self {
        Self {
            auto_gain_control: false,
            echo_cancellation: false,
            noise_suppression: false,
            channel_count: 1,
        }
    }
}

impl CaptureConstraints {
    /// Check the constraints are self-consistent
    pub fn validate(&self) -> Result<(), ConstraintError> {
        if self.channel_count == 0 || self.channel_count > MAX_CHANNELS {
            return Err(ConstraintError::ChannelCount(self.channel_count));
        }
        Ok(())
    }

    /// Names of the signal-processing features that are switched on
    pub fn requested_processing(&self) -> Vec<&'static str> {
        [
            (self.auto_gain_control, "auto gain control"),
            (self.echo_cancellation, "echo cancellation"),
            (self.noise_suppression, "noise suppression"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

impl fmt::Display for CaptureConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let processing = self.requested_processing();
        write!(f, "{} ch", self.channel_count)?;
        if processing.is_empty() {
            write!(f, ", raw")
        } else {
            write!(f, ", {}", processing.join(", "))
        }
    }
}
