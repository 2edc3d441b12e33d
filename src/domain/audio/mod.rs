//! Audio routing value objects

mod constraints;
mod gain;

pub use constraints::{CaptureConstraints, MAX_CHANNELS};
pub use gain::{
    GainAutomation, GainSchedule, GainStep, MUTE_FLOOR, MUTE_SNAP_DELAY, RAMP_DURATION,
    UNITY_GAIN,
};
