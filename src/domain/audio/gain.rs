//! Monitoring gain ramps
//!
//! A [`GainSchedule`] describes a click-free mute or unmute as a list of
//! timed steps. [`GainAutomation`] evaluates a schedule against elapsed
//! audio time so the output path can apply it sample by sample.

use std::collections::VecDeque;
use std::time::Duration as StdDuration;

/// Lowest non-zero gain a mute ramps to before snapping to silence
pub const MUTE_FLOOR: f32 = 1e-8;

/// Length of the mute and unmute ramps
pub const RAMP_DURATION: StdDuration = StdDuration::from_millis(50);

/// Delay between reaching the floor and snapping to exact zero
pub const MUTE_SNAP_DELAY: StdDuration = StdDuration::from_millis(10);

/// Full monitoring gain
pub const UNITY_GAIN: f32 = 1.0;

/// One timed change of the gain value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainStep {
    /// Move linearly from the current value to `target` over `over`
    Ramp { target: f32, over: StdDuration },
    /// Hold the current value for `after`, then jump to `value`
    Set { value: f32, after: StdDuration },
}

impl GainStep {
    fn length(&self) -> StdDuration {
        match self {
            Self::Ramp { over, .. } => *over,
            Self::Set { after, .. } => *after,
        }
    }

    fn end_value(&self) -> f32 {
        match self {
            Self::Ramp { target, .. } => *target,
            Self::Set { value, .. } => *value,
        }
    }
}

/// Sequence of gain steps applied back to back
#[derive(Debug, Clone, PartialEq)]
pub struct GainSchedule {
    steps: Vec<GainStep>,
}

impl GainSchedule {
    /// Ramp down to the floor, then snap to zero
    pub fn mute() -> Self {
        Self {
            steps: vec![
                GainStep::Ramp {
                    target: MUTE_FLOOR,
                    over: RAMP_DURATION,
                },
                GainStep::Set {
                    value: 0.0,
                    after: MUTE_SNAP_DELAY,
                },
            ],
        }
    }

    /// Start from the floor and ramp up to full gain
    pub fn unmute() -> Self {
        Self {
            steps: vec![
                GainStep::Set {
                    value: MUTE_FLOOR,
                    after: StdDuration::ZERO,
                },
                GainStep::Ramp {
                    target: UNITY_GAIN,
                    over: RAMP_DURATION,
                },
            ],
        }
    }

    pub fn steps(&self) -> &[GainStep] {
        &self.steps
    }

    /// Gain once every step has run
    pub fn final_value(&self) -> Option<f32> {
        self.steps.last().map(GainStep::end_value)
    }

    /// Time from the first step to the last
    pub fn total_duration(&self) -> StdDuration {
        self.steps.iter().map(GainStep::length).sum()
    }
}

/// Running evaluation of gain schedules
#[derive(Debug, Clone)]
pub struct GainAutomation {
    value: f32,
    steps: VecDeque<GainStep>,
    step_origin: f32,
    step_elapsed: f64,
}

impl GainAutomation {
    pub fn new(initial: f32) -> Self {
        Self {
            value: initial,
            steps: VecDeque::new(),
            step_origin: initial,
            step_elapsed: 0.0,
        }
    }

    /// Replace any pending steps with `schedule`, starting from the current value
    pub fn schedule(&mut self, schedule: &GainSchedule) {
        self.steps = schedule.steps().iter().copied().collect();
        self.step_origin = self.value;
        self.step_elapsed = 0.0;
    }

    /// Move the automation forward by `dt` seconds of audio time
    pub fn advance(&mut self, dt: f64) {
        let mut remaining = dt;

        while let Some(step) = self.steps.front().copied() {
            let length = step.length().as_secs_f64();
            let left = length - self.step_elapsed;

            if remaining < left {
                self.step_elapsed += remaining;
                if let GainStep::Ramp { target, .. } = step {
                    let progress = (self.step_elapsed / length) as f32;
                    self.value = self.step_origin + (target - self.step_origin) * progress;
                }
                return;
            }

            remaining -= left;
            self.value = step.end_value();
            self.steps.pop_front();
            self.step_origin = self.value;
            self.step_elapsed = 0.0;
        }
    }

    /// Run every pending step to completion
    pub fn settle(&mut self) {
        if let Some(last) = self.steps.back() {
            self.value = last.end_value();
        }
        self.steps.clear();
        self.step_origin = self.value;
        self.step_elapsed = 0.0;
    }

    /// Current gain
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Gain the automation is heading to
    pub fn target(&self) -> f32 {
        self.steps.back().map_or(self.value, GainStep::end_value)
    }

    pub fn is_settled(&self) -> bool {
        self.steps.is_empty()
    }
}
