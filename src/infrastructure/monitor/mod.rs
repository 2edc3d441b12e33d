//! Live monitoring infrastructure module
//!
//! Provides the process-wide output path the microphone is monitored through.

mod rodio_mixer;

pub use rodio_mixer::{MonitorFeed, RodioMixer};
