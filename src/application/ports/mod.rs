//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod encoder;
pub mod mixer;

// Re-export common types
pub use capture::{CaptureDevice, CaptureError, CaptureStream};
pub use config::ConfigStore;
pub use encoder::{AudioEncoder, EncoderError, EncoderState};
pub use mixer::{MixingError, MixingGraph};
