//! Infrastructure layer - adapters implementing the application ports

pub mod config;
pub mod export;
pub mod monitor;
pub mod recording;

pub use config::XdgConfigStore;
pub use export::{ExportError, RecordingExporter};
pub use monitor::{MonitorFeed, RodioMixer};
pub use recording::{CpalCapture, CpalStream, WavChunkEncoder};
