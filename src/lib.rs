//! Voice Recorder - microphone recording with live monitoring
//!
//! Records from the microphone into WAV or raw PCM with pause/resume,
//! optionally routing the live input to the speakers, and exports every
//! finished recording to disk.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Session state machine, value objects, gain automation and errors
//! - **Application**: Session controller, resource owner and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal capture, rodio output, export, config)
//! - **CLI**: Command-line interface, control socket and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
