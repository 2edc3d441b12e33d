//! Application layer - Session components and port interfaces
//!
//! Contains the session controller, the resources it drives, and the
//! trait definitions for capture, encoding, mixing and config storage.

pub mod controller;
pub mod error;
pub mod ports;
pub mod resources;

#[cfg(test)]
pub(crate) mod fakes;

// Re-export session components
pub use controller::{
    Outcome, SessionController, SessionEvent, SessionHandle, SessionSnapshot, TickToken,
    TICK_INTERVAL,
};
pub use error::SessionError;
pub use resources::{SessionResources, SourceOf};
