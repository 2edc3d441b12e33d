//! Recording session domain

mod intent;
mod state;

pub use intent::Intent;
pub use state::{InvalidTransition, RecordingState, Session, Transition};
