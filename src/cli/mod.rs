//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, signal handling,
//! the control socket and the session runner.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod ctl_cmd;
pub mod logging;
pub mod pid_file;
pub mod presenter;
pub mod signals;
pub mod socket;

pub use app::{run_session, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, CtlAction, SessionOptions};
pub use ctl_cmd::handle_ctl_command;
pub use presenter::Presenter;
