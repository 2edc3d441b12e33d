//! Configuration infrastructure module

mod xdg;

pub use xdg::{XdgConfigStore, APP_DIR, CONFIG_FILE};
