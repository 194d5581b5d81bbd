//! Gesture decision engine for the dock: clicks and scrolls on app icons become
//! window-management actions, everything else passes through to the dock untouched.

pub mod actions;
pub mod config;
pub mod error;
pub mod events;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{DockError, Result};
