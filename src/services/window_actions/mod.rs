//! WindowActions service: responsibility and boundaries
//!
//! This module and its submodules ONLY perform window/process actions and answer
//! state queries (frontmost app, hidden, minimized, window counts). They MUST NOT
//! contain gesture decisions or Exposé tracking; those belong to the gesture engine.

mod command;
mod simulated;
mod r#trait;

pub use self::command::CommandWindowActions;
pub use self::r#trait::{create_window_actions, WindowActions};
pub use self::simulated::{DesktopCall, SimulatedDesktop};
