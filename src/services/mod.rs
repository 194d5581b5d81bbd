pub mod capture;
pub mod clock;
pub mod dispatcher;
pub mod expose_tracking;
pub mod gesture_engine;
pub mod gesture_resolver;
pub mod host;
pub mod scheduler;
pub mod window_actions;

pub use capture::create_capture_source;
pub use clock::{Clock, SystemClock};
pub use gesture_engine::{EngineSettings, GestureEngine};
pub use host::{GestureHost, HostHandle};
pub use window_actions::create_window_actions;
