//! Capture bridges: where dock events come from and where their dispositions go.

mod dry_run;
mod line_protocol;
mod r#trait;

pub use self::dry_run::{DryRunCapture, LoggingFeedback};
pub use self::line_protocol::{format_release, format_reply, parse_line, LineFeedback, LineProtocolCapture};
pub use self::r#trait::{create_capture_source, CaptureFeedback, CaptureRequest, CaptureSourceTrait};
