use crate::config::Config;
use crate::error::Result;
use crate::events::{CaptureEvent, Disposition, Point};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Событие от слоя захвата вместе с каналом для ответа
#[derive(Debug)]
pub struct CaptureRequest {
    pub event: CaptureEvent,
    pub reply: oneshot::Sender<Disposition>,
}

impl CaptureRequest {
    pub fn new(event: CaptureEvent) -> (Self, oneshot::Receiver<Disposition>) {
        let (reply, rx) = oneshot::channel();
        (Self { event, reply }, rx)
    }
}

/// Обратный канал к слою захвата
pub trait CaptureFeedback: Send + Sync {
    /// Снять "нажатое" состояние иконки после поглощённого mouse-up. Должно быть идемпотентным.
    fn post_neutral_release(&self, sequence: u64, location: Point);
}

/// Trait for capture sources feeding dock events to the gesture host
#[async_trait::async_trait]
pub trait CaptureSourceTrait {
    /// Run the source until its input ends; every event is sent as a request and awaits its reply
    async fn run(self: Box<Self>, requests: mpsc::Sender<CaptureRequest>) -> Result<()>;
}

/// Factory function to create the capture source and its feedback channel based on the dry_run flag
pub fn create_capture_source(
    config: Arc<Config>,
    dry_run: bool,
) -> Result<(Box<dyn CaptureSourceTrait + Send>, Arc<dyn CaptureFeedback>)> {
    if dry_run {
        let source = super::dry_run::DryRunCapture::new(config)?;
        Ok((Box::new(source), Arc::new(super::dry_run::LoggingFeedback)))
    } else {
        let (source, feedback) = super::line_protocol::LineProtocolCapture::stdio();
        Ok((Box::new(source), Arc::new(feedback)))
    }
}
