use crate::config::Config;
use crate::error::Result;
use crate::events::{AppId, CaptureEvent, ClickEvent, ClickPhase, Disposition, ModifierFlags, Point, ScrollDirection, ScrollEvent};
use crate::{debug_if_enabled, dock_error};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::info;

use super::r#trait::{CaptureFeedback, CaptureRequest, CaptureSourceTrait};

const STEP_INTERVAL: Duration = Duration::from_secs(2);
const PRESS_DURATION: Duration = Duration::from_millis(40);

/// Шаг сценария эмуляции
#[derive(Debug, Clone)]
enum ScriptStep {
    Click { app: Option<AppId>, modifiers: ModifierFlags },
    Scroll { app: AppId, direction: ScrollDirection },
}

/// Эмулятор захвата для dry-run: по кругу проигрывает жесты над приложениями из `[simulation]`
pub struct DryRunCapture {
    script: Vec<ScriptStep>,
}

impl DryRunCapture {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        info!("Инициализация DryRunCapture");

        let apps: Vec<AppId> = config.simulation.apps.iter().map(|app| app.id.clone()).collect();
        if apps.is_empty() {
            return Err(dock_error!(service_unavailable, "simulation.apps пуст, эмулировать нечего"));
        }

        Ok(Self {
            script: Self::build_script(&apps),
        })
    }

    fn build_script(apps: &[AppId]) -> Vec<ScriptStep> {
        let mut script = Vec::new();
        for app in apps {
            script.push(ScriptStep::Click {
                app: Some(app.clone()),
                modifiers: ModifierFlags::new(),
            });
            script.push(ScriptStep::Scroll {
                app: app.clone(),
                direction: ScrollDirection::Down,
            });
            script.push(ScriptStep::Click {
                app: Some(app.clone()),
                modifiers: ModifierFlags::new(),
            });
            script.push(ScriptStep::Scroll {
                app: app.clone(),
                direction: ScrollDirection::Up,
            });
            script.push(ScriptStep::Click {
                app: Some(app.clone()),
                modifiers: ModifierFlags::new().with_shift(true),
            });
        }
        // Клик мимо иконок сбрасывает всё отслеживание
        script.push(ScriptStep::Click {
            app: None,
            modifiers: ModifierFlags::new(),
        });
        script
    }

    async fn send(requests: &mpsc::Sender<CaptureRequest>, event: CaptureEvent) -> Option<Disposition> {
        let description = event.to_string();
        let (request, reply) = CaptureRequest::new(event);
        requests.send(request).await.ok()?;
        let disposition = reply.await.ok()?;
        info!("dry-run: {} -> {}", description, disposition);
        Some(disposition)
    }

    async fn run_impl(self, requests: mpsc::Sender<CaptureRequest>) -> Result<()> {
        info!("Dry-run режим - захват эмулируется, шагов в сценарии: {}", self.script.len());

        let location = Point::new(0.0, 0.0);
        let mut sequence = 0u64;

        loop {
            for step in &self.script {
                let delivered = match step {
                    ScriptStep::Click { app, modifiers } => {
                        sequence += 1;
                        let down = ClickEvent::new(sequence, app.clone(), ClickPhase::Down, location)
                            .with_modifiers(*modifiers);

                        if Self::send(&requests, CaptureEvent::Click(down)).await.is_none() {
                            None
                        } else {
                            sleep(PRESS_DURATION).await;
                            let up = ClickEvent::new(sequence, app.clone(), ClickPhase::Up, location)
                                .with_modifiers(*modifiers);
                            Self::send(&requests, CaptureEvent::Click(up)).await
                        }
                    }
                    ScriptStep::Scroll { app, direction } => {
                        Self::send(&requests, CaptureEvent::Scroll(ScrollEvent::new(Some(app.clone()), *direction)))
                            .await
                    }
                };

                if delivered.is_none() {
                    info!("Хост остановлен, эмуляция завершена");
                    return Ok(());
                }

                sleep(STEP_INTERVAL).await;
            }
        }
    }
}

#[async_trait::async_trait]
impl CaptureSourceTrait for DryRunCapture {
    async fn run(self: Box<Self>, requests: mpsc::Sender<CaptureRequest>) -> Result<()> {
        (*self).run_impl(requests).await
    }
}

/// Обратная связь dry-run: сбросы нажатия только логируются
#[derive(Debug, Default)]
pub struct LoggingFeedback;

impl CaptureFeedback for LoggingFeedback {
    fn post_neutral_release(&self, sequence: u64, location: Point) {
        debug_if_enabled!("dry-run: release click#{} {}", sequence, location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_simulated_apps() {
        let mut config = Config::default();
        config.simulation.apps.clear();
        assert!(DryRunCapture::new(Arc::new(config)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_sends_click_pairs_and_scrolls() {
        let capture = DryRunCapture::new(Arc::new(Config::default())).unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let source = tokio::spawn(Box::new(capture).run(tx));

        let mut events = Vec::new();
        for _ in 0..3 {
            let request = rx.recv().await.unwrap();
            events.push(request.event.clone());
            request.reply.send(Disposition::PassThrough).unwrap();
        }
        drop(rx);

        let CaptureEvent::Click(down) = &events[0] else { panic!("ожидался click") };
        let CaptureEvent::Click(up) = &events[1] else { panic!("ожидался click") };
        assert_eq!(down.phase, ClickPhase::Down);
        assert_eq!(up.phase, ClickPhase::Up);
        assert_eq!(down.sequence, up.sequence);
        assert_eq!(down.app, Some(AppId::new("com.apple.finder")));
        assert!(matches!(&events[2], CaptureEvent::Scroll(scroll) if scroll.direction == ScrollDirection::Down));

        source.await.unwrap().unwrap();
    }
}
