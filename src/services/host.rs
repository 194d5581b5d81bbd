use crate::error::Result;
use crate::events::{AppId, CaptureEvent};
use crate::services::capture::{CaptureFeedback, CaptureRequest};
use crate::services::clock::Clock;
use crate::services::dispatcher::{ActionDispatcher, DispatchWork, DispatchWorker};
use crate::services::expose_tracking::{ExposeEvidence, ExposeToken};
use crate::services::gesture_engine::{EngineSettings, GestureEngine};
use crate::services::gesture_resolver::GesturePreferences;
use crate::services::scheduler::{DeferredTask, TokioScheduler};
use crate::services::window_actions::WindowActions;
use crate::{debug_if_enabled, dock_error};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const REQUEST_QUEUE: usize = 64;

type ExposeCompletion = (ExposeToken, Result<ExposeEvidence>);
type WindowProbe = (AppId, Result<bool>);

/// Управление запущенным хостом: вход событий, перезагрузка настроек, остановка
pub struct HostHandle {
    requests: mpsc::Sender<CaptureRequest>,
    reloads: mpsc::UnboundedSender<GesturePreferences>,
    shutdown: oneshot::Sender<()>,
}

impl HostHandle {
    pub fn requests(&self) -> mpsc::Sender<CaptureRequest> {
        self.requests.clone()
    }

    pub fn reload(&self, prefs: GesturePreferences) {
        if self.reloads.send(prefs).is_err() {
            warn!("Хост уже остановлен, настройки не применены");
        }
    }

    pub fn shutdown(self) {
        let _ = self.shutdown.send(());
    }
}

/// Актор, владеющий движком: все входы движка проходят через один цикл `select!`.
///
/// Вызовы исполнителя действий в цикле не выполняются: действия уходят в
/// [`DispatchWorker`], проверки окон в блокирующий пул, Exposé в отдельную задачу.
pub struct GestureHost {
    engine: GestureEngine,
    desktop: Arc<dyn WindowActions>,
    dispatcher: ActionDispatcher,
    worker: Option<DispatchWorker>,
    feedback: Arc<dyn CaptureFeedback>,
    expose_timeout: Duration,
    scheduler: Arc<TokioScheduler>,
    requests: mpsc::Receiver<CaptureRequest>,
    tasks: mpsc::UnboundedReceiver<DeferredTask>,
    completions_tx: mpsc::UnboundedSender<ExposeCompletion>,
    completions: mpsc::UnboundedReceiver<ExposeCompletion>,
    probes_tx: mpsc::UnboundedSender<WindowProbe>,
    probes: mpsc::UnboundedReceiver<WindowProbe>,
    reloads: mpsc::UnboundedReceiver<GesturePreferences>,
    shutdown: oneshot::Receiver<()>,
}

impl GestureHost {
    pub fn new(
        settings: EngineSettings,
        prefs: GesturePreferences,
        desktop: Arc<dyn WindowActions>,
        feedback: Arc<dyn CaptureFeedback>,
        clock: Arc<dyn Clock>,
    ) -> (Self, HostHandle) {
        let (requests_tx, requests) = mpsc::channel(REQUEST_QUEUE);
        let (tasks_tx, tasks) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let (probes_tx, probes) = mpsc::unbounded_channel();
        let (reloads_tx, reloads) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown) = oneshot::channel();

        let expose_timeout = settings.expose_timeout;
        let scheduler = Arc::new(TokioScheduler::new(tasks_tx));
        let engine = GestureEngine::new(settings, prefs, Arc::clone(&desktop), scheduler.clone(), clock);

        let host = Self {
            engine,
            dispatcher: ActionDispatcher::new(Arc::clone(&desktop)),
            desktop,
            worker: None,
            feedback,
            expose_timeout,
            scheduler,
            requests,
            tasks,
            completions_tx,
            completions,
            probes_tx,
            probes,
            reloads,
            shutdown,
        };
        let handle = HostHandle {
            requests: requests_tx,
            reloads: reloads_tx,
            shutdown: shutdown_tx,
        };

        (host, handle)
    }

    /// Цикл хоста. Завершается по `HostHandle::shutdown`, при потере handle или закрытии входа.
    pub async fn run(mut self) -> Result<()> {
        info!("GestureHost запущен");
        self.worker = Some(DispatchWorker::spawn(self.dispatcher.clone()));

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    info!("GestureHost получил сигнал остановки");
                    break;
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        info!("Все источники событий закрыты");
                        break;
                    }
                },
                Some(task) = self.tasks.recv() => self.handle_task(task),
                Some((token, result)) = self.completions.recv() => {
                    self.engine.complete_expose(token, result);
                }
                Some((app, result)) = self.probes.recv() => self.engine.record_visible_windows(&app, result),
                Some(prefs) = self.reloads.recv() => self.engine.update_preferences(prefs),
            }
        }

        let pending = self.scheduler.pending_count();
        self.scheduler.cancel_all();

        // Уже принятые решения исполняются и при остановке
        while let Ok(task) = self.tasks.try_recv() {
            if let DeferredTask::Dispatch { work, app, .. } = task {
                self.submit(work, app);
            }
        }
        if let Some(worker) = self.worker.take() {
            worker.shutdown().await;
        }
        info!("GestureHost остановлен (отменено отложенных задач: {})", pending);
        Ok(())
    }

    fn handle_request(&mut self, request: CaptureRequest) {
        let disposition = match &request.event {
            CaptureEvent::Click(click) => self.engine.on_click(click),
            CaptureEvent::Scroll(scroll) => self.engine.on_scroll(scroll),
        };

        debug_if_enabled!("{} -> {}", request.event, disposition);

        if request.reply.send(disposition).is_err() {
            debug!("Источник не дождался ответа на {}", request.event);
        }
    }

    fn handle_task(&mut self, task: DeferredTask) {
        debug_if_enabled!("Отложенная задача: {}", task);

        match task {
            DeferredTask::NeutralRelease { sequence, location } => {
                self.feedback.post_neutral_release(sequence, location);
            }
            DeferredTask::ReassertActivation { app } => self.submit(DispatchWork::ReassertActivation, app),
            DeferredTask::Dispatch { work, app, .. } => self.submit(work, app),
            DeferredTask::ProbeWindows { app } => {
                let desktop = Arc::clone(&self.desktop);
                let probes = self.probes_tx.clone();
                tokio::spawn(async move {
                    let query = {
                        let app = app.clone();
                        tokio::task::spawn_blocking(move || desktop.has_visible_windows(&app))
                    };
                    let result = query
                        .await
                        .unwrap_or_else(|e| Err(dock_error!(internal, "проверка окон прервана: {}", e)));
                    let _ = probes.send((app, result));
                });
            }
            DeferredTask::InvokeExpose { app, token } => {
                if self.engine.tracking().invocation_token() != Some(token) {
                    debug!("{} для {} уже вытеснен, вызов пропущен", token, app);
                    return;
                }

                let desktop = Arc::clone(&self.desktop);
                let completions = self.completions_tx.clone();
                let timeout = self.expose_timeout;
                tokio::spawn(async move {
                    // Зависший вызов равносилен отсутствию подтверждения: сессия откатывается
                    let result = tokio::time::timeout(timeout, desktop.invoke_expose(&app))
                        .await
                        .unwrap_or_else(|_| {
                            Err(dock_error!(
                                action_failed,
                                "Exposé для {} не ответил за {}мс",
                                app,
                                timeout.as_millis()
                            ))
                        });
                    if completions.send((token, result)).is_err() {
                        debug!("Хост остановлен до завершения {}", token);
                    }
                });
            }
        }
    }

    fn submit(&self, work: DispatchWork, app: AppId) {
        match &self.worker {
            Some(worker) => worker.submit(work, app),
            None => warn!("DispatchWorker не запущен, {} для {} отброшено", work, app),
        }
    }
}
