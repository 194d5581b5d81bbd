use crate::actions::Action;
use crate::error::Result;
use crate::events::AppId;
use crate::services::window_actions::WindowActions;
use crate::debug_if_enabled;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Побочный эффект решения движка, исполняемый вне цикла хоста
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchWork {
    Perform(Action),
    DismissExpose { reopen: bool },
    ReassertActivation,
}

impl fmt::Display for DispatchWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchWork::Perform(action) => write!(f, "{}", action),
            DispatchWork::DismissExpose { reopen } => write!(f, "dismiss-expose (reopen: {})", reopen),
            DispatchWork::ReassertActivation => write!(f, "reassert-activation"),
        }
    }
}

/// Переводит логическое действие в вызовы исполнителя действий над окнами.
///
/// Ошибки исполнителя только логируются: для конечного автомата движка
/// неудачное действие равносильно выполненному.
#[derive(Clone)]
pub struct ActionDispatcher {
    desktop: Arc<dyn WindowActions>,
}

impl ActionDispatcher {
    pub fn new(desktop: Arc<dyn WindowActions>) -> Self {
        Self { desktop }
    }

    pub fn run(&self, work: DispatchWork, app: &AppId) {
        match work {
            DispatchWork::Perform(action) => {
                self.dispatch(action, app);
            }
            DispatchWork::DismissExpose { reopen } => self.dismiss_expose(app, reopen),
            DispatchWork::ReassertActivation => {
                self.reassert_activation(app);
            }
        }
    }

    /// Выполнить действие и залогировать результат. Возвращает true при успехе.
    pub fn dispatch(&self, action: Action, app: &AppId) -> bool {
        match self.perform(action, app) {
            Ok(()) => {
                info!("Выполнено действие {} для {}", action, app);
                true
            }
            Err(e) => {
                warn!("Действие {} для {} не выполнено: {}", action, app, e);
                false
            }
        }
    }

    fn perform(&self, action: Action, app: &AppId) -> Result<()> {
        match action {
            Action::None | Action::Expose => {
                // Exposé вызывается асинхронно через движок, а none ничего не делает
                debug_if_enabled!("Действие {} не исполняется диспетчером", action);
                Ok(())
            }
            Action::ActivateApp => self.unhide_and_raise(app),
            Action::HideApp => {
                if self.desktop.is_hidden(app)? {
                    self.unhide_and_raise(app)
                } else {
                    self.desktop.hide(app)
                }
            }
            Action::HideOthers => self.desktop.hide_others(app),
            Action::MinimizeAll => {
                if self.desktop.is_minimized(app)? {
                    self.desktop.restore_all(app)
                } else {
                    self.desktop.minimize_all(app)
                }
            }
            Action::QuitApp => self.desktop.quit(app),
            Action::BringAllToFront => {
                self.unhide_if_hidden(app)?;
                self.desktop.bring_all_to_front(app)
            }
            Action::SingleAppMode => {
                self.unhide_and_raise(app)?;
                self.desktop.hide_others(app)
            }
        }
    }

    fn unhide_if_hidden(&self, app: &AppId) -> Result<()> {
        if self.desktop.is_hidden(app).unwrap_or(false) {
            self.desktop.unhide(app)?;
        }
        Ok(())
    }

    fn unhide_and_raise(&self, app: &AppId) -> Result<()> {
        self.unhide_if_hidden(app)?;
        self.desktop.activate(app)
    }

    /// Клик, закрывающий Exposé: либо показ главного окна (у приложения не было окон),
    /// либо выход из Exposé и активация
    pub fn dismiss_expose(&self, app: &AppId, reopen: bool) {
        let result = if reopen {
            self.desktop.activate_and_show_main(app)
        } else {
            self.desktop
                .exit_expose()
                .and_then(|_| self.unhide_and_raise(app))
        };

        match result {
            Ok(()) => info!("Exposé закрыт кликом по {} (reopen: {})", app, reopen),
            Err(e) => warn!("Не удалось закрыть Exposé для {}: {}", app, e),
        }
    }

    /// Повторная активация после нативного переключения. Перепроверяет состояние
    /// перед действием, поэтому безопасна при повторной доставке.
    pub fn reassert_activation(&self, app: &AppId) -> bool {
        let running = self.desktop.is_running(app).unwrap_or(false);
        let frontmost = self.desktop.frontmost_app().ok().flatten();

        if !running || frontmost.as_ref() == Some(app) {
            debug_if_enabled!("Повторная активация {} не нужна (running: {})", app, running);
            return false;
        }

        match self.unhide_and_raise(app) {
            Ok(()) => {
                info!("Повторная активация {}", app);
                true
            }
            Err(e) => {
                warn!("Повторная активация {} не удалась: {}", app, e);
                false
            }
        }
    }
}

/// Исполнитель действий на отдельном блокирующем потоке.
///
/// Команды-помощники запускают процессы, поэтому вызовы не выполняются в
/// асинхронном цикле хоста. Задачи исполняются строго в порядке отправки.
pub struct DispatchWorker {
    tx: mpsc::UnboundedSender<(DispatchWork, AppId)>,
    handle: JoinHandle<()>,
}

impl DispatchWorker {
    pub fn spawn(dispatcher: ActionDispatcher) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<(DispatchWork, AppId)>();
        let handle = tokio::task::spawn_blocking(move || {
            while let Some((work, app)) = rx.blocking_recv() {
                debug_if_enabled!("Исполнение {} для {}", work, app);
                dispatcher.run(work, &app);
            }
            debug!("DispatchWorker остановлен");
        });

        Self { tx, handle }
    }

    pub fn submit(&self, work: DispatchWork, app: AppId) {
        if self.tx.send((work, app)).is_err() {
            warn!("DispatchWorker остановлен, {} отброшено", work);
        }
    }

    /// Закрыть очередь и дождаться исполнения уже принятых задач
    pub async fn shutdown(self) {
        let Self { tx, handle } = self;
        drop(tx);
        if let Err(e) = handle.await {
            warn!("DispatchWorker завершился с ошибкой: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::window_actions::{DesktopCall, SimulatedDesktop};

    fn setup() -> (Arc<SimulatedDesktop>, ActionDispatcher) {
        let desktop = Arc::new(SimulatedDesktop::new(AppId::new("dock")));
        desktop.set_app(&AppId::new("safari"), true, 2);
        desktop.set_app(&AppId::new("terminal"), true, 1);
        let dispatcher = ActionDispatcher::new(desktop.clone());
        (desktop, dispatcher)
    }

    #[test]
    fn test_hide_toggles() {
        let (desktop, dispatcher) = setup();
        let safari = AppId::new("safari");

        assert!(dispatcher.dispatch(Action::HideApp, &safari));
        assert!(desktop.is_hidden(&safari).unwrap());

        assert!(dispatcher.dispatch(Action::HideApp, &safari));
        assert!(!desktop.is_hidden(&safari).unwrap());
        assert_eq!(desktop.frontmost_app().unwrap(), Some(safari.clone()));
        assert_eq!(
            desktop.calls(),
            vec![
                DesktopCall::Hide(safari.clone()),
                DesktopCall::Unhide(safari.clone()),
                DesktopCall::Activate(safari),
            ]
        );
    }

    #[test]
    fn test_minimize_toggles() {
        let (desktop, dispatcher) = setup();
        let safari = AppId::new("safari");

        dispatcher.dispatch(Action::MinimizeAll, &safari);
        assert!(desktop.is_minimized(&safari).unwrap());
        dispatcher.dispatch(Action::MinimizeAll, &safari);
        assert!(!desktop.is_minimized(&safari).unwrap());
    }

    #[test]
    fn test_single_app_mode() {
        let (desktop, dispatcher) = setup();
        let safari = AppId::new("safari");

        assert!(dispatcher.dispatch(Action::SingleAppMode, &safari));
        assert_eq!(desktop.frontmost_app().unwrap(), Some(safari.clone()));
        assert!(desktop.is_hidden(&AppId::new("terminal")).unwrap());
        assert!(!desktop.is_hidden(&safari).unwrap());
    }

    #[test]
    fn test_failures_are_reported_not_raised() {
        let (desktop, dispatcher) = setup();
        let notes = AppId::new("notes");
        assert!(!dispatcher.dispatch(Action::QuitApp, &notes));

        desktop.set_failing(&AppId::new("safari"));
        assert!(!dispatcher.dispatch(Action::BringAllToFront, &AppId::new("safari")));
    }

    #[test]
    fn test_dismiss_expose() {
        let (desktop, dispatcher) = setup();
        let safari = AppId::new("safari");

        dispatcher.dismiss_expose(&safari, false);
        assert_eq!(
            desktop.calls(),
            vec![DesktopCall::ExitExpose, DesktopCall::Activate(safari.clone())]
        );

        desktop.clear_calls();
        dispatcher.dismiss_expose(&safari, true);
        assert_eq!(desktop.calls(), vec![DesktopCall::ActivateAndShowMain(safari)]);
    }

    #[tokio::test]
    async fn test_worker_runs_jobs_in_order() {
        let (desktop, dispatcher) = setup();
        let safari = AppId::new("safari");

        let worker = DispatchWorker::spawn(dispatcher);
        worker.submit(DispatchWork::Perform(Action::HideApp), safari.clone());
        worker.submit(DispatchWork::Perform(Action::HideApp), safari.clone());
        worker.submit(DispatchWork::DismissExpose { reopen: true }, safari.clone());
        worker.shutdown().await;

        assert_eq!(
            desktop.calls(),
            vec![
                DesktopCall::Hide(safari.clone()),
                DesktopCall::Unhide(safari.clone()),
                DesktopCall::Activate(safari.clone()),
                DesktopCall::ActivateAndShowMain(safari),
            ]
        );
    }

    #[test]
    fn test_reassert_activation_revalidates() {
        let (desktop, dispatcher) = setup();
        let safari = AppId::new("safari");

        desktop.set_frontmost(Some(safari.clone()));
        assert!(!dispatcher.reassert_activation(&safari));

        desktop.set_frontmost(Some(AppId::new("terminal")));
        assert!(dispatcher.reassert_activation(&safari));
        assert_eq!(desktop.frontmost_app().unwrap(), Some(safari));

        assert!(!dispatcher.reassert_activation(&AppId::new("notes")));
    }
}
