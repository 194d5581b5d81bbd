use crate::config::SimulationConfig;
use crate::error::{DockError, Result};
use crate::events::AppId;
use crate::services::expose_tracking::ExposeEvidence;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::info;

use super::r#trait::WindowActions;

/// Вызов, выполненный над симулированным рабочим столом
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesktopCall {
    Hide(AppId),
    Unhide(AppId),
    Activate(AppId),
    MinimizeAll(AppId),
    RestoreAll(AppId),
    BringAllToFront(AppId),
    HideOthers(AppId),
    Quit(AppId),
    ActivateAndShowMain(AppId),
    ExitExpose,
    InvokeExpose(AppId),
}

#[derive(Debug, Clone, Default)]
struct SimulatedAppState {
    running: bool,
    hidden: bool,
    minimized: bool,
    windows: u32,
}

#[derive(Debug, Default)]
struct DesktopState {
    apps: HashMap<AppId, SimulatedAppState>,
    frontmost: Option<AppId>,
    expose_shown: Option<AppId>,
    failing: HashSet<AppId>,
    calls: Vec<DesktopCall>,
}

/// In-memory desktop used in dry-run mode and as the collaborator in engine tests.
///
/// Every action is recorded; Exposé moves the dock to the front the way the real
/// platform does while the overview is on screen.
pub struct SimulatedDesktop {
    dock: AppId,
    state: RwLock<DesktopState>,
}

impl SimulatedDesktop {
    pub fn new(dock: AppId) -> Self {
        Self {
            dock,
            state: RwLock::new(DesktopState::default()),
        }
    }

    pub fn from_config(config: &SimulationConfig, dock: AppId) -> Self {
        let desktop = Self::new(dock);
        for app in &config.apps {
            desktop.set_app(&app.id, app.running, app.windows);
            if app.hidden {
                desktop.state.write().apps.entry(app.id.clone()).or_default().hidden = true;
            }
        }
        desktop.set_frontmost(config.frontmost.clone());
        info!("SimulatedDesktop: {} приложений", config.apps.len());
        desktop
    }

    pub fn set_app(&self, app: &AppId, running: bool, windows: u32) {
        let mut state = self.state.write();
        let entry = state.apps.entry(app.clone()).or_default();
        entry.running = running;
        entry.windows = if running { windows } else { 0 };
    }

    pub fn set_windows(&self, app: &AppId, windows: u32) {
        self.state.write().apps.entry(app.clone()).or_default().windows = windows;
    }

    pub fn set_frontmost(&self, app: Option<AppId>) {
        self.state.write().frontmost = app;
    }

    /// Все действия над приложением будут завершаться ошибкой
    pub fn set_failing(&self, app: &AppId) {
        self.state.write().failing.insert(app.clone());
    }

    pub fn calls(&self) -> Vec<DesktopCall> {
        self.state.read().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.write().calls.clear();
    }

    pub fn expose_shown(&self) -> Option<AppId> {
        self.state.read().expose_shown.clone()
    }

    fn app_state(&self, app: &AppId) -> SimulatedAppState {
        self.state.read().apps.get(app).cloned().unwrap_or_default()
    }

    /// Общая обвязка действий: журнал, отказ для "падающих" приложений, проверка запуска
    fn perform<F>(&self, call: DesktopCall, app: &AppId, require_running: bool, apply: F) -> Result<()>
    where
        F: FnOnce(&mut DesktopState),
    {
        let mut state = self.state.write();
        state.calls.push(call);

        if state.failing.contains(app) {
            return Err(DockError::ActionFailed(format!("симуляция отказа для {}", app)));
        }

        let running = state.apps.get(app).map(|a| a.running).unwrap_or(false);
        if require_running && !running {
            return DockError::app_not_running(app.as_str());
        }

        apply(&mut *state);
        Ok(())
    }
}

#[async_trait::async_trait]
impl WindowActions for SimulatedDesktop {
    fn frontmost_app(&self) -> Result<Option<AppId>> {
        Ok(self.state.read().frontmost.clone())
    }

    fn is_running(&self, app: &AppId) -> Result<bool> {
        Ok(self.app_state(app).running)
    }

    fn is_hidden(&self, app: &AppId) -> Result<bool> {
        Ok(self.app_state(app).hidden)
    }

    fn is_minimized(&self, app: &AppId) -> Result<bool> {
        Ok(self.app_state(app).minimized)
    }

    fn window_count(&self, app: &AppId) -> Result<u32> {
        let app = self.app_state(app);
        Ok(if app.running { app.windows } else { 0 })
    }

    fn has_visible_windows(&self, app: &AppId) -> Result<bool> {
        let app = self.app_state(app);
        Ok(app.running && !app.hidden && !app.minimized && app.windows > 0)
    }

    fn hide(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::Hide(app.clone()), app, true, |state| {
            if let Some(entry) = state.apps.get_mut(app) {
                entry.hidden = true;
            }
            if state.frontmost.as_ref() == Some(app) {
                state.frontmost = None;
            }
        })
    }

    fn unhide(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::Unhide(app.clone()), app, true, |state| {
            if let Some(entry) = state.apps.get_mut(app) {
                entry.hidden = false;
            }
        })
    }

    fn activate(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::Activate(app.clone()), app, true, |state| {
            if let Some(entry) = state.apps.get_mut(app) {
                entry.hidden = false;
            }
            state.frontmost = Some(app.clone());
        })
    }

    fn minimize_all(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::MinimizeAll(app.clone()), app, true, |state| {
            if let Some(entry) = state.apps.get_mut(app) {
                entry.minimized = true;
            }
        })
    }

    fn restore_all(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::RestoreAll(app.clone()), app, true, |state| {
            if let Some(entry) = state.apps.get_mut(app) {
                entry.minimized = false;
            }
        })
    }

    fn bring_all_to_front(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::BringAllToFront(app.clone()), app, true, |state| {
            if let Some(entry) = state.apps.get_mut(app) {
                entry.hidden = false;
                entry.minimized = false;
            }
            state.frontmost = Some(app.clone());
        })
    }

    fn hide_others(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::HideOthers(app.clone()), app, true, |state| {
            for (id, entry) in state.apps.iter_mut() {
                if id != app && entry.running {
                    entry.hidden = true;
                }
            }
        })
    }

    fn quit(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::Quit(app.clone()), app, true, |state| {
            if let Some(entry) = state.apps.get_mut(app) {
                *entry = SimulatedAppState::default();
            }
            if state.frontmost.as_ref() == Some(app) {
                state.frontmost = None;
            }
        })
    }

    fn activate_and_show_main(&self, app: &AppId) -> Result<()> {
        self.perform(DesktopCall::ActivateAndShowMain(app.clone()), app, false, |state| {
            let entry = state.apps.entry(app.clone()).or_default();
            entry.running = true;
            entry.hidden = false;
            entry.windows = entry.windows.max(1);
            state.frontmost = Some(app.clone());
            state.expose_shown = None;
        })
    }

    fn exit_expose(&self) -> Result<()> {
        let mut state = self.state.write();
        state.calls.push(DesktopCall::ExitExpose);
        state.expose_shown = None;
        Ok(())
    }

    async fn invoke_expose(&self, app: &AppId) -> Result<ExposeEvidence> {
        let dock = self.dock.clone();
        let mut evidence = ExposeEvidence::NotObserved;
        self.perform(DesktopCall::InvokeExpose(app.clone()), app, true, |state| {
            let windows = state.apps.get(app).map(|a| a.windows).unwrap_or(0);
            if windows > 0 {
                state.expose_shown = Some(app.clone());
                state.frontmost = Some(dock);
                evidence = ExposeEvidence::Visible;
            }
        })?;
        Ok(evidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> SimulatedDesktop {
        let desktop = SimulatedDesktop::new(AppId::new("dock"));
        desktop.set_app(&AppId::new("safari"), true, 2);
        desktop.set_app(&AppId::new("terminal"), true, 0);
        desktop.set_app(&AppId::new("notes"), false, 3);
        desktop
    }

    #[test]
    fn test_queries() {
        let desktop = desktop();
        let safari = AppId::new("safari");
        let notes = AppId::new("notes");

        assert!(desktop.is_running(&safari).unwrap());
        assert!(!desktop.is_running(&notes).unwrap());
        assert_eq!(desktop.window_count(&safari).unwrap(), 2);
        assert_eq!(desktop.window_count(&notes).unwrap(), 0);
        assert!(desktop.has_visible_windows(&safari).unwrap());
        assert!(!desktop.has_visible_windows(&AppId::new("terminal")).unwrap());
    }

    #[test]
    fn test_hide_and_hide_others() {
        let desktop = desktop();
        let safari = AppId::new("safari");
        let terminal = AppId::new("terminal");
        desktop.set_frontmost(Some(safari.clone()));

        desktop.hide_others(&safari).unwrap();
        assert!(desktop.is_hidden(&terminal).unwrap());
        assert!(!desktop.is_hidden(&safari).unwrap());

        desktop.hide(&safari).unwrap();
        assert!(desktop.is_hidden(&safari).unwrap());
        assert_eq!(desktop.frontmost_app().unwrap(), None);
        assert!(!desktop.has_visible_windows(&safari).unwrap());
    }

    #[test]
    fn test_actions_on_stopped_app_fail() {
        let desktop = desktop();
        let notes = AppId::new("notes");
        assert!(matches!(desktop.hide(&notes), Err(DockError::AppNotRunning(_))));
        assert_eq!(desktop.calls(), vec![DesktopCall::Hide(notes.clone())]);

        desktop.activate_and_show_main(&notes).unwrap();
        assert!(desktop.is_running(&notes).unwrap());
        assert_eq!(desktop.frontmost_app().unwrap(), Some(notes));
    }

    #[test]
    fn test_failing_app() {
        let desktop = desktop();
        let safari = AppId::new("safari");
        desktop.set_failing(&safari);
        assert!(matches!(desktop.minimize_all(&safari), Err(DockError::ActionFailed(_))));
        assert!(!desktop.is_minimized(&safari).unwrap());
    }

    #[tokio::test]
    async fn test_invoke_expose_moves_dock_to_front() {
        let desktop = desktop();
        let safari = AppId::new("safari");

        let evidence = desktop.invoke_expose(&safari).await.unwrap();
        assert_eq!(evidence, ExposeEvidence::Visible);
        assert_eq!(desktop.expose_shown(), Some(safari));
        assert_eq!(desktop.frontmost_app().unwrap(), Some(AppId::new("dock")));

        let evidence = desktop.invoke_expose(&AppId::new("terminal")).await.unwrap();
        assert_eq!(evidence, ExposeEvidence::NotObserved);
    }
}
