//! Gesture engine: decides for each dock click/scroll whether the native event
//! passes through and which action runs.
//!
//! The engine is single-threaded by construction: every entry point takes
//! `&mut self`, and the host serializes calls through one actor loop. Side effects
//! (window actions, Exposé invocation, window probes, activation re-assertion,
//! neutral release) are handed to the [`Scheduler`] and never awaited here.
//! Only the queries a decision depends on run inline.

mod click;
mod decision;
mod scroll;

pub use click::PendingClickContext;
pub use decision::GesturePlan;

use crate::config::Config;
use crate::error::Result;
use crate::events::AppId;
use crate::services::clock::Clock;
use crate::services::dispatcher::DispatchWork;
use crate::services::expose_tracking::{CompletionOutcome, ExposeEvidence, ExposeToken, ExposeTrackingState};
use crate::services::gesture_resolver::GesturePreferences;
use crate::services::scheduler::{DeferredTask, Scheduler};
use crate::services::window_actions::WindowActions;
use crate::debug_if_enabled;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use click::CompletedClick;
use scroll::ScrollCoordinator;

/// Неизменяемые параметры движка
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub dock_app: AppId,
    pub drag_threshold_px: f64,
    pub scroll_debounce: Duration,
    pub toggle_cooldown: Duration,
    pub expose_recency: Duration,
    pub neutral_release_delay: Duration,
    pub activation_reassert_delay: Duration,
    pub expose_timeout: Duration,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let timing = &config.timing;
        Self {
            dock_app: config.dock.app_id.clone(),
            drag_threshold_px: timing.drag_threshold_px,
            scroll_debounce: timing.scroll_debounce(),
            toggle_cooldown: timing.toggle_cooldown(),
            expose_recency: timing.expose_recency(),
            neutral_release_delay: timing.neutral_release_delay(),
            activation_reassert_delay: timing.activation_reassert_delay(),
            expose_timeout: timing.expose_timeout(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct GestureEngine {
    settings: EngineSettings,
    prefs: GesturePreferences,
    desktop: Arc<dyn WindowActions>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    tracking: ExposeTrackingState,
    pending: Option<PendingClickContext>,
    last_completed: Option<CompletedClick>,
    scroll: ScrollCoordinator,
    next_dispatch: u64,
}

impl GestureEngine {
    pub fn new(
        settings: EngineSettings,
        prefs: GesturePreferences,
        desktop: Arc<dyn WindowActions>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        info!(
            "Инициализация GestureEngine (dock: {}, first click: {})",
            settings.dock_app, prefs.first_click_behavior
        );

        Self {
            settings,
            prefs,
            desktop,
            scheduler,
            clock,
            tracking: ExposeTrackingState::new(),
            pending: None,
            last_completed: None,
            scroll: ScrollCoordinator::new(),
            next_dispatch: 0,
        }
    }

    pub fn preferences(&self) -> &GesturePreferences {
        &self.prefs
    }

    /// Обновить настройки жестов на лету; состояние сессии не трогаем
    pub fn update_preferences(&mut self, prefs: GesturePreferences) {
        if prefs != self.prefs {
            info!("Настройки жестов обновлены (first click: {})", prefs.first_click_behavior);
            self.prefs = prefs;
        }
    }

    pub fn tracking(&self) -> &ExposeTrackingState {
        &self.tracking
    }

    pub fn pending_click(&self) -> Option<&PendingClickContext> {
        self.pending.as_ref()
    }

    /// Применить результат асинхронного вызова Exposé. Устаревший токен игнорируется.
    pub fn complete_expose(&mut self, token: ExposeToken, result: Result<ExposeEvidence>) -> CompletionOutcome {
        let visible = match &result {
            Ok(ExposeEvidence::Visible) => true,
            Ok(ExposeEvidence::NotObserved) => {
                warn!("Exposé ({}) вызван, но не подтверждён", token);
                false
            }
            Err(e) => {
                warn!("Вызов Exposé ({}) завершился ошибкой: {}", token, e);
                false
            }
        };

        let outcome = self.tracking.complete(token, visible, self.clock.now());
        match outcome {
            CompletionOutcome::Confirmed => info!("Exposé ({}) показан", token),
            CompletionOutcome::RolledBack => info!("Отслеживание Exposé откатано к состоянию до {}", token),
            CompletionOutcome::Stale => debug_if_enabled!("Результат {} устарел и отброшен", token),
        }
        outcome
    }

    /// Результат проверки окон приложения, за которым последовала сессия.
    /// Применяется, только если сессия всё ещё показывает это приложение.
    pub fn record_visible_windows(&mut self, app: &AppId, result: Result<bool>) {
        let visible = result.unwrap_or_else(|e| {
            warn!("Не удалось проверить видимые окна {}: {}", app, e);
            false
        });

        if !visible && self.tracking.current_app() == Some(app) {
            debug_if_enabled!("{} без видимых окон", app);
            self.tracking.note_without_windows(app);
        }
    }

    /// Передать побочный эффект решения хосту; исполняется вне цикла событий
    fn dispatch(&mut self, work: DispatchWork, app: &AppId) {
        self.next_dispatch += 1;
        self.scheduler.schedule(
            DeferredTask::Dispatch {
                id: self.next_dispatch,
                app: app.clone(),
                work,
            },
            Duration::ZERO,
        );
    }

    fn frontmost(&self) -> Option<AppId> {
        self.desktop.frontmost_app().unwrap_or_else(|e| {
            warn!("Не удалось определить активное приложение: {}", e);
            None
        })
    }

    fn is_running(&self, app: &AppId) -> bool {
        self.desktop.is_running(app).unwrap_or_else(|e| {
            warn!("Не удалось проверить запуск {}: {}", app, e);
            false
        })
    }

    fn window_count(&self, app: &AppId) -> u32 {
        self.desktop.window_count(app).unwrap_or_else(|e| {
            warn!("Не удалось посчитать окна {}: {}", app, e);
            0
        })
    }

    fn has_visible_windows(&self, app: &AppId) -> bool {
        self.desktop.has_visible_windows(app).unwrap_or_else(|e| {
            warn!("Не удалось проверить видимые окна {}: {}", app, e);
            false
        })
    }

    fn interaction_active(&self, frontmost: Option<&AppId>, now: Instant) -> bool {
        self.tracking.is_interaction_active(
            frontmost,
            &self.settings.dock_app,
            now,
            self.settings.expose_recency,
        )
    }

    fn reset_tracking(&mut self, reason: &str) {
        if !self.tracking.is_empty() {
            debug_if_enabled!("Сброс отслеживания Exposé: {}", reason);
        }
        self.tracking.reset();
    }
}
