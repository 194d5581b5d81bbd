use crate::actions::{Action, FirstClickBehavior};
use crate::events::{AppId, Disposition, ModifierCombination};
use crate::services::gesture_resolver::{
    should_run_expose_after_activation, should_run_first_click_expose, FirstClickResolution, TriggerKind,
};
use crate::services::dispatcher::DispatchWork;
use crate::services::scheduler::DeferredTask;
use crate::debug_if_enabled;
use std::fmt;
use std::time::{Duration, Instant};

use super::GestureEngine;

/// Итог решения по клику или прокрутке.
///
/// План вычисляется одной функцией и для предсказания на mouse-down, и для
/// исполнения на mouse-up, поэтому предсказанное поглощение всегда совпадает
/// с тем, что сделает исполнение при неизменном состоянии мира.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePlan {
    /// Пользователь внутри Exposé: следуем за нативным переключением
    FollowExpose,
    /// Клик по приложению, показанному в Exposé: закрыть Exposé
    DismissExpose { reopen: bool },
    /// Переключение из Exposé на приложение без видимых окон
    SwitchToWindowless,
    /// Переключение на другое приложение внутри Exposé
    SwitchWithinExpose,
    /// Exposé закрыт нативно, клик по исходному приложению
    ExposeClosedNatively,
    /// Асинхронный вызов Exposé
    InvokeExpose,
    /// Выполнить действие и поглотить событие
    Perform(Action),
    /// Приложение не запущено: нативный запуск
    NativeLaunch,
    /// Нативное поведение дока без изменений состояния
    Native,
}

impl GesturePlan {
    pub fn disposition(&self) -> Disposition {
        match self {
            GesturePlan::DismissExpose { .. } | GesturePlan::Perform(_) => Disposition::Consume,
            _ => Disposition::PassThrough,
        }
    }
}

impl fmt::Display for GesturePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GesturePlan::FollowExpose => write!(f, "follow-expose"),
            GesturePlan::DismissExpose { reopen } => write!(f, "dismiss-expose (reopen: {})", reopen),
            GesturePlan::SwitchToWindowless => write!(f, "switch-to-windowless"),
            GesturePlan::SwitchWithinExpose => write!(f, "switch-within-expose"),
            GesturePlan::ExposeClosedNatively => write!(f, "expose-closed-natively"),
            GesturePlan::InvokeExpose => write!(f, "invoke-expose"),
            GesturePlan::Perform(action) => write!(f, "perform {}", action),
            GesturePlan::NativeLaunch => write!(f, "native-launch"),
            GesturePlan::Native => write!(f, "native"),
        }
    }
}

/// Предсказание (mouse-down) или исполнение (mouse-up)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PlanPhase {
    Predict,
    Execute,
}

/// Снимок клика, на основе которого принимается решение
#[derive(Debug, Clone, Copy)]
pub(super) struct ClickInput<'a> {
    pub app: &'a AppId,
    pub combination: ModifierCombination,
    pub frontmost_before: Option<&'a AppId>,
    pub window_count_at_down: Option<u32>,
    pub forced_fallback: bool,
    pub timestamp: Instant,
}

/// Какой гейт числа окон применяется к Exposé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExposeGate {
    FirstClick,
    AfterActivation,
}

impl GestureEngine {
    pub(super) fn plan_click(&self, input: &ClickInput<'_>, phase: PlanPhase) -> GesturePlan {
        let app = input.app;

        if self.interaction_active(input.frontmost_before, input.timestamp) {
            return GesturePlan::FollowExpose;
        }

        let tracking_active = !self.tracking.is_empty();
        let is_frontmost = input.frontmost_before == Some(app);

        if tracking_active && self.tracking.current_app() == Some(app) && !is_frontmost {
            return GesturePlan::DismissExpose {
                reopen: self.tracking.is_without_windows(app),
            };
        }

        if !is_frontmost {
            if tracking_active {
                // Оба варианта пропускают событие, на mouse-down окна не запрашиваем
                if phase == PlanPhase::Predict || self.has_visible_windows(app) {
                    return GesturePlan::SwitchWithinExpose;
                }
                return GesturePlan::SwitchToWindowless;
            }
            return self.plan_first_click(input, phase);
        }

        if tracking_active && self.tracking.triggered_app() == Some(app) {
            return GesturePlan::ExposeClosedNatively;
        }

        let action = self.prefs.resolve(TriggerKind::Click, input.combination);
        self.plan_action(action, app, ExposeGate::AfterActivation, phase)
    }

    fn plan_first_click(&self, input: &ClickInput<'_>, phase: PlanPhase) -> GesturePlan {
        let app = input.app;

        match self.prefs.resolve_first_click(input.combination) {
            // Нативный клик и так активирует приложение
            FirstClickResolution::Behavior(FirstClickBehavior::ActivateApp) => GesturePlan::Native,
            FirstClickResolution::Behavior(FirstClickBehavior::BringAllToFront) => {
                self.plan_action(Action::BringAllToFront, app, ExposeGate::FirstClick, phase)
            }
            FirstClickResolution::Behavior(FirstClickBehavior::Expose) => {
                if !self.is_running(app) {
                    return GesturePlan::NativeLaunch;
                }
                if input.forced_fallback {
                    return GesturePlan::Native;
                }
                let window_count = match phase {
                    PlanPhase::Predict => input.window_count_at_down,
                    PlanPhase::Execute => Some(self.window_count(app)),
                };
                match window_count {
                    Some(count) if !should_run_first_click_expose(count, self.prefs.first_click_requires_multiple_windows) => {
                        GesturePlan::Native
                    }
                    _ => GesturePlan::InvokeExpose,
                }
            }
            FirstClickResolution::Mapped(action) => self.plan_action(action, app, ExposeGate::FirstClick, phase),
        }
    }

    /// План для действия из таблицы жестов
    pub(super) fn plan_action(&self, action: Action, app: &AppId, gate: ExposeGate, phase: PlanPhase) -> GesturePlan {
        if action == Action::None {
            return GesturePlan::Native;
        }

        if !self.is_running(app) {
            return GesturePlan::NativeLaunch;
        }

        if action != Action::Expose {
            return GesturePlan::Perform(action);
        }

        // Exposé никогда не поглощает событие, на предсказание гейт не влияет
        if phase == PlanPhase::Predict {
            return GesturePlan::InvokeExpose;
        }

        let window_count = self.window_count(app);
        let allowed = match gate {
            ExposeGate::FirstClick => {
                should_run_first_click_expose(window_count, self.prefs.first_click_requires_multiple_windows)
            }
            ExposeGate::AfterActivation => should_run_expose_after_activation(
                window_count,
                self.prefs.click_after_activation_requires_multiple_windows,
            ),
        };

        if allowed {
            GesturePlan::InvokeExpose
        } else {
            debug_if_enabled!("Exposé для {} пропущен: окон {}", app, window_count);
            GesturePlan::Native
        }
    }

    /// Применить план: побочные эффекты и изменения отслеживания
    pub(super) fn apply_plan(&mut self, plan: GesturePlan, app: &AppId, now: Instant) -> Disposition {
        debug_if_enabled!("План для {}: {}", app, plan);

        match plan {
            GesturePlan::FollowExpose => {
                self.tracking.follow(app, now);
                self.scheduler
                    .schedule(DeferredTask::ProbeWindows { app: app.clone() }, Duration::ZERO);
            }
            GesturePlan::DismissExpose { reopen } => {
                self.dispatch(DispatchWork::DismissExpose { reopen }, app);
                self.reset_tracking("Exposé закрыт кликом");
            }
            GesturePlan::SwitchToWindowless => {
                self.reset_tracking("переключение на приложение без окон");
                self.scheduler.schedule(
                    DeferredTask::ReassertActivation { app: app.clone() },
                    self.settings.activation_reassert_delay,
                );
            }
            GesturePlan::SwitchWithinExpose => {
                self.tracking.follow(app, now);
            }
            GesturePlan::ExposeClosedNatively => {
                self.reset_tracking("Exposé закрыт нативно");
            }
            GesturePlan::InvokeExpose => {
                let token = self.tracking.begin_invocation(app, now);
                self.scheduler.schedule(
                    DeferredTask::InvokeExpose { app: app.clone(), token },
                    Duration::ZERO,
                );
            }
            GesturePlan::Perform(action) => {
                self.dispatch(DispatchWork::Perform(action), app);
                self.reset_tracking("выполнено действие");
            }
            GesturePlan::NativeLaunch => {
                self.reset_tracking("приложение не запущено");
            }
            GesturePlan::Native => {}
        }

        plan.disposition()
    }
}
