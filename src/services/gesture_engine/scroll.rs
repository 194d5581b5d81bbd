use crate::actions::Action;
use crate::events::{AppId, Disposition, ScrollDirection, ScrollEvent};
use crate::services::gesture_resolver::TriggerKind;
use crate::debug_if_enabled;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::decision::{ExposeGate, GesturePlan, PlanPhase};
use super::GestureEngine;

/// Подавление повторов прокрутки: дребезг по (приложение, направление)
/// и пауза между переключениями по (приложение, действие)
#[derive(Debug, Default)]
pub(super) struct ScrollCoordinator {
    last_scroll: Option<(AppId, ScrollDirection, Instant)>,
    cooldowns: HashMap<(AppId, Action), Instant>,
}

impl ScrollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Повтор той же прокрутки внутри окна дребезга. Окно скользящее: запись обновляется всегда.
    pub fn is_repeat(&mut self, app: &AppId, direction: ScrollDirection, now: Instant, debounce: Duration) -> bool {
        let repeat = matches!(
            &self.last_scroll,
            Some((last_app, last_direction, at))
                if last_app == app
                    && *last_direction == direction
                    && now.saturating_duration_since(*at) < debounce
        );
        self.last_scroll = Some((app.clone(), direction, now));
        repeat
    }

    pub fn is_cooling_down(&self, app: &AppId, action: Action, now: Instant, cooldown: Duration) -> bool {
        self.cooldowns
            .get(&(app.clone(), action))
            .map(|at| now.saturating_duration_since(*at) < cooldown)
            .unwrap_or(false)
    }

    pub fn start_cooldown(&mut self, app: &AppId, action: Action, now: Instant, cooldown: Duration) {
        self.cooldowns
            .retain(|_, at| now.saturating_duration_since(*at) < cooldown);
        self.cooldowns.insert((app.clone(), action), now);
    }
}

impl GestureEngine {
    /// Обработать прокрутку над иконкой дока
    pub fn on_scroll(&mut self, event: &ScrollEvent) -> Disposition {
        let Some(app) = event.app.as_ref() else {
            self.reset_tracking("прокрутка мимо иконок дока");
            return Disposition::PassThrough;
        };
        let now = event.timestamp;

        if self
            .scroll
            .is_repeat(app, event.direction, now, self.settings.scroll_debounce)
        {
            debug_if_enabled!("Прокрутка {:?} над {} подавлена (дребезг)", event.direction, app);
            return Disposition::Consume;
        }

        let frontmost = self.frontmost();
        if self.interaction_active(frontmost.as_ref(), now) {
            debug_if_enabled!("Прокрутка над {} внутри Exposé пропущена", app);
            return Disposition::PassThrough;
        }

        let action = self
            .prefs
            .resolve(TriggerKind::from(event.direction), event.modifiers.combination());
        let plan = self.plan_action(action, app, ExposeGate::AfterActivation, PlanPhase::Execute);

        if let GesturePlan::Perform(action) = plan {
            if action.is_scroll_toggle() {
                let cooldown = self.settings.toggle_cooldown;
                if self.scroll.is_cooling_down(app, action, now, cooldown) {
                    debug_if_enabled!("{} для {} в паузе после переключения", action, app);
                    return Disposition::Consume;
                }
                self.scroll.start_cooldown(app, action, now, cooldown);
            }
        }

        self.apply_plan(plan, app, now)
    }
}
