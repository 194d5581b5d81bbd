use crate::events::{AppId, ClickEvent, ClickPhase, Disposition, ModifierFlags, Point};
use crate::services::scheduler::DeferredTask;
use crate::debug_if_enabled;
use std::time::Instant;
use tracing::debug;

use super::decision::{ClickInput, PlanPhase};
use super::GestureEngine;

/// Контекст нажатия между mouse-down и mouse-up. Одновременно живёт не больше одного.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingClickContext {
    pub sequence: u64,
    pub app: AppId,
    pub modifiers: ModifierFlags,
    pub down_location: Point,
    pub down_at: Instant,
    pub frontmost_before: Option<AppId>,
    pub window_count_at_down: Option<u32>,
    pub planned_consume: bool,
    pub forced_fallback: bool,
    pub dragged: bool,
}

impl PendingClickContext {
    fn input(&self, timestamp: Instant) -> ClickInput<'_> {
        ClickInput {
            app: &self.app,
            combination: self.modifiers.combination(),
            frontmost_before: self.frontmost_before.as_ref(),
            window_count_at_down: self.window_count_at_down,
            forced_fallback: self.forced_fallback,
            timestamp,
        }
    }
}

/// Последний завершённый клик: повторная доставка того же mouse-up получает тот же ответ
#[derive(Debug, Clone, Copy)]
pub(super) struct CompletedClick {
    pub sequence: u64,
    pub disposition: Disposition,
}

impl GestureEngine {
    /// Обработать фазу клика по доку и вернуть решение для нативного события
    pub fn on_click(&mut self, event: &ClickEvent) -> Disposition {
        if !event.button.is_primary() {
            debug_if_enabled!("Пропуск {}: не основная кнопка", event);
            return Disposition::PassThrough;
        }

        match event.phase {
            ClickPhase::Down => self.on_click_down(event),
            ClickPhase::Dragged => self.on_click_dragged(event),
            ClickPhase::Up => self.on_click_up(event),
        }
    }

    fn on_click_down(&mut self, event: &ClickEvent) -> Disposition {
        if let Some(previous) = self.pending.take() {
            debug!("click#{} вытеснен новым нажатием click#{}", previous.sequence, event.sequence);
        }

        let Some(app) = event.app.clone() else {
            // Клик мимо иконок: любое отслеживание Exposé теряет смысл
            self.reset_tracking("клик мимо иконок дока");
            return Disposition::PassThrough;
        };

        let frontmost_before = self.frontmost();
        let combination = event.modifiers.combination();
        let is_frontmost = frontmost_before.as_ref() == Some(&app);

        let window_count_at_down = if !is_frontmost
            && self.prefs.needs_first_click_window_sample(combination)
            && self.is_running(&app)
        {
            Some(self.window_count(&app))
        } else {
            None
        };

        let mut context = PendingClickContext {
            sequence: event.sequence,
            app,
            modifiers: event.modifiers,
            down_location: event.location,
            down_at: event.timestamp,
            frontmost_before,
            window_count_at_down,
            planned_consume: false,
            forced_fallback: window_count_at_down == Some(0),
            dragged: false,
        };

        let plan = self.plan_click(&context.input(event.timestamp), PlanPhase::Predict);
        context.planned_consume = plan.disposition().is_consume();

        debug_if_enabled!(
            "{}: frontmost {:?}, окон {:?}, ожидается {}",
            event,
            context.frontmost_before.as_ref().map(AppId::as_str),
            context.window_count_at_down,
            plan
        );

        self.pending = Some(context);

        // Mouse-down всегда проходит: иначе док остаётся в "нажатом" состоянии
        Disposition::PassThrough
    }

    fn on_click_dragged(&mut self, event: &ClickEvent) -> Disposition {
        let threshold = self.settings.drag_threshold_px;

        match self.pending.as_mut() {
            Some(context) if context.sequence == event.sequence => {
                if !context.dragged && context.down_location.distance_to(event.location) > threshold {
                    context.dragged = true;
                    debug!("click#{} стал перетаскиванием", context.sequence);
                }
                Disposition::from_consume(context.planned_consume)
            }
            _ => Disposition::PassThrough,
        }
    }

    fn on_click_up(&mut self, event: &ClickEvent) -> Disposition {
        if let Some(done) = self.last_completed {
            if done.sequence == event.sequence {
                debug_if_enabled!("Повторный mouse-up {}: {}", event, done.disposition);
                return done.disposition;
            }
        }

        let context = match self.pending.take() {
            Some(context) if context.sequence == event.sequence => Some(context),
            Some(context) if context.sequence > event.sequence => {
                debug!("Устаревший mouse-up click#{} при ожидании click#{}", event.sequence, context.sequence);
                self.pending = Some(context);
                return Disposition::PassThrough;
            }
            Some(context) => {
                debug!("mouse-up для click#{} потерян, контекст сброшен", context.sequence);
                None
            }
            None => None,
        };

        let disposition = match context {
            Some(context) if context.dragged => {
                debug_if_enabled!("click#{} был перетаскиванием, действие отменено", context.sequence);
                Disposition::PassThrough
            }
            Some(context) => {
                let plan = self.plan_click(&context.input(event.timestamp), PlanPhase::Execute);
                self.apply_plan(plan, &context.app, event.timestamp)
            }
            None => self.recover_orphan_up(event),
        };

        self.last_completed = Some(CompletedClick {
            sequence: event.sequence,
            disposition,
        });

        if disposition.is_consume() {
            self.scheduler.schedule(
                DeferredTask::NeutralRelease {
                    sequence: event.sequence,
                    location: event.location,
                },
                self.settings.neutral_release_delay,
            );
        }

        disposition
    }

    /// Mouse-up без mouse-down: внутри Exposé док может проглотить нажатие
    fn recover_orphan_up(&mut self, event: &ClickEvent) -> Disposition {
        let Some(app) = event.app.as_ref() else {
            return Disposition::PassThrough;
        };

        let frontmost = self.frontmost();
        if !self.interaction_active(frontmost.as_ref(), event.timestamp) {
            debug_if_enabled!("mouse-up {} без контекста пропущен", event);
            return Disposition::PassThrough;
        }

        debug!("Восстановлен контекст для {}", event);
        let input = ClickInput {
            app,
            combination: event.modifiers.combination(),
            frontmost_before: frontmost.as_ref(),
            window_count_at_down: None,
            forced_fallback: false,
            timestamp: event.timestamp,
        };
        let plan = self.plan_click(&input, PlanPhase::Execute);
        self.apply_plan(plan, app, event.timestamp)
    }
}
