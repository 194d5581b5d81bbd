use crate::events::AppId;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};

/// Токен асинхронного вызова Exposé. Завершить вызов может только владелец текущего токена.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExposeToken(u64);

impl ExposeToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExposeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expose#{}", self.0)
    }
}

/// Подтверждение того, что Exposé действительно показался
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposeEvidence {
    Visible,
    NotObserved,
}

/// Итог применения завершения вызова Exposé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Confirmed,
    RolledBack,
    Stale,
}

/// Снимок сессии Exposé; сбрасывается и восстанавливается целиком
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ExposeSession {
    triggered_app: Option<AppId>,
    current_app: Option<AppId>,
    apps_without_windows: HashSet<AppId>,
    last_interaction_at: Option<Instant>,
}

impl ExposeSession {
    fn is_empty(&self) -> bool {
        self.triggered_app.is_none()
            && self.current_app.is_none()
            && self.apps_without_windows.is_empty()
            && self.last_interaction_at.is_none()
    }
}

/// Вызов Exposé, результат которого ещё не пришёл
#[derive(Debug, Clone)]
pub struct InFlightExpose {
    pub token: ExposeToken,
    pub app: AppId,
    rollback: ExposeSession,
}

/// Состояние отслеживания Exposé на время сессии движка.
///
/// Инварианты:
/// - сброс (`reset`) атомарно очищает сессию и вызов в полёте;
/// - у не более чем одного вызова есть действующий токен;
/// - токены монотонны и не переиспользуются после сброса.
#[derive(Debug, Default)]
pub struct ExposeTrackingState {
    session: ExposeSession,
    in_flight: Option<InFlightExpose>,
    next_token: u64,
}

impl ExposeTrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triggered_app(&self) -> Option<&AppId> {
        self.session.triggered_app.as_ref()
    }

    pub fn current_app(&self) -> Option<&AppId> {
        self.session.current_app.as_ref()
    }

    pub fn last_interaction_at(&self) -> Option<Instant> {
        self.session.last_interaction_at
    }

    pub fn is_without_windows(&self, app: &AppId) -> bool {
        self.session.apps_without_windows.contains(app)
    }

    pub fn in_flight(&self) -> Option<&InFlightExpose> {
        self.in_flight.as_ref()
    }

    pub fn invocation_token(&self) -> Option<ExposeToken> {
        self.in_flight.as_ref().map(|pending| pending.token)
    }

    pub fn is_empty(&self) -> bool {
        self.session.is_empty() && self.in_flight.is_none()
    }

    /// Эвристика "пользователь сейчас внутри Exposé".
    ///
    /// Истинна, если вызов Exposé ещё в полёте, либо если на передний план вышел
    /// сам док при непустом отслеживании и последнем взаимодействии не старше `recency`.
    pub fn is_interaction_active(
        &self,
        frontmost: Option<&AppId>,
        dock: &AppId,
        now: Instant,
        recency: Duration,
    ) -> bool {
        if self.in_flight.is_some() {
            return true;
        }

        if self.is_empty() || frontmost != Some(dock) {
            return false;
        }

        self.session
            .last_interaction_at
            .map(|at| now.saturating_duration_since(at) <= recency)
            .unwrap_or(false)
    }

    /// Следуем за нативным переключением приложений внутри Exposé
    pub fn follow(&mut self, app: &AppId, now: Instant) {
        self.session.current_app = Some(app.clone());
        self.session.triggered_app = Some(app.clone());
        self.session.last_interaction_at = Some(now);
    }

    pub fn note_without_windows(&mut self, app: &AppId) {
        self.session.apps_without_windows.insert(app.clone());
    }

    pub fn reset(&mut self) {
        self.session = ExposeSession::default();
        self.in_flight = None;
    }

    /// Начать вызов Exposé: оптимистично обновляем сессию и запоминаем снимок для отката.
    /// Предыдущий вызов в полёте (если был) становится устаревшим.
    pub fn begin_invocation(&mut self, app: &AppId, now: Instant) -> ExposeToken {
        self.next_token += 1;
        let token = ExposeToken(self.next_token);

        let rollback = match self.in_flight.take() {
            Some(previous) => previous.rollback,
            None => self.session.clone(),
        };

        self.follow(app, now);
        self.in_flight = Some(InFlightExpose {
            token,
            app: app.clone(),
            rollback,
        });

        token
    }

    /// Применить результат вызова. Чужой или устаревший токен ничего не меняет.
    pub fn complete(&mut self, token: ExposeToken, visible: bool, now: Instant) -> CompletionOutcome {
        match self.in_flight.take() {
            Some(pending) if pending.token == token => {
                if visible {
                    self.session.last_interaction_at = Some(now);
                    CompletionOutcome::Confirmed
                } else {
                    self.session = pending.rollback;
                    CompletionOutcome::RolledBack
                }
            }
            other => {
                self.in_flight = other;
                CompletionOutcome::Stale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str) -> AppId {
        AppId::new(id)
    }

    #[test]
    fn new_state_is_empty() {
        let state = ExposeTrackingState::new();
        assert!(state.is_empty());
        assert!(state.invocation_token().is_none());
    }

    #[test]
    fn begin_and_confirm_invocation() {
        let mut state = ExposeTrackingState::new();
        let now = Instant::now();

        let token = state.begin_invocation(&app("safari"), now);
        assert_eq!(state.invocation_token(), Some(token));
        assert_eq!(state.current_app(), Some(&app("safari")));
        assert_eq!(state.triggered_app(), Some(&app("safari")));

        let later = now + Duration::from_millis(40);
        assert_eq!(state.complete(token, true, later), CompletionOutcome::Confirmed);
        assert!(state.in_flight().is_none());
        assert_eq!(state.current_app(), Some(&app("safari")));
        assert_eq!(state.last_interaction_at(), Some(later));
    }

    #[test]
    fn failed_invocation_rolls_back_to_previous_session() {
        let mut state = ExposeTrackingState::new();
        let now = Instant::now();

        let first = state.begin_invocation(&app("finder"), now);
        state.complete(first, true, now);

        let second = state.begin_invocation(&app("safari"), now);
        assert_eq!(state.current_app(), Some(&app("safari")));

        assert_eq!(state.complete(second, false, now), CompletionOutcome::RolledBack);
        assert_eq!(state.current_app(), Some(&app("finder")));
        assert_eq!(state.triggered_app(), Some(&app("finder")));
        assert!(state.in_flight().is_none());
    }

    #[test]
    fn stale_token_is_ignored() {
        let mut state = ExposeTrackingState::new();
        let now = Instant::now();

        let stale = state.begin_invocation(&app("finder"), now);
        state.reset();
        let current = state.begin_invocation(&app("safari"), now);
        assert_ne!(stale, current);

        assert_eq!(state.complete(stale, false, now), CompletionOutcome::Stale);
        assert_eq!(state.invocation_token(), Some(current));
        assert_eq!(state.current_app(), Some(&app("safari")));
    }

    #[test]
    fn superseding_invocation_keeps_original_rollback() {
        let mut state = ExposeTrackingState::new();
        let now = Instant::now();

        let first = state.begin_invocation(&app("finder"), now);
        let second = state.begin_invocation(&app("safari"), now);

        assert_eq!(state.complete(first, true, now), CompletionOutcome::Stale);
        assert_eq!(state.complete(second, false, now), CompletionOutcome::RolledBack);
        assert!(state.is_empty());
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = ExposeTrackingState::new();
        let now = Instant::now();
        state.follow(&app("safari"), now);
        state.note_without_windows(&app("terminal"));
        state.begin_invocation(&app("notes"), now);

        state.reset();
        assert!(state.is_empty());
        assert!(!state.is_without_windows(&app("terminal")));
    }

    #[test]
    fn interaction_active_heuristic() {
        let dock = app("com.apple.dock");
        let recency = Duration::from_millis(1500);
        let now = Instant::now();
        let mut state = ExposeTrackingState::new();

        // Пустое отслеживание: док на переднем плане ничего не значит
        assert!(!state.is_interaction_active(Some(&dock), &dock, now, recency));

        state.follow(&app("safari"), now);
        assert!(state.is_interaction_active(Some(&dock), &dock, now + Duration::from_millis(200), recency));
        // Передний план не док
        assert!(!state.is_interaction_active(Some(&app("safari")), &dock, now, recency));
        // Взаимодействие слишком давно
        assert!(!state.is_interaction_active(Some(&dock), &dock, now + Duration::from_secs(5), recency));

        // Вызов в полёте активен независимо от переднего плана
        state.begin_invocation(&app("safari"), now);
        assert!(state.is_interaction_active(None, &dock, now + Duration::from_secs(5), recency));
    }
}
