use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Clock provides the current instant to the gesture engine.
///
/// Events carry their own timestamps; the clock is only consulted for work that
/// has no triggering event at hand (asynchronous completions, deferred tasks).
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Системные часы
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Ручные часы для тестов и эмуляции: время двигается только через `advance`
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) -> Instant {
        let mut now = self.now.lock();
        *now += by;
        *now
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_on_advance() {
        let clock = ManualClock::new();
        let start = clock.now();
        assert_eq!(clock.now(), start);

        let later = clock.advance(Duration::from_millis(250));
        assert_eq!(later - start, Duration::from_millis(250));
        assert_eq!(clock.now(), later);
    }
}
