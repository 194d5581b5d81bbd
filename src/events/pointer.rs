use super::ModifierFlags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Идентификатор приложения (bundle id или аналог)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AppId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Точка на экране в пикселях
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.0}, {:.0})", self.x, self.y)
    }
}

/// Кнопка мыши; в жестах участвует только основная
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(pub u8);

impl MouseButton {
    pub const PRIMARY: MouseButton = MouseButton(0);

    pub fn is_primary(&self) -> bool {
        self.0 == 0
    }
}

/// Фаза физического клика
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClickPhase {
    Down,
    Dragged,
    Up,
}

/// Событие клика по доку, уже прошедшее hit-test.
/// `sequence` назначается слоем захвата и одинаков для всех фаз одного клика.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub sequence: u64,
    pub app: Option<AppId>,
    pub button: MouseButton,
    pub modifiers: ModifierFlags,
    pub phase: ClickPhase,
    pub location: Point,
    pub timestamp: Instant,
}

impl ClickEvent {
    pub fn new(sequence: u64, app: Option<AppId>, phase: ClickPhase, location: Point) -> Self {
        Self {
            sequence,
            app,
            button: MouseButton::PRIMARY,
            modifiers: ModifierFlags::default(),
            phase,
            location,
            timestamp: Instant::now(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifierFlags) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn at(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for ClickEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let app = self.app.as_ref().map(AppId::as_str).unwrap_or("-");
        write!(
            f,
            "click#{} {:?} {} [{}] {}",
            self.sequence, self.phase, app, self.modifiers, self.location
        )
    }
}

/// Направление прокрутки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Событие прокрутки над иконкой дока
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollEvent {
    pub app: Option<AppId>,
    pub direction: ScrollDirection,
    pub modifiers: ModifierFlags,
    pub timestamp: Instant,
}

impl ScrollEvent {
    pub fn new(app: Option<AppId>, direction: ScrollDirection) -> Self {
        Self {
            app,
            direction,
            modifiers: ModifierFlags::default(),
            timestamp: Instant::now(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: ModifierFlags) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for ScrollEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let app = self.app.as_ref().map(AppId::as_str).unwrap_or("-");
        write!(f, "scroll {:?} {} [{}]", self.direction, app, self.modifiers)
    }
}

/// Классифицированное событие от слоя захвата
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    Click(ClickEvent),
    Scroll(ScrollEvent),
}

impl fmt::Display for CaptureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEvent::Click(event) => fmt::Display::fmt(event, f),
            CaptureEvent::Scroll(event) => fmt::Display::fmt(event, f),
        }
    }
}

/// Решение, которое синхронно возвращается слою захвата
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    PassThrough,
    Consume,
}

impl Disposition {
    pub fn from_consume(consume: bool) -> Self {
        if consume {
            Disposition::Consume
        } else {
            Disposition::PassThrough
        }
    }

    pub fn is_consume(&self) -> bool {
        matches!(self, Disposition::Consume)
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::PassThrough => f.write_str("pass"),
            Disposition::Consume => f.write_str("consume"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
    }

    #[test]
    fn test_click_event_display() {
        let event = ClickEvent::new(7, Some(AppId::from("com.apple.Safari")), ClickPhase::Up, Point::new(10.0, 20.0))
            .with_modifiers(ModifierFlags::new().with_shift(true));
        assert_eq!(event.to_string(), "click#7 Up com.apple.Safari [shift] (10, 20)");

        let miss = ClickEvent::new(8, None, ClickPhase::Down, Point::default());
        assert!(miss.to_string().contains(" - "));
    }

    #[test]
    fn test_disposition() {
        assert_eq!(Disposition::from_consume(true), Disposition::Consume);
        assert!(!Disposition::from_consume(false).is_consume());
        assert_eq!(Disposition::PassThrough.to_string(), "pass");
    }
}
