pub mod modifiers;
pub mod pointer;

pub use modifiers::{ModifierCombination, ModifierFlags};
pub use pointer::{
    AppId, CaptureEvent, ClickEvent, ClickPhase, Disposition, MouseButton, Point, ScrollDirection,
    ScrollEvent,
};
