//! Gesture resolver: maps (trigger kind, modifier combination) to the configured action.
//!
//! Resolution is a pure function of the preference tables. The window-count gates
//! live here too, because both click and scroll planning consult them.

use crate::actions::{Action, FirstClickBehavior};
use crate::events::{ModifierCombination, ScrollDirection};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Вид жеста, для которого ищется действие
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Click,
    ScrollUp,
    ScrollDown,
}

impl From<ScrollDirection> for TriggerKind {
    fn from(direction: ScrollDirection) -> Self {
        match direction {
            ScrollDirection::Up => TriggerKind::ScrollUp,
            ScrollDirection::Down => TriggerKind::ScrollDown,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Click => f.write_str("click"),
            TriggerKind::ScrollUp => f.write_str("scroll_up"),
            TriggerKind::ScrollDown => f.write_str("scroll_down"),
        }
    }
}

/// Действие для каждой комбинации модификаторов. Незаданные ячейки = none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModifierTable {
    pub none: Action,
    pub shift: Action,
    pub option: Action,
    pub shift_option: Action,
}

impl ModifierTable {
    pub fn with_none(action: Action) -> Self {
        Self {
            none: action,
            ..Self::default()
        }
    }

    pub fn get(&self, combination: ModifierCombination) -> Action {
        match combination {
            ModifierCombination::None => self.none,
            ModifierCombination::Shift => self.shift,
            ModifierCombination::Option => self.option,
            ModifierCombination::ShiftOption => self.shift_option,
        }
    }
}

/// Действия первого клика с модификаторами. Ячейку без модификаторов
/// определяет `FirstClickBehavior`, поэтому её здесь нет.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstClickTable {
    pub shift: Action,
    pub option: Action,
    pub shift_option: Action,
}

impl FirstClickTable {
    pub fn get(&self, combination: ModifierCombination) -> Option<Action> {
        match combination {
            ModifierCombination::None => None,
            ModifierCombination::Shift => Some(self.shift),
            ModifierCombination::Option => Some(self.option),
            ModifierCombination::ShiftOption => Some(self.shift_option),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureMapping {
    #[serde(default = "default_click_table")]
    pub click: ModifierTable,
    #[serde(default = "default_scroll_up_table")]
    pub scroll_up: ModifierTable,
    #[serde(default = "default_scroll_down_table")]
    pub scroll_down: ModifierTable,
    #[serde(default)]
    pub first_click: FirstClickTable,
}

fn default_click_table() -> ModifierTable {
    ModifierTable::with_none(Action::Expose)
}

fn default_scroll_up_table() -> ModifierTable {
    ModifierTable::with_none(Action::HideApp)
}

fn default_scroll_down_table() -> ModifierTable {
    ModifierTable::with_none(Action::Expose)
}

impl Default for GestureMapping {
    fn default() -> Self {
        Self {
            click: default_click_table(),
            scroll_up: default_scroll_up_table(),
            scroll_down: default_scroll_down_table(),
            first_click: FirstClickTable::default(),
        }
    }
}

impl GestureMapping {
    pub fn table(&self, trigger: TriggerKind) -> &ModifierTable {
        match trigger {
            TriggerKind::Click => &self.click,
            TriggerKind::ScrollUp => &self.scroll_up,
            TriggerKind::ScrollDown => &self.scroll_down,
        }
    }

    pub fn resolve(&self, trigger: TriggerKind, combination: ModifierCombination) -> Action {
        self.table(trigger).get(combination)
    }
}

/// Что делать с первым кликом по неактивному приложению
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstClickResolution {
    /// Клик без модификаторов: решает `FirstClickBehavior`
    Behavior(FirstClickBehavior),
    /// Клик с модификатором: действие из таблицы первого клика
    Mapped(Action),
}

/// Все пользовательские настройки жестов; обновляются на лету
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GesturePreferences {
    pub first_click_behavior: FirstClickBehavior,
    pub first_click_requires_multiple_windows: bool,
    pub click_after_activation_requires_multiple_windows: bool,
    pub mapping: GestureMapping,
}

impl GesturePreferences {
    pub fn resolve(&self, trigger: TriggerKind, combination: ModifierCombination) -> Action {
        self.mapping.resolve(trigger, combination)
    }

    pub fn resolve_first_click(&self, combination: ModifierCombination) -> FirstClickResolution {
        match self.mapping.first_click.get(combination) {
            Some(action) => FirstClickResolution::Mapped(action),
            None => FirstClickResolution::Behavior(self.first_click_behavior),
        }
    }

    /// Нужен ли подсчёт окон на mouse-down: только когда от него зависит откат к нативному клику
    pub fn needs_first_click_window_sample(&self, combination: ModifierCombination) -> bool {
        combination.is_none() && self.first_click_behavior == FirstClickBehavior::Expose
    }
}

/// Минимальное число окон для Exposé
fn window_gate(window_count: u32, requires_multiple: bool) -> bool {
    let required = if requires_multiple { 2 } else { 1 };
    window_count >= required
}

/// Гейт Exposé для первого клика по неактивному приложению
pub fn should_run_first_click_expose(window_count: u32, requires_multiple: bool) -> bool {
    window_gate(window_count, requires_multiple)
}

/// Гейт Exposé для клика по уже активному приложению
pub fn should_run_expose_after_activation(window_count: u32, requires_multiple: bool) -> bool {
    window_gate(window_count, requires_multiple)
}
