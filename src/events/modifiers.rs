use serde::{Deserialize, Serialize};
use std::fmt;

/// Сырые флаги модификаторов, как их видит слой захвата
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifierFlags {
    pub shift: bool,
    pub option: bool,
    pub control: bool,
    pub command: bool,
}

impl ModifierFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_option(mut self, option: bool) -> Self {
        self.option = option;
        self
    }

    pub fn with_control(mut self, control: bool) -> Self {
        self.control = control;
        self
    }

    pub fn with_command(mut self, command: bool) -> Self {
        self.command = command;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.shift && !self.option && !self.control && !self.command
    }

    pub fn to_vec(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.shift { result.push("shift"); }
        if self.option { result.push("option"); }
        if self.control { result.push("control"); }
        if self.command { result.push("command"); }
        result
    }

    /// Разбор списка имён модификаторов; неизвестные имена игнорируются
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut result = Self::new();
        for name in names {
            match name.as_ref() {
                "shift" => result.shift = true,
                "option" | "alt" => result.option = true,
                "control" | "ctrl" => result.control = true,
                "command" | "cmd" | "super" => result.command = true,
                _ => {}
            }
        }
        result
    }

    /// Единственная комбинация, которая участвует в разрешении жестов
    pub fn combination(&self) -> ModifierCombination {
        ModifierCombination::from(*self)
    }
}

impl fmt::Display for ModifierFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.to_vec();
        if modifiers.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", modifiers.join("+"))
        }
    }
}

/// Комбинация модификаторов, по которой выбирается действие.
/// Control и Command в жестах не участвуют.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCombination {
    #[default]
    None,
    Shift,
    Option,
    ShiftOption,
}

impl ModifierCombination {
    pub const ALL: [ModifierCombination; 4] = [
        ModifierCombination::None,
        ModifierCombination::Shift,
        ModifierCombination::Option,
        ModifierCombination::ShiftOption,
    ];

    pub fn is_none(&self) -> bool {
        matches!(self, ModifierCombination::None)
    }
}

impl From<ModifierFlags> for ModifierCombination {
    fn from(flags: ModifierFlags) -> Self {
        match (flags.shift, flags.option) {
            (true, true) => ModifierCombination::ShiftOption,
            (true, false) => ModifierCombination::Shift,
            (false, true) => ModifierCombination::Option,
            (false, false) => ModifierCombination::None,
        }
    }
}

impl fmt::Display for ModifierCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModifierCombination::None => "none",
            ModifierCombination::Shift => "shift",
            ModifierCombination::Option => "option",
            ModifierCombination::ShiftOption => "shift+option",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combination_from_flags() {
        let none = ModifierFlags::new();
        let shift = ModifierFlags::new().with_shift(true);
        let option = ModifierFlags::new().with_option(true);
        let both = ModifierFlags::new().with_shift(true).with_option(true);

        assert_eq!(none.combination(), ModifierCombination::None);
        assert_eq!(shift.combination(), ModifierCombination::Shift);
        assert_eq!(option.combination(), ModifierCombination::Option);
        assert_eq!(both.combination(), ModifierCombination::ShiftOption);
    }

    #[test]
    fn test_control_and_command_are_ignored() {
        let flags = ModifierFlags::new().with_control(true).with_command(true);
        assert!(!flags.is_empty());
        assert_eq!(flags.combination(), ModifierCombination::None);

        let flags = flags.with_option(true);
        assert_eq!(flags.combination(), ModifierCombination::Option);
    }

    #[test]
    fn test_from_names() {
        let flags = ModifierFlags::from_names(&["shift", "alt", "unknown"]);
        assert_eq!(flags, ModifierFlags::new().with_shift(true).with_option(true));
        assert_eq!(flags.to_string(), "shift+option");
        assert_eq!(ModifierFlags::new().to_string(), "none");
    }
}
