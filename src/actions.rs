use serde::{Deserialize, Serialize};
use std::fmt;

/// Логическое действие, которое может быть назначено жесту
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    None,
    ActivateApp,
    HideApp,
    HideOthers,
    Expose,
    MinimizeAll,
    QuitApp,
    BringAllToFront,
    SingleAppMode,
}

impl Action {
    /// Действия-переключатели, для которых при прокрутке действует отдельный cooldown
    pub fn is_scroll_toggle(&self) -> bool {
        matches!(self, Action::HideApp | Action::HideOthers | Action::SingleAppMode)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::None => "none",
            Action::ActivateApp => "activate_app",
            Action::HideApp => "hide_app",
            Action::HideOthers => "hide_others",
            Action::Expose => "expose",
            Action::MinimizeAll => "minimize_all",
            Action::QuitApp => "quit_app",
            Action::BringAllToFront => "bring_all_to_front",
            Action::SingleAppMode => "single_app_mode",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Поведение первого клика без модификаторов по приложению, которое не было активным
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstClickBehavior {
    #[default]
    ActivateApp,
    BringAllToFront,
    Expose,
}

impl FirstClickBehavior {
    pub fn as_action(&self) -> Action {
        match self {
            FirstClickBehavior::ActivateApp => Action::ActivateApp,
            FirstClickBehavior::BringAllToFront => Action::BringAllToFront,
            FirstClickBehavior::Expose => Action::Expose,
        }
    }
}

impl fmt::Display for FirstClickBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_action().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Holder {
        action: Action,
        behavior: FirstClickBehavior,
    }

    #[test]
    fn test_actions_deserialize_from_snake_case() {
        let holder: Holder = figment::Figment::new()
            .merge(figment::providers::Serialized::default("action", "bring_all_to_front"))
            .merge(figment::providers::Serialized::default("behavior", "expose"))
            .extract()
            .unwrap();

        assert_eq!(holder.action, Action::BringAllToFront);
        assert_eq!(holder.behavior, FirstClickBehavior::Expose);
    }

    #[test]
    fn test_scroll_toggles() {
        assert!(Action::HideApp.is_scroll_toggle());
        assert!(Action::HideOthers.is_scroll_toggle());
        assert!(Action::SingleAppMode.is_scroll_toggle());
        assert!(!Action::MinimizeAll.is_scroll_toggle());
        assert!(!Action::Expose.is_scroll_toggle());
    }

    #[test]
    fn test_display_matches_config_names() {
        assert_eq!(Action::SingleAppMode.to_string(), "single_app_mode");
        assert_eq!(FirstClickBehavior::BringAllToFront.to_string(), "bring_all_to_front");
    }
}
