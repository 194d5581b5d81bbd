use crate::events::AppId;
use crate::services::gesture_resolver::GesturePreferences;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub dock: DockConfig,
    pub gestures: GesturePreferences,
    pub timing: TimingConfig,
    pub commands: CommandsConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            filter: "dock_actioner=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DockConfig {
    /// Идентификатор процесса самого дока; нужен эвристике активного Exposé
    pub app_id: AppId,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            app_id: AppId::new("com.apple.dock"),
        }
    }
}

/// Тайминги движка. Читаются один раз при старте.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    pub drag_threshold_px: f64,
    pub scroll_debounce_ms: u64,
    pub toggle_cooldown_ms: u64,
    pub expose_recency_ms: u64,
    pub neutral_release_delay_ms: u64,
    pub activation_reassert_delay_ms: u64,
    /// Сколько ждать вызова Exposé, прежде чем считать его неудачным
    pub expose_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: 6.0,
            scroll_debounce_ms: 350,
            toggle_cooldown_ms: 800,
            expose_recency_ms: 1500,
            neutral_release_delay_ms: 30,
            activation_reassert_delay_ms: 150,
            expose_timeout_ms: 3000,
        }
    }
}

impl TimingConfig {
    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn toggle_cooldown(&self) -> Duration {
        Duration::from_millis(self.toggle_cooldown_ms)
    }

    pub fn expose_recency(&self) -> Duration {
        Duration::from_millis(self.expose_recency_ms)
    }

    pub fn neutral_release_delay(&self) -> Duration {
        Duration::from_millis(self.neutral_release_delay_ms)
    }

    pub fn activation_reassert_delay(&self) -> Duration {
        Duration::from_millis(self.activation_reassert_delay_ms)
    }

    pub fn expose_timeout(&self) -> Duration {
        Duration::from_millis(self.expose_timeout_ms)
    }
}

/// Шаблоны команд для внешнего исполнителя действий над окнами.
/// `{app}` заменяется идентификатором приложения.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub shell: Option<String>,
    pub hide: Option<String>,
    pub unhide: Option<String>,
    pub activate: Option<String>,
    pub minimize_all: Option<String>,
    pub restore_all: Option<String>,
    pub bring_all_to_front: Option<String>,
    pub hide_others: Option<String>,
    pub quit: Option<String>,
    pub activate_and_show_main: Option<String>,
    pub exit_expose: Option<String>,
    pub invoke_expose: Option<String>,
    pub frontmost_app: Option<String>,
    pub is_running: Option<String>,
    pub is_hidden: Option<String>,
    pub is_minimized: Option<String>,
    pub window_count: Option<String>,
    pub has_visible_windows: Option<String>,
}

/// Начальное состояние симулированного рабочего стола (dry-run)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub frontmost: Option<AppId>,
    pub apps: Vec<SimulatedApp>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedApp {
    pub id: AppId,
    #[serde(default = "default_true")]
    pub running: bool,
    #[serde(default)]
    pub windows: u32,
    #[serde(default)]
    pub hidden: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let app = |id: &str, windows: u32| SimulatedApp {
            id: AppId::new(id),
            running: true,
            windows,
            hidden: false,
        };
        Self {
            frontmost: Some(AppId::new("com.apple.finder")),
            apps: vec![
                app("com.apple.finder", 1),
                app("com.apple.Safari", 2),
                app("com.apple.Terminal", 0),
                SimulatedApp {
                    id: AppId::new("com.apple.Notes"),
                    running: false,
                    windows: 0,
                    hidden: false,
                },
            ],
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("DOCK_ACTIONER_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "full" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация таймингов
        if self.timing.scroll_debounce_ms == 0 {
            anyhow::bail!("scroll_debounce_ms должно быть больше 0");
        }

        if self.timing.expose_timeout_ms == 0 {
            anyhow::bail!("expose_timeout_ms должно быть больше 0");
        }

        if !self.timing.drag_threshold_px.is_finite() || self.timing.drag_threshold_px < 0.0 {
            anyhow::bail!(
                "drag_threshold_px должно быть неотрицательным числом, получено {}",
                self.timing.drag_threshold_px
            );
        }

        if self.dock.app_id.as_str().is_empty() {
            anyhow::bail!("dock.app_id не может быть пустым");
        }

        // Валидация симуляции
        for (i, app) in self.simulation.apps.iter().enumerate() {
            if app.id.as_str().is_empty() {
                anyhow::bail!("Пустой идентификатор приложения в simulation.apps #{}", i + 1);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, FirstClickBehavior};
    use std::io::Write;

    fn write_config(contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "dock-actioner-config-{}-{}",
            std::process::id(),
            contents.len()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("dock-actioner.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load("/nonexistent/dock-actioner.toml").unwrap();
        assert_eq!(config.timing.scroll_debounce_ms, 350);
        assert_eq!(config.dock.app_id, AppId::new("com.apple.dock"));
        assert_eq!(config.gestures.first_click_behavior, FirstClickBehavior::ActivateApp);
    }

    #[test]
    fn test_load_gestures_from_toml() {
        let path = write_config(
            r#"
[gestures]
first_click_behavior = "expose"
first_click_requires_multiple_windows = true

[gestures.mapping.click]
shift = "hide_others"

[gestures.mapping.first_click]
option = "quit_app"

[timing]
scroll_debounce_ms = 200
"#,
        );

        let config = Config::load(&path).unwrap();
        let gestures = &config.gestures;
        assert_eq!(gestures.first_click_behavior, FirstClickBehavior::Expose);
        assert!(gestures.first_click_requires_multiple_windows);
        assert!(!gestures.click_after_activation_requires_multiple_windows);
        // Частично заданная таблица дополняется значением none
        assert_eq!(gestures.mapping.click.shift, Action::HideOthers);
        assert_eq!(gestures.mapping.click.none, Action::None);
        // Незаданные таблицы берут значения по умолчанию
        assert_eq!(gestures.mapping.scroll_down.none, Action::Expose);
        assert_eq!(gestures.mapping.first_click.option, Action::QuitApp);
        assert_eq!(config.timing.scroll_debounce_ms, 200);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timing.scroll_debounce_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timing.drag_threshold_px = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timing.expose_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
