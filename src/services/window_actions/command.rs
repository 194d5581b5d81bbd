use crate::config::CommandsConfig;
use crate::error::{DockError, Result};
use crate::events::AppId;
use crate::services::expose_tracking::ExposeEvidence;
use crate::{debug_if_enabled, dock_error};
use std::process::{Command, Output};
use tracing::{debug, info};

use super::r#trait::WindowActions;

const DEFAULT_SHELL: &str = "/bin/sh";

/// Код выхода команды Exposé, означающий "вызвано, но эффекта не видно"
const EXPOSE_NOT_OBSERVED_EXIT: i32 = 2;

/// Исполнитель действий через внешние команды-помощники.
///
/// Каждая операция описывается шаблоном командной строки из конфигурации;
/// `{app}` заменяется идентификатором приложения в одинарных кавычках.
pub struct CommandWindowActions {
    shell: String,
    commands: CommandsConfig,
}

impl CommandWindowActions {
    pub fn new(commands: CommandsConfig) -> Result<Self> {
        let shell = commands
            .shell
            .clone()
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());

        info!("Инициализация CommandWindowActions (shell: {})", shell);

        if commands.frontmost_app.is_none() {
            return Err(dock_error!(
                service_unavailable,
                "commands.frontmost_app не задан: без него движок не видит активное приложение"
            ));
        }

        Ok(Self { shell, commands })
    }

    fn render(template: &str, app: Option<&AppId>) -> String {
        match app {
            Some(app) => template.replace("{app}", &shell_quote(app.as_str())),
            None => template.to_string(),
        }
    }

    fn template<'a>(name: &str, template: &'a Option<String>) -> Result<&'a str> {
        template
            .as_deref()
            .ok_or_else(|| dock_error!(service_unavailable, "команда '{}' не настроена", name))
    }

    fn create_command(&self, command_line: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.args(["-c", command_line]);
        cmd
    }

    fn run(&self, name: &str, template: &Option<String>, app: Option<&AppId>) -> Result<Output> {
        let command_line = Self::render(Self::template(name, template)?, app);
        debug_if_enabled!("Команда '{}': {}", name, command_line);

        let output = self
            .create_command(&command_line)
            .output()
            .map_err(|e| dock_error!(command, "не удалось запустить '{}': {}", name, e))?;

        Ok(output)
    }

    fn run_action(&self, name: &str, template: &Option<String>, app: &AppId) -> Result<()> {
        let output = self.run(name, template, Some(app))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(dock_error!(action_failed, "'{}' для {}: {}", name, app, stderr.trim()));
        }
        Ok(())
    }

    fn run_query(&self, name: &str, template: &Option<String>, app: Option<&AppId>) -> Result<String> {
        let output = self.run(name, template, app)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("Запрос '{}' вернул ошибку: {}", name, stderr.trim());
            return Err(dock_error!(command, "запрос '{}' вернул ошибку: {}", name, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn query_bool(&self, name: &str, template: &Option<String>, app: &AppId) -> Result<bool> {
        let answer = self.run_query(name, template, Some(app))?;
        parse_bool(&answer).ok_or_else(|| dock_error!(command, "'{}' вернул не bool: '{}'", name, answer))
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[async_trait::async_trait]
impl WindowActions for CommandWindowActions {
    fn frontmost_app(&self) -> Result<Option<AppId>> {
        let answer = self.run_query("frontmost_app", &self.commands.frontmost_app, None)?;
        Ok(if answer.is_empty() { None } else { Some(AppId::new(answer)) })
    }

    fn is_running(&self, app: &AppId) -> Result<bool> {
        self.query_bool("is_running", &self.commands.is_running, app)
    }

    fn is_hidden(&self, app: &AppId) -> Result<bool> {
        self.query_bool("is_hidden", &self.commands.is_hidden, app)
    }

    fn is_minimized(&self, app: &AppId) -> Result<bool> {
        self.query_bool("is_minimized", &self.commands.is_minimized, app)
    }

    fn window_count(&self, app: &AppId) -> Result<u32> {
        let answer = self.run_query("window_count", &self.commands.window_count, Some(app))?;
        answer
            .parse::<u32>()
            .map_err(|e| dock_error!(command, "window_count вернул '{}': {}", answer, e))
    }

    fn has_visible_windows(&self, app: &AppId) -> Result<bool> {
        match self.commands.has_visible_windows {
            Some(_) => self.query_bool("has_visible_windows", &self.commands.has_visible_windows, app),
            // Без отдельной команды приближаемся через число окон и скрытость
            None => Ok(self.window_count(app)? > 0 && !self.is_hidden(app).unwrap_or(false)),
        }
    }

    fn hide(&self, app: &AppId) -> Result<()> {
        self.run_action("hide", &self.commands.hide, app)
    }

    fn unhide(&self, app: &AppId) -> Result<()> {
        self.run_action("unhide", &self.commands.unhide, app)
    }

    fn activate(&self, app: &AppId) -> Result<()> {
        self.run_action("activate", &self.commands.activate, app)
    }

    fn minimize_all(&self, app: &AppId) -> Result<()> {
        self.run_action("minimize_all", &self.commands.minimize_all, app)
    }

    fn restore_all(&self, app: &AppId) -> Result<()> {
        self.run_action("restore_all", &self.commands.restore_all, app)
    }

    fn bring_all_to_front(&self, app: &AppId) -> Result<()> {
        self.run_action("bring_all_to_front", &self.commands.bring_all_to_front, app)
    }

    fn hide_others(&self, app: &AppId) -> Result<()> {
        self.run_action("hide_others", &self.commands.hide_others, app)
    }

    fn quit(&self, app: &AppId) -> Result<()> {
        self.run_action("quit", &self.commands.quit, app)
    }

    fn activate_and_show_main(&self, app: &AppId) -> Result<()> {
        self.run_action("activate_and_show_main", &self.commands.activate_and_show_main, app)
    }

    fn exit_expose(&self) -> Result<()> {
        let output = self.run("exit_expose", &self.commands.exit_expose, None)?;
        if !output.status.success() {
            return Err(dock_error!(action_failed, "exit_expose завершился с {}", output.status));
        }
        Ok(())
    }

    async fn invoke_expose(&self, app: &AppId) -> Result<ExposeEvidence> {
        let command_line = Self::render(Self::template("invoke_expose", &self.commands.invoke_expose)?, Some(app));
        debug_if_enabled!("Команда 'invoke_expose': {}", command_line);

        let status = tokio::process::Command::new(&self.shell)
            .args(["-c", &command_line])
            .status()
            .await
            .map_err(|e| dock_error!(command, "не удалось запустить invoke_expose: {}", e))?;

        match status.code() {
            Some(0) => Ok(ExposeEvidence::Visible),
            Some(EXPOSE_NOT_OBSERVED_EXIT) => Ok(ExposeEvidence::NotObserved),
            _ => Err(DockError::ActionFailed(format!("invoke_expose для {} завершился с {}", app, status))),
        }
    }
}
