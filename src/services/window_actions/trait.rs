use crate::config::Config;
use crate::error::Result;
use crate::events::AppId;
use crate::services::expose_tracking::ExposeEvidence;
use std::sync::Arc;

use super::command::CommandWindowActions;
use super::simulated::SimulatedDesktop;

/// Trait for the window/process action collaborator.
///
/// Queries and plain actions are synchronous and expected to be fast; the Exposé
/// invocation is asynchronous and is never awaited on the decision path.
#[async_trait::async_trait]
pub trait WindowActions: Send + Sync {
    fn frontmost_app(&self) -> Result<Option<AppId>>;
    fn is_running(&self, app: &AppId) -> Result<bool>;
    fn is_hidden(&self, app: &AppId) -> Result<bool>;
    fn is_minimized(&self, app: &AppId) -> Result<bool>;
    fn window_count(&self, app: &AppId) -> Result<u32>;
    fn has_visible_windows(&self, app: &AppId) -> Result<bool>;

    fn hide(&self, app: &AppId) -> Result<()>;
    fn unhide(&self, app: &AppId) -> Result<()>;
    /// Вывести приложение на передний план
    fn activate(&self, app: &AppId) -> Result<()>;
    fn minimize_all(&self, app: &AppId) -> Result<()>;
    fn restore_all(&self, app: &AppId) -> Result<()>;
    fn bring_all_to_front(&self, app: &AppId) -> Result<()>;
    fn hide_others(&self, app: &AppId) -> Result<()>;
    fn quit(&self, app: &AppId) -> Result<()>;
    /// Активировать и показать главное окно (эквивалент запуска)
    fn activate_and_show_main(&self, app: &AppId) -> Result<()>;
    /// Закрыть Exposé (аналог Escape)
    fn exit_expose(&self) -> Result<()>;

    async fn invoke_expose(&self, app: &AppId) -> Result<ExposeEvidence>;
}

/// Factory function to create window actions based on the dry_run flag
pub fn create_window_actions(config: &Config, dry_run: bool) -> Result<Arc<dyn WindowActions>> {
    if dry_run {
        Ok(Arc::new(SimulatedDesktop::from_config(
            &config.simulation,
            config.dock.app_id.clone(),
        )))
    } else {
        Ok(Arc::new(CommandWindowActions::new(config.commands.clone())?))
    }
}
