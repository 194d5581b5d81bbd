use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Приложение не запущено: {0}")]
    AppNotRunning(String),

    #[error("Действие не выполнено: {0}")]
    ActionFailed(String),

    #[error("Ошибка внешней команды: {0}")]
    Command(String),

    #[error("Ошибка протокола захвата: {0}")]
    Protocol(String),

    #[error("Сервис недоступен: {0}")]
    ServiceUnavailable(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl DockError {
    pub fn app_not_running<T>(app: impl Into<String>) -> Result<T> {
        Err(DockError::AppNotRunning(app.into()))
    }
}

pub type Result<T> = std::result::Result<T, DockError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! dock_error {
    (action_failed, $($arg:tt)*) => {
        $crate::error::DockError::ActionFailed(format!($($arg)*))
    };
    (command, $($arg:tt)*) => {
        $crate::error::DockError::Command(format!($($arg)*))
    };
    (protocol, $($arg:tt)*) => {
        $crate::error::DockError::Protocol(format!($($arg)*))
    };
    (service_unavailable, $($arg:tt)*) => {
        $crate::error::DockError::ServiceUnavailable(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::DockError::Internal(format!($($arg)*))
    };
}
