use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{error, info, warn};

use dock_actioner::config::Config;
use dock_actioner::services::{
    create_capture_source, create_window_actions, EngineSettings, GestureHost, HostHandle, SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "dock-actioner")]
#[command(about = "Жесты для дока: клики и прокрутка по иконкам управляют окнами приложений")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "dock-actioner.toml")]
    config: String,

    /// Режим сухого запуска (симуляция рабочего стола и эмуляция событий)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.filter из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Конфигурация нужна раньше логирования: из неё берутся фильтр и формат
    let config = Arc::new(Config::load(&args.config)?);

    let filter = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_filter(&config));
    init_tracing(&filter, &config.logging.format)?;

    info!("Запуск DockActioner v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    if args.dry_run {
        warn!("Режим сухого запуска - рабочий стол симулируется, события эмулируются");
    }

    // Инициализация компонентов
    let desktop = create_window_actions(&config, args.dry_run)?;
    let (capture, feedback) = create_capture_source(config.clone(), args.dry_run)?;
    let (host, handle) = GestureHost::new(
        EngineSettings::from_config(&config),
        config.gestures.clone(),
        desktop,
        feedback,
        Arc::new(SystemClock),
    );

    info!("Все компоненты инициализированы");

    let host_handle = tokio::spawn(async move {
        if let Err(e) = host.run().await {
            error!("Ошибка в GestureHost: {}", e);
        }
    });
    let requests = handle.requests();
    let mut capture_handle = tokio::spawn(async move {
        if let Err(e) = capture.run(requests).await {
            error!("Ошибка в источнике событий: {}", e);
        }
    });

    info!("Все сервисы запущены");

    let mut hangup = unix_signal(SignalKind::hangup())?;

    // Ожидание сигнала завершения; SIGHUP перечитывает настройки жестов
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
                    Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
                }
                break;
            }
            _ = hangup.recv() => reload_preferences(&args.config, &handle),
            _ = &mut capture_handle => {
                info!("Источник событий завершил работу");
                break;
            }
        }
    }

    info!("Завершение работы...");

    handle.shutdown();
    capture_handle.abort();

    // Ожидаем остановку хоста (с таймаутом)
    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(shutdown_timeout, host_handle).await {
        Ok(_) => info!("Все сервисы завершили работу корректно"),
        Err(_) => warn!("Таймаут при завершении сервисов"),
    }

    info!("DockActioner завершил работу");
    Ok(())
}

fn reload_preferences(path: &str, handle: &HostHandle) {
    info!("Получен SIGHUP, перечитываем {}", path);
    match Config::load(path) {
        Ok(config) => handle.reload(config.gestures),
        Err(e) => warn!("Не удалось перечитать конфигурацию, настройки не изменены: {:#}", e),
    }
}

/// Общий уровень из logging.level плюс уточняющие директивы logging.filter
fn default_filter(config: &Config) -> String {
    if config.logging.filter.is_empty() {
        config.logging.level.clone()
    } else {
        format!("{},{}", config.logging.level, config.logging.filter)
    }
}

fn init_tracing(filter: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(filter))?;

    // stdout занят протоколом захвата, логи пишутся в stderr
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        "full" => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
    }

    Ok(())
}
