use crate::error::Result;
use crate::events::{
    AppId, CaptureEvent, ClickEvent, ClickPhase, Disposition, ModifierFlags, MouseButton, Point, ScrollDirection,
    ScrollEvent,
};
use crate::{debug_if_enabled, dock_error, trace_if_enabled};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::r#trait::{CaptureFeedback, CaptureRequest, CaptureSourceTrait};

static CLICK_PHASES: Lazy<HashMap<&'static str, ClickPhase>> = Lazy::new(|| {
    HashMap::from([
        ("down", ClickPhase::Down),
        ("drag", ClickPhase::Dragged),
        ("up", ClickPhase::Up),
    ])
});

static SCROLL_DIRECTIONS: Lazy<HashMap<&'static str, ScrollDirection>> =
    Lazy::new(|| HashMap::from([("up", ScrollDirection::Up), ("down", ScrollDirection::Down)]));

static MODIFIER_NAMES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec!["shift", "option", "alt", "control", "ctrl", "command", "cmd", "super"]
});

/// Разбор одной строки протокола. Пустые строки и комментарии дают `None`.
///
/// ```text
/// click <seq> <down|drag|up> <app|-> <x> <y> [mods] [button]
/// scroll <up|down> <app|-> [mods]
/// ```
pub fn parse_line(line: &str) -> Result<Option<CaptureEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    let event = match fields[0] {
        "click" => CaptureEvent::Click(parse_click(&fields[1..])?),
        "scroll" => CaptureEvent::Scroll(parse_scroll(&fields[1..])?),
        other => return Err(dock_error!(protocol, "неизвестное событие '{}'", other)),
    };

    Ok(Some(event))
}

fn parse_click(fields: &[&str]) -> Result<ClickEvent> {
    if !(5..=7).contains(&fields.len()) {
        return Err(dock_error!(protocol, "click: ожидается 5-7 полей, получено {}", fields.len()));
    }

    let sequence = fields[0]
        .parse::<u64>()
        .map_err(|_| dock_error!(protocol, "click: неверный номер '{}'", fields[0]))?;
    let phase = *CLICK_PHASES
        .get(fields[1])
        .ok_or_else(|| dock_error!(protocol, "click: неизвестная фаза '{}'", fields[1]))?;
    let app = parse_app(fields[2]);
    let location = Point::new(parse_coordinate(fields[3])?, parse_coordinate(fields[4])?);

    let mut event = ClickEvent::new(sequence, app, phase, location);
    if let Some(mods) = fields.get(5) {
        event = event.with_modifiers(parse_modifiers(mods)?);
    }
    if let Some(button) = fields.get(6) {
        let button = button
            .parse::<u8>()
            .map_err(|_| dock_error!(protocol, "click: неверная кнопка '{}'", button))?;
        event = event.with_button(MouseButton(button));
    }

    Ok(event)
}

fn parse_scroll(fields: &[&str]) -> Result<ScrollEvent> {
    if !(2..=3).contains(&fields.len()) {
        return Err(dock_error!(protocol, "scroll: ожидается 2-3 поля, получено {}", fields.len()));
    }

    let direction = *SCROLL_DIRECTIONS
        .get(fields[0])
        .ok_or_else(|| dock_error!(protocol, "scroll: неизвестное направление '{}'", fields[0]))?;

    let mut event = ScrollEvent::new(parse_app(fields[1]), direction);
    if let Some(mods) = fields.get(2) {
        event = event.with_modifiers(parse_modifiers(mods)?);
    }

    Ok(event)
}

fn parse_app(field: &str) -> Option<AppId> {
    (field != "-").then(|| AppId::new(field))
}

fn parse_coordinate(field: &str) -> Result<f64> {
    field
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| dock_error!(protocol, "неверная координата '{}'", field))
}

fn parse_modifiers(field: &str) -> Result<ModifierFlags> {
    if field == "-" {
        return Ok(ModifierFlags::new());
    }

    let names: Vec<&str> = field.split('+').collect();
    let unknown = names
        .iter()
        .find(|name| !MODIFIER_NAMES.iter().any(|known| known == *name));
    if let Some(unknown) = unknown {
        return Err(dock_error!(protocol, "неизвестный модификатор '{}'", unknown));
    }

    Ok(ModifierFlags::from_names(&names))
}

/// Строка протокола без перевода строки. Невалидный UTF-8 отклоняется только для этой строки.
fn decode_line(raw: &[u8]) -> Result<String> {
    let line = std::str::from_utf8(raw).map_err(|e| dock_error!(protocol, "строка не в UTF-8: {}", e))?;
    trace_if_enabled!("< {}", line.trim_end());
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Ответ на событие: `consume` или `pass`
pub fn format_reply(disposition: Disposition) -> String {
    disposition.to_string()
}

pub fn format_release(sequence: u64, location: Point) -> String {
    format!("release {} {} {}", sequence, location.x, location.y)
}

/// Обратная связь протокола: сброс нажатия уходит строкой в общий вывод
#[derive(Debug, Clone)]
pub struct LineFeedback {
    out: mpsc::UnboundedSender<String>,
}

impl CaptureFeedback for LineFeedback {
    fn post_neutral_release(&self, sequence: u64, location: Point) {
        if self.out.send(format_release(sequence, location)).is_err() {
            debug_if_enabled!("Вывод протокола закрыт, release для click#{} пропущен", sequence);
        }
    }
}

/// Мост захвата поверх построчного протокола: события читаются из `reader`,
/// ответы и сбросы нажатия пишутся в `writer` одной очередью
pub struct LineProtocolCapture<R, W> {
    reader: R,
    writer: W,
    out: mpsc::UnboundedSender<String>,
    out_rx: mpsc::UnboundedReceiver<String>,
}

impl LineProtocolCapture<BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    pub fn stdio() -> (Self, LineFeedback) {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineProtocolCapture<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> (Self, LineFeedback) {
        info!("Инициализация LineProtocolCapture");
        let (out, out_rx) = mpsc::unbounded_channel();
        let feedback = LineFeedback { out: out.clone() };
        (
            Self {
                reader,
                writer,
                out,
                out_rx,
            },
            feedback,
        )
    }

    async fn write_lines(mut writer: W, mut out_rx: mpsc::UnboundedReceiver<String>) {
        while let Some(line) = out_rx.recv().await {
            trace_if_enabled!("> {}", line);
            let written = async {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await
            }
            .await;
            if let Err(e) = written {
                warn!("Ошибка записи в вывод протокола: {}", e);
                break;
            }
        }
    }

    async fn run_impl(self, requests: mpsc::Sender<CaptureRequest>) -> Result<()> {
        let Self {
            mut reader,
            writer,
            out,
            out_rx,
        } = self;

        tokio::spawn(Self::write_lines(writer, out_rx));
        info!("LineProtocolCapture запущен, ожидаем события");

        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            if reader.read_until(b'\n', &mut buffer).await? == 0 {
                break;
            }

            let reply = match decode_line(&buffer).and_then(|line| parse_line(&line)) {
                Ok(None) => continue,
                Ok(Some(event)) => match Self::forward(&requests, event).await {
                    Some(disposition) => format_reply(disposition),
                    None => {
                        warn!("Хост остановлен, чтение событий прекращено");
                        break;
                    }
                },
                Err(e) => {
                    warn!("Строка '{}' отклонена: {}", String::from_utf8_lossy(&buffer).trim_end(), e);
                    format!("error {}", e)
                }
            };

            if out.send(reply).is_err() {
                break;
            }
        }

        info!("Ввод протокола завершён");
        Ok(())
    }

    async fn forward(requests: &mpsc::Sender<CaptureRequest>, event: CaptureEvent) -> Option<Disposition> {
        let (request, reply): (CaptureRequest, oneshot::Receiver<Disposition>) = CaptureRequest::new(event);
        requests.send(request).await.ok()?;
        reply.await.ok()
    }
}

#[async_trait::async_trait]
impl<R, W> CaptureSourceTrait for LineProtocolCapture<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn run(self: Box<Self>, requests: mpsc::Sender<CaptureRequest>) -> Result<()> {
        (*self).run_impl(requests).await
    }
}
