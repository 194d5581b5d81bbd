use crate::events::{AppId, Point};
use crate::services::dispatcher::DispatchWork;
use crate::services::expose_tracking::ExposeToken;
use crate::debug_if_enabled;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::warn;

/// Отложенная работа, которую движок передаёт хосту
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredTask {
    /// Сбросить "нажатое" состояние иконки после поглощённого mouse-up
    NeutralRelease { sequence: u64, location: Point },
    /// Повторно активировать приложение, если нативная активация не сработала
    ReassertActivation { app: AppId },
    /// Асинхронно вызвать Exposé; результат применяется только для текущего токена
    InvokeExpose { app: AppId, token: ExposeToken },
    /// Исполнить побочный эффект решения вне цикла хоста
    Dispatch { id: u64, app: AppId, work: DispatchWork },
    /// Проверить видимые окна приложения, за которым следует сессия Exposé
    ProbeWindows { app: AppId },
}

/// Ключ идемпотентности: новая задача с тем же ключом заменяет ожидающую
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    NeutralRelease(u64),
    ReassertActivation(AppId),
    InvokeExpose(ExposeToken),
    Dispatch(u64),
    ProbeWindows(AppId),
}

impl DeferredTask {
    pub fn key(&self) -> TaskKey {
        match self {
            DeferredTask::NeutralRelease { sequence, .. } => TaskKey::NeutralRelease(*sequence),
            DeferredTask::ReassertActivation { app } => TaskKey::ReassertActivation(app.clone()),
            DeferredTask::InvokeExpose { token, .. } => TaskKey::InvokeExpose(*token),
            DeferredTask::Dispatch { id, .. } => TaskKey::Dispatch(*id),
            DeferredTask::ProbeWindows { app } => TaskKey::ProbeWindows(app.clone()),
        }
    }
}

impl fmt::Display for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferredTask::NeutralRelease { sequence, location } => {
                write!(f, "neutral-release click#{} {}", sequence, location)
            }
            DeferredTask::ReassertActivation { app } => write!(f, "reassert-activation {}", app),
            DeferredTask::InvokeExpose { app, token } => write!(f, "invoke-expose {} ({})", app, token),
            DeferredTask::Dispatch { id, app, work } => write!(f, "dispatch#{} {} {}", id, work, app),
            DeferredTask::ProbeWindows { app } => write!(f, "probe-windows {}", app),
        }
    }
}

/// Планировщик отложенной работы. Движок только ставит задачи и никогда их не ждёт.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, task: DeferredTask, delay: Duration);
}

/// Ожидающая задача с поколением, чтобы сработавший таймер не удалил своего преемника
#[derive(Debug)]
struct PendingTask {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Планировщик на таймерах tokio: по истечении задержки задача уходит в канал хоста
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<DeferredTask>,
    pending: Arc<DashMap<TaskKey, PendingTask>>,
    generation: AtomicU64,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::UnboundedSender<DeferredTask>) -> Self {
        Self {
            tx,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Отменить все ожидающие задачи (при завершении работы)
    pub fn cancel_all(&self) {
        let keys: Vec<TaskKey> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            if let Some((_, task)) = self.pending.remove(&key) {
                task.handle.abort();
            }
        }
    }

    fn deliver(&self, task: DeferredTask) {
        if self.tx.send(task).is_err() {
            warn!("Хост уже остановлен, отложенная задача отброшена");
        }
    }

    fn spawn_delivery(&self, task: DeferredTask, key: TaskKey, generation: u64, delay: Duration) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let pending = Arc::clone(&self.pending);

        tokio::spawn(async move {
            sleep(delay).await;
            pending.remove_if(&key, |_, current| current.generation == generation);
            if tx.send(task).is_err() {
                warn!("Хост уже остановлен, отложенная задача отброшена");
            }
        })
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: DeferredTask, delay: Duration) {
        let key = task.key();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        debug_if_enabled!("Планирование {} через {}мс", task, delay.as_millis());

        // Без задержки задача уходит сразу: так сохраняется порядок постановки
        if delay.is_zero() {
            if let Some((_, previous)) = self.pending.remove(&key) {
                previous.handle.abort();
            }
            self.deliver(task);
            return;
        }

        // Таймер запускается до вставки, чтобы не держать блокировку шарда DashMap.
        // Сработавший таймер удаляет запись только своего поколения.
        let handle = self.spawn_delivery(task, key.clone(), generation, delay);
        if let Some(previous) = self.pending.insert(key.clone(), PendingTask { generation, handle }) {
            previous.handle.abort();
        }
        self.pending
            .remove_if(&key, |_, current| current.generation == generation && current.handle.is_finished());
    }
}

/// Планировщик-журнал: только запоминает задачи, ничего не исполняет
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(DeferredTask, Duration)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> Vec<(DeferredTask, Duration)> {
        self.scheduled.lock().clone()
    }

    pub fn tasks(&self) -> Vec<DeferredTask> {
        self.scheduled.lock().iter().map(|(task, _)| task.clone()).collect()
    }

    pub fn clear(&self) {
        self.scheduled.lock().clear();
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule(&self, task: DeferredTask, delay: Duration) {
        self.scheduled.lock().push((task, delay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(sequence: u64, x: f64) -> DeferredTask {
        DeferredTask::NeutralRelease {
            sequence,
            location: Point::new(x, 0.0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        scheduler.schedule(release(1, 0.0), Duration::from_millis(30));
        assert!(rx.try_recv().is_err());

        let task = rx.recv().await.unwrap();
        assert_eq!(task, release(1, 0.0));
        tokio::task::yield_now().await;
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn same_key_replaces_pending_task() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        scheduler.schedule(release(5, 1.0), Duration::from_millis(30));
        scheduler.schedule(release(5, 2.0), Duration::from_millis(30));
        scheduler.schedule(release(6, 3.0), Duration::from_millis(60));

        assert_eq!(rx.recv().await.unwrap(), release(5, 2.0));
        assert_eq!(rx.recv().await.unwrap(), release(6, 3.0));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_tasks_keep_submission_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);
        let app = AppId::new("safari");

        scheduler.schedule(release(1, 0.0), Duration::from_millis(30));
        scheduler.schedule(release(1, 5.0), Duration::ZERO);
        for id in 1..=3 {
            scheduler.schedule(
                DeferredTask::Dispatch {
                    id,
                    app: app.clone(),
                    work: DispatchWork::ReassertActivation,
                },
                Duration::ZERO,
            );
        }
        assert_eq!(scheduler.pending_count(), 0);

        // Уже в канале, без ожидания таймеров; отложенная задача с тем же ключом отменена
        assert_eq!(rx.try_recv().unwrap(), release(1, 5.0));
        for id in 1..=3 {
            assert!(matches!(rx.try_recv().unwrap(), DeferredTask::Dispatch { id: got, .. } if got == id));
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_schedules_do_not_leak_entries() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(TokioScheduler::new(tx));

        let mut workers = Vec::new();
        for worker in 0..4u64 {
            let scheduler = Arc::clone(&scheduler);
            workers.push(tokio::spawn(async move {
                for i in 0..25u64 {
                    scheduler.schedule(release(worker * 100 + i, 0.0), Duration::from_millis(1));
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }

        for _ in 0..100 {
            rx.recv().await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_drops_pending() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler::new(tx);

        scheduler.schedule(
            DeferredTask::ReassertActivation { app: AppId::new("safari") },
            Duration::from_millis(150),
        );
        scheduler.cancel_all();
        assert_eq!(scheduler.pending_count(), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(rx.try_recv().is_err());
    }
}
