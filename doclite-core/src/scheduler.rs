//! The scheduler capability used for debounced flushes.
//!
//! The database never touches an ambient timer API: it owns a [`Scheduler`]
//! that can spawn a task and schedule a cancellable delayed task. The
//! default [`TokioScheduler`] uses real timers; [`ManualScheduler`] queues
//! delayed tasks and lets tests fire them deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;

/// A boxed task for the scheduler to run.
pub type Task = BoxFuture<'static, ()>;

/// Handle to a scheduled delayed task.
pub trait TimerHandle: Send {
    /// Cancels the task. A no-op when it has already run.
    fn cancel(&self);
}

/// Capability for spawning tasks and scheduling cancellable timers.
pub trait Scheduler: Send + Sync {
    /// Spawns a task to run as soon as possible.
    fn spawn(&self, task: Task);

    /// Schedules a task to run after `delay`, returning a cancel handle.
    fn after(&self, delay: Duration, task: Task) -> Box<dyn TimerHandle>;
}

/// The default scheduler, backed by tokio timers.
///
/// Requires a running tokio runtime. Cancellation only takes effect while
/// the timer is still sleeping; a task that has already started runs to
/// completion rather than being torn mid-write.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn spawn(&self, task: Task) {
        tokio::spawn(task);
    }

    fn after(&self, delay: Duration, task: Task) -> Box<dyn TimerHandle> {
        let (cancel, cancelled) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => task.await,
                _ = cancelled => {}
            }
        });
        Box::new(TimerCancel { cancel: Mutex::new(Some(cancel)) })
    }
}

struct TimerCancel {
    cancel: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl TimerHandle for TimerCancel {
    fn cancel(&self) {
        if let Ok(mut slot) = self.cancel.lock() {
            if let Some(cancel) = slot.take() {
                let _ = cancel.send(());
            }
        }
    }
}

/// A deterministic scheduler for tests.
///
/// Immediate tasks are spawned normally, but delayed tasks are queued until
/// the test drives them with [`ManualScheduler::fire_pending`]. Cancelled
/// timers are dropped from the queue and never run.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    pending: Mutex<Vec<(u64, Task)>>,
    next_id: AtomicU64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers currently queued.
    pub fn pending(&self) -> usize {
        self.inner.pending.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Runs every queued timer task, in scheduling order.
    pub async fn fire_pending(&self) {
        let tasks: Vec<Task> = {
            let mut queue = match self.inner.pending.lock() {
                Ok(queue) => queue,
                Err(poisoned) => poisoned.into_inner(),
            };
            queue.drain(..).map(|(_, task)| task).collect()
        };
        for task in tasks {
            task.await;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn spawn(&self, task: Task) {
        tokio::spawn(task);
    }

    fn after(&self, _delay: Duration, task: Task) -> Box<dyn TimerHandle> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut queue) = self.inner.pending.lock() {
            queue.push((id, task));
        }
        Box::new(ManualTimerHandle { id, inner: Arc::clone(&self.inner) })
    }
}

struct ManualTimerHandle {
    id: u64,
    inner: Arc<ManualInner>,
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(&self) {
        if let Ok(mut queue) = self.inner.pending.lock() {
            queue.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn manual_scheduler_fires_queued_tasks() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let fired = Arc::clone(&counter);
        scheduler.after(
            Duration::from_secs(60),
            Box::pin(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(scheduler.pending(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        scheduler.fire_pending().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn cancelled_timers_never_run() {
        let scheduler = ManualScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let fired = Arc::clone(&counter);
        let handle = scheduler.after(
            Duration::from_secs(60),
            Box::pin(async move {
                fired.fetch_add(1, Ordering::SeqCst);
            }),
        );

        handle.cancel();
        scheduler.fire_pending().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
