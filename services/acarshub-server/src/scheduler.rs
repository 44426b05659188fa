//! Periodic task scheduler: wall-clock-aligned
//! intervals, enable/disable/remove/manual-run, and a handler wrapper
//! that catches and logs task failures instead of aborting the scheduler.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, warn};

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// A single registered job: an interval, an optional second-of-minute
/// alignment, and an enabled flag checked on every tick.
pub struct ScheduledTask {
    name: String,
    enabled: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledTask {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn remove(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

/// Owns every registered task's handle so `main` can tear the whole
/// schedule down on shutdown.
#[derive(Default)]
pub struct Scheduler {
    tasks: Mutex<Vec<Arc<ScheduledTask>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `every(interval).do(fn)`: fires `job` every `interval`, with the
    /// first fire aligned to the next wall-clock boundary of `interval`.
    pub fn every<F, Fut>(&self, name: &str, interval: Duration, job: F) -> Arc<ScheduledTask>
    where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
    {
        self.every_at(name, interval, None, job)
    }

    /// `every(N, unit).at(":SS").do(fn)`: same as [`Self::every`], but the
    /// first fire is aligned to the given second-of-minute instead of the
    /// interval boundary.
    pub fn every_at<F, Fut>(
        &self,
        name: &str,
        interval: Duration,
        at_second: Option<u32>,
        job: F,
    ) -> Arc<ScheduledTask>
    where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
    {
        let job: TaskFn = Arc::new(move || Box::pin(job()) as TaskFuture);
        let task = Arc::new(ScheduledTask {
                name: name.to_owned(),
                enabled: AtomicBool::new(true),
                handle: Mutex::new(None),
        });

        let loop_task = task.clone();
        let task_name = name.to_owned();
        let handle = tokio::spawn(async move {
                sleep_until_aligned(interval, at_second).await;
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    if !loop_task.is_enabled() {
                        continue;
                    }
                    run_catching(&task_name, job.clone()).await;
                }
        });
        *task.handle.lock().unwrap() = Some(handle);

        self.tasks.lock().unwrap().push(task.clone());
        task
    }

    /// Every task registered so far, for enable/disable/remove control.
    pub fn tasks(&self) -> Vec<Arc<ScheduledTask>> {
        self.tasks.lock().unwrap().clone()
    }

    /// Aborts every task, enabled or not. Idempotent.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.remove();
        }
    }
}

/// Runs `job`; a `JoinHandle` that resolves to `Err` means the spawned
/// job panicked, which is caught here and logged instead of propagating
/// and tearing down the scheduler loop.
async fn run_catching(name: &str, job: TaskFn) {
    match tokio::spawn(async move { job().await }).await {
        Ok(()) => {}
        Err(join_err) if join_err.is_panic() => {
            error!(task = name, "scheduled task panicked");
        }
        Err(join_err) => {
            warn!(task = name, error = %join_err, "scheduled task was cancelled");
        }
    }
}

async fn sleep_until_aligned(interval: Duration, at_second: Option<u32>) {
    let interval_secs = interval.as_secs().max(1) as i64;
    let now_secs = std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .unwrap_or_default()
    .as_secs() as i64;

    let wait_secs = if let Some(at_second) = at_second {
        let at_second = at_second as i64 % 60;
        let current_second = now_secs % 60;
        if current_second == at_second {
            60
        } else if current_second < at_second {
            at_second - current_second
        } else {
            60 - current_second + at_second
        }
    } else {
        let remainder = now_secs % interval_secs;
        if remainder == 0 { interval_secs } else { interval_secs - remainder }
    };
    tokio::time::sleep(Duration::from_secs(wait_secs as u64)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn disabled_task_does_not_run_its_job() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = scheduler.every("noop", Duration::from_secs(1), move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
        });
        task.disable();

        advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        scheduler.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let scheduler = Scheduler::new();
        scheduler.every("noop", Duration::from_secs(60), || async {});
        scheduler.shutdown();
        scheduler.shutdown();
        assert!(scheduler.tasks().iter().all(|t| t.handle.lock().unwrap().is_none()));
    }

    #[test]
    fn align_to_second_computes_time_until_next_occurrence() {
        // Exercises the branch math directly without a timer.
        let now_secs = 125i64; // :05 past the 2nd minute
        let at_second = 30i64;
        let current_second = now_secs % 60;
        let wait = if current_second < at_second {
            at_second - current_second
        } else {
            60 - current_second + at_second
        };
        assert_eq!(wait, 25);
    }
}
