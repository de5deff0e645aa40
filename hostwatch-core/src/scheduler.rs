use crate::error::MonitorError;
use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, info_span, warn, Instrument};

/// Shortest accepted polling interval; `tokio::time::interval` rejects zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// One monitoring concern, checked once per cycle.
#[async_trait]
pub trait Task: Send {
    fn name(&self) -> &str;

    async fn run_once(&mut self) -> Result<(), MonitorError>;
}

struct Worker {
    task: Box<dyn Task>,
    interval: Duration,
}

/// Runs every registered task on its own fixed-interval loop.
#[derive(Default)]
pub struct Scheduler {
    workers: Vec<Worker>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task. Intervals below `MIN_INTERVAL` are raised to it.
    pub fn register(&mut self, task: Box<dyn Task>, every: Duration) {
        if every < MIN_INTERVAL {
            warn!(
                task = %task.name(),
                requested = ?every,
                "interval too short, using {:?}", MIN_INTERVAL
            );
        }
        self.workers.push(Worker {
            task,
            interval: every.max(MIN_INTERVAL),
        });
    }

    pub fn intervals(&self) -> Vec<Duration> {
        self.workers.iter().map(|w| w.interval).collect()
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.task.name()).collect()
    }

    /// Spawn one tokio task per worker. The loops never return on their own.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        self.workers
            .into_iter()
            .map(|worker| {
                let span = info_span!("worker", task = %worker.task.name());
                tokio::spawn(run_worker(worker).instrument(span))
            })
            .collect()
    }

    /// Run a single cycle of every task, one after another.
    pub async fn run_once(&mut self) {
        for worker in &mut self.workers {
            let span = info_span!("worker", task = %worker.task.name());
            run_cycle(worker.task.as_mut()).instrument(span).await;
        }
    }
}

async fn run_worker(mut worker: Worker) {
    info!(interval_secs = worker.interval.as_secs_f64(), "starting monitor");

    let mut ticker = interval(worker.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        run_cycle(worker.task.as_mut()).await;
    }
}

/// Run one check, containing both errors and panics.
async fn run_cycle(task: &mut dyn Task) {
    match AssertUnwindSafe(task.run_once()).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "monitoring cycle failed, skipping"),
        Err(panic) => error!(
            panic = %panic_message(panic.as_ref()),
            "monitoring cycle panicked, skipping"
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
