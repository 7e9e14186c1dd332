//! Worker runner: drives periodic tasks until shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::task::{PeriodicTask, TaskError};

/// Runs every registered task on its own interval.
///
/// A failed cycle is logged and the task keeps its schedule. A cycle in
/// progress when shutdown is signalled runs to completion.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Worker identifier
    worker_id: String,
    /// Registered tasks
    tasks: Vec<Arc<dyn PeriodicTask>>,
}

impl WorkerRunner {
    /// Create a runner with no tasks.
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            tasks: Vec::new(),
        }
    }

    /// Register a task.
    pub fn register(&mut self, task: Arc<dyn PeriodicTask>) {
        tracing::info!(
            task = task.name(),
            interval_secs = task.interval().as_secs(),
            "Registered periodic task"
        );
        self.tasks.push(task);
    }

    /// Number of registered tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Run until `cancel` flips to `true`.
    pub async fn run(&self, cancel: watch::Receiver<bool>) {
        tracing::info!(
            worker_id = %self.worker_id,
            tasks = self.tasks.len(),
            "Worker started"
        );

        let mut running = JoinSet::new();
        for task in &self.tasks {
            running.spawn(drive(Arc::clone(task), cancel.clone()));
        }

        while let Some(result) = running.join_next().await {
            if let Err(e) = result {
                tracing::error!(worker_id = %self.worker_id, error = %e, "Task loop aborted");
            }
        }

        tracing::info!(worker_id = %self.worker_id, "Worker shut down complete");
    }
}

/// One task's schedule loop.
async fn drive(task: Arc<dyn PeriodicTask>, mut cancel: watch::Receiver<bool>) {
    let mut ticker = time::interval(task.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *cancel.borrow() {
            break;
        }
        tokio::select! {
            changed = cancel.changed() => {
                // A dropped sender means the process is going away.
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                run_cycle(task.as_ref()).await;
            }
        }
    }

    tracing::info!(task = task.name(), "Task stopped");
}

async fn run_cycle(task: &dyn PeriodicTask) {
    let started = time::Instant::now();
    match task.run_once().await {
        Ok(summary) => {
            tracing::debug!(
                task = task.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                summary = %summary,
                "Task cycle completed"
            );
        }
        Err(TaskError::Transient(msg)) => {
            tracing::warn!(task = task.name(), error = %msg, "Task cycle failed, will retry");
        }
        Err(e) => {
            tracing::error!(task = task.name(), error = %e, "Task cycle failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingTask {
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl PeriodicTask for CountingTask {
        fn name(&self) -> &str {
            "counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(60)
        }

        async fn run_once(&self) -> Result<Value, TaskError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TaskError::Transient("store down".to_string()));
            }
            Ok(Value::Null)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_interval_until_cancelled() {
        let task = Arc::new(CountingTask::default());
        let mut runner = WorkerRunner::new("test");
        runner.register(task.clone());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        // first tick fires immediately, then every 60s
        time::sleep(Duration::from_secs(150)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();

        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycles_keep_the_schedule() {
        let task = Arc::new(CountingTask {
            runs: AtomicUsize::new(0),
            fail: true,
        });
        let mut runner = WorkerRunner::new("test");
        runner.register(task.clone());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(rx).await });

        time::sleep(Duration::from_secs(130)).await;
        assert_eq!(task.runs.load(Ordering::SeqCst), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
