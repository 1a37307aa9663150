//! Bounded worker pool for running independent experiments in parallel.
//!
//! Each job builds and owns its own topology and algorithm; nothing mutable
//! is shared between workers. Parallelism is across experiments only, never
//! across the phases of a round.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::debug;

use crate::error::{ExecutionError, SimResult};

use super::{ExperimentConfig, ExperimentReport};

/// Work item executed on a pool thread.
pub type ExperimentJob = Box<dyn FnOnce() -> SimResult<ExperimentReport> + Send + 'static>;

struct Job {
    run: ExperimentJob,
    reply: Sender<SimResult<ExperimentReport>>,
}

/// Handle to a submitted experiment.
pub struct ReportHandle {
    rx: Receiver<SimResult<ExperimentReport>>,
}

impl ReportHandle {
    /// Waits for the experiment to finish.
    pub fn join(self) -> SimResult<ExperimentReport> {
        self.rx.recv().map_err(|_| ExecutionError::Disconnected)?
    }

    /// Waits at most `timeout` for the experiment to finish.
    pub fn join_timeout(self, timeout: Duration) -> SimResult<ExperimentReport> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => crate::error::SimError::internal(format!(
                "experiment still running after {}ms",
                timeout.as_millis()
            )),
            RecvTimeoutError::Disconnected => ExecutionError::Disconnected.into(),
        })?
    }
}

/// Fixed-size pool of experiment workers.
pub struct ExperimentPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl ExperimentPool {
    /// Starts `config.workers` threads sharing a queue of
    /// `config.queue_capacity` jobs.
    pub fn start(config: &ExperimentConfig) -> SimResult<Self> {
        config.validate()?;
        let (tx, rx) = bounded::<Job>(config.queue_capacity);

        let mut workers = Vec::with_capacity(config.workers);
        for idx in 0..config.workers {
            let rx: Receiver<Job> = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("qnet-experiment-{idx}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        let result = (job.run)();
                        let _ = job.reply.send(result);
                    }
                })
                .map_err(|err| ExecutionError::SpawnFailed {
                    message: err.to_string(),
                })?;
            workers.push(handle);
        }
        debug!(workers = workers.len(), queue_capacity = config.queue_capacity, "experiment pool started");

        Ok(Self {
            tx: Some(tx),
            workers,
            queue_capacity: config.queue_capacity,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Queues a job without blocking.
    ///
    /// # Errors
    /// `QueueFull` if the queue is at capacity; the job is dropped.
    pub fn submit(&self, run: ExperimentJob) -> SimResult<ReportHandle> {
        let (reply, rx) = bounded(1);
        let tx = self.tx.as_ref().ok_or(ExecutionError::Disconnected)?;
        match tx.try_send(Job { run, reply }) {
            Ok(()) => Ok(ReportHandle { rx }),
            Err(TrySendError::Full(_)) => Err(ExecutionError::QueueFull {
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected.into()),
        }
    }

    /// Runs every job, blocking while the queue is full, and returns the
    /// reports in submission order.
    pub fn run_all(&self, jobs: impl IntoIterator<Item = ExperimentJob>) -> Vec<SimResult<ExperimentReport>> {
        let mut handles = Vec::new();
        for run in jobs {
            let (reply, rx) = bounded(1);
            if let Some(tx) = &self.tx {
                // A failed send drops the reply sender, so joining reports Disconnected.
                let _ = tx.send(Job { run, reply });
            }
            handles.push(ReportHandle { rx });
        }
        handles.into_iter().map(ReportHandle::join).collect()
    }
}

impl Drop for ExperimentPool {
    fn drop(&mut self) {
        // Closing the channel lets workers drain queued jobs and exit.
        drop(self.tx.take());
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
