//! Job dispatch: a fire-and-forget queue feeding a pool of workers.
//!
//! [`Dispatcher::enqueue`] hands a job identifier off without blocking; a
//! pool of long-lived Tokio tasks pulls identifiers off the shared channel,
//! each delivered to exactly one worker, and invokes the [`JobHandler`].
//! Ordering between distinct jobs is best-effort FIFO; nothing re-enqueues
//! an identifier while it is in flight.

use std::sync::Arc;

use async_trait::async_trait;
use boltzq_core::types::DbId;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The unit of work a worker performs for one dequeued identifier.
///
/// [`crate::executor::JobExecutor`] is the production implementation; tests
/// substitute instrumented handlers. A handler must not panic: it is the
/// worker's whole job body.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, job_id: DbId);
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// All workers have shut down and the queue no longer accepts jobs.
    #[error("job queue is closed")]
    Closed,
}

/// Producer half: hand job identifiers to the worker pool.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<DbId>,
}

impl Dispatcher {
    /// Create a dispatcher/queue pair. The returned [`JobQueue`] must be
    /// turned into a worker pool with [`JobQueue::spawn_workers`].
    pub fn channel() -> (Dispatcher, JobQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Dispatcher { tx },
            JobQueue {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Enqueue a job for background execution. Returns immediately; the
    /// actual execution happens on a worker.
    pub fn enqueue(&self, job_id: DbId) -> Result<(), DispatchError> {
        self.tx.send(job_id).map_err(|_| DispatchError::Closed)
    }
}

/// Consumer half: the shared receiver the worker pool pulls from.
pub struct JobQueue {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<DbId>>>,
}

impl JobQueue {
    /// Spawn `count` workers that pull job identifiers until the queue
    /// closes or `cancel` is triggered. A job already picked up runs to
    /// completion; cancellation only stops idle workers from taking more.
    pub fn spawn_workers(
        self,
        count: usize,
        handler: Arc<dyn JobHandler>,
        cancel: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        (0..count)
            .map(|worker_id| {
                let rx = Arc::clone(&self.rx);
                let handler = Arc::clone(&handler);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    tracing::debug!(worker_id, "Worker started");
                    loop {
                        // Hold the receiver lock only while waiting for the
                        // next identifier, never while executing a job.
                        let job_id = {
                            let mut rx = rx.lock().await;
                            tokio::select! {
                                _ = cancel.cancelled() => None,
                                id = rx.recv() => id,
                            }
                        };
                        let Some(job_id) = job_id else { break };

                        tracing::debug!(worker_id, job_id, "Worker picked up job");
                        handler.run(job_id).await;
                    }
                    tracing::debug!(worker_id, "Worker stopped");
                })
            })
            .collect()
    }
}
