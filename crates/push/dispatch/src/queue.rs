//! Deferred delivery: job queue and workers.

use std::sync::Arc;

use push_core::JobDescriptor;
use push_storage::AllStorage;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::{DispatchError, PushService};

/// Accepts jobs for later execution.
#[trait_variant::make(Send)]
pub trait JobQueue: Send + Sync {
    /// Hand a job to the queue. Delivery to a worker is at-least-once.
    async fn enqueue(&self, job: JobDescriptor) -> Result<(), DispatchError>;
}

/// In-process queue over a bounded channel of encoded jobs.
#[derive(Clone)]
pub struct ChannelQueue {
    tx: mpsc::Sender<Vec<u8>>,
}

/// Receiving end of a [`ChannelQueue`], shared by workers.
#[derive(Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Vec<u8>>>>,
}

impl ChannelQueue {
    /// Create a queue holding at most `capacity` pending jobs.
    pub fn new(capacity: usize) -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self { tx },
            JobReceiver {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }
}

impl JobQueue for ChannelQueue {
    async fn enqueue(&self, job: JobDescriptor) -> Result<(), DispatchError> {
        let bytes = job
            .encode()
            .map_err(|e| DispatchError::queue(format!("{e:#}")))?;

        self.tx
            .send(bytes)
            .await
            .map_err(|_| DispatchError::queue("queue is closed"))?;

        tracing::debug!(attempt_id = %job.attempt_id, "job enqueued");
        Ok(())
    }
}

impl JobReceiver {
    /// Take the next job. `None` once every queue handle is gone and the
    /// channel is drained.
    pub async fn next(&self) -> Option<Vec<u8>> {
        self.rx.lock().await.recv().await
    }

    /// Take the next job if one is waiting.
    pub async fn try_next(&self) -> Option<Vec<u8>> {
        self.rx.lock().await.try_recv().ok()
    }
}

/// Run one worker until the queue closes or `shutdown` changes.
///
/// On shutdown the worker keeps taking jobs that are already waiting and
/// stops once the queue is empty.
pub async fn run_worker<S, Q>(
    id: usize,
    service: Arc<PushService<S, Q>>,
    jobs: JobReceiver,
    mut shutdown: watch::Receiver<bool>,
) where
    S: AllStorage,
    Q: JobQueue,
{
    tracing::info!(worker = id, "worker started");

    let mut draining = *shutdown.borrow();
    loop {
        let next = if draining {
            jobs.try_next().await
        } else {
            tokio::select! {
                bytes = jobs.next() => bytes,
                // A dropped sender counts as shutdown too.
                _ = shutdown.changed() => {
                    tracing::info!(worker = id, "draining queue");
                    draining = true;
                    continue;
                }
            }
        };

        let Some(bytes) = next else {
            break;
        };

        let job = match JobDescriptor::decode(&bytes) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(worker = id, error = %e, "dropping undecodable job");
                continue;
            }
        };

        let attempt_id = job.attempt_id.clone();
        match service.process(job).await {
            Ok(attempt) => tracing::info!(
                worker = id,
                attempt_id = %attempt_id,
                status = %attempt.status,
                failed = attempt.failures.len(),
                "job processed"
            ),
            Err(e) => tracing::warn!(
                worker = id,
                attempt_id = %attempt_id,
                error = %e,
                retryable = e.is_retryable(),
                "job failed"
            ),
        }
    }

    tracing::info!(worker = id, "worker stopped");
}

/// Spawn `count` workers draining `jobs`.
pub fn spawn_workers<S, Q>(
    count: usize,
    service: Arc<PushService<S, Q>>,
    jobs: JobReceiver,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>>
where
    S: AllStorage + 'static,
    Q: JobQueue + 'static,
{
    (0..count.max(1))
        .map(|id| {
            tokio::spawn(run_worker(
                id,
                service.clone(),
                jobs.clone(),
                shutdown.clone(),
            ))
        })
        .collect()
}
