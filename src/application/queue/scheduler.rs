use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::join_all;
use metrics::{counter, gauge};
use tokio::{
    runtime::Handle,
    sync::{Notify, oneshot, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    application::render::Renderer,
    config::QueueSettings,
};

use super::{
    METRIC_PENDING, METRIC_REJECTED, METRIC_SUBMITTED,
    error::QueueError,
    heap::JobHeap,
    job::{DocumentKey, Job, QueuedJob, RenderOutcome, SubmitReceipt},
    lock::mutex_lock,
    worker::run_worker,
};

const SOURCE: &str = "application::queue::scheduler";

/// One-shot channel that receives a job's outcome. Delivery never blocks; a
/// waiter whose receiver is gone is skipped.
pub type Waiter = oneshot::Sender<RenderOutcome>;

/// Lifecycle of a [`RenderQueue`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Open,
    /// Intake stopped; the shutdown signal is being raised.
    Closing,
    /// Workers are finishing jobs accepted before shutdown.
    Draining,
    /// Every worker has exited.
    Closed,
}

impl QueueState {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueState::Open => "open",
            QueueState::Closing => "closing",
            QueueState::Draining => "draining",
            QueueState::Closed => "closed",
        }
    }
}

pub(crate) struct QueueInner {
    pub(crate) heap: JobHeap,
    pub(crate) waiters: HashMap<DocumentKey, Vec<Waiter>>,
    pub(crate) lifecycle: QueueState,
}

/// State shared between the queue handle and its workers.
pub(crate) struct Shared {
    inner: Mutex<QueueInner>,
    /// Holds at most one permit, so concurrent rings coalesce.
    pub(crate) doorbell: Notify,
    renderer: Arc<dyn Renderer>,
    arrivals: AtomicU64,
    live_workers: AtomicUsize,
}

impl Shared {
    fn new(renderer: Arc<dyn Renderer>, workers: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: JobHeap::new(),
                waiters: HashMap::new(),
                lifecycle: QueueState::Open,
            }),
            doorbell: Notify::new(),
            renderer,
            arrivals: AtomicU64::new(0),
            live_workers: AtomicUsize::new(workers),
        }
    }

    pub(crate) fn lock(&self, op: &'static str) -> MutexGuard<'_, QueueInner> {
        mutex_lock(&self.inner, SOURCE, op)
    }

    pub(crate) fn renderer(&self) -> Arc<dyn Renderer> {
        Arc::clone(&self.renderer)
    }

    fn next_arrival(&self) -> u64 {
        self.arrivals.fetch_add(1, Ordering::SeqCst)
    }

    fn set_lifecycle(&self, state: QueueState) {
        self.lock("set_lifecycle").lifecycle = state;
    }

    pub(crate) fn worker_exited(&self) {
        if self.live_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.set_lifecycle(QueueState::Closed);
        }
    }
}

/// Priority render queue with per-document deduplication.
///
/// Interactive jobs are always extracted before background ones; within a
/// tier, jobs leave in submission order. Dropping the queue without calling
/// [`shutdown`](Self::shutdown) also lets the workers drain and exit, but
/// nothing waits for them.
pub struct RenderQueue {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl RenderQueue {
    /// Start `worker_count` workers on the current tokio runtime.
    pub fn new(worker_count: usize, renderer: Arc<dyn Renderer>) -> Result<Self, QueueError> {
        if worker_count == 0 {
            return Err(QueueError::NoWorkers);
        }
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        let shared = Arc::new(Shared::new(renderer, worker_count));
        let (shutdown, _) = watch::channel(false);

        let workers = (0..worker_count)
            .map(|worker| {
                let span = info_span!("render_worker", worker);
                runtime.spawn(
                    run_worker(worker, Arc::clone(&shared), shutdown.subscribe()).instrument(span),
                )
            })
            .collect();

        info!(
            target = "application::queue::scheduler",
            workers = worker_count,
            "Render queue started"
        );

        Ok(Self {
            shared,
            shutdown,
            workers: Mutex::new(workers),
            worker_count,
        })
    }

    pub fn from_settings(
        settings: &QueueSettings,
        renderer: Arc<dyn Renderer>,
    ) -> Result<Self, QueueError> {
        Self::new(settings.workers.get(), renderer)
    }

    /// Enqueue `job`, merging it into a pending job for the same document if
    /// one exists.
    ///
    /// A merge replaces the pending revision and payload but keeps its place
    /// in line; a higher-priority tier upgrades it, a lower one never
    /// demotes it. `waiter`, if given, receives the outcome of whichever job
    /// ends up rendering this document next.
    pub fn submit(&self, job: Job, waiter: Option<Waiter>) -> Result<SubmitReceipt, QueueError> {
        let key = job.key.clone();
        let tier = job.tier;
        let revision = job.revision;

        let (receipt, pending) = {
            let mut guard = self.shared.lock("submit");
            let inner = &mut *guard;

            if inner.lifecycle != QueueState::Open {
                counter!(METRIC_REJECTED).increment(1);
                debug!(
                    target = "application::queue::scheduler",
                    key = %key,
                    state = inner.lifecycle.as_str(),
                    "Rejected submission to closed render queue"
                );
                return Err(QueueError::Closed);
            }

            let receipt = match inner.heap.entry_mut(&key) {
                Some((index, pending)) => {
                    let receipt = pending.absorb(job);
                    if receipt == SubmitReceipt::Upgraded {
                        inner.heap.fix(index);
                    }
                    receipt
                }
                None => {
                    let queued = QueuedJob::admit(job, self.shared.next_arrival());
                    match inner.heap.push(queued) {
                        Ok(_) => SubmitReceipt::Inserted,
                        Err(_) => unreachable!("dedup index reported `{key}` absent under the same lock"),
                    }
                }
            };

            if let Some(waiter) = waiter {
                inner.waiters.entry(key.clone()).or_default().push(waiter);
            }

            (receipt, inner.heap.len())
        };

        counter!(METRIC_SUBMITTED, "outcome" => receipt.as_str()).increment(1);
        gauge!(METRIC_PENDING).set(pending as f64);
        debug!(
            target = "application::queue::scheduler",
            key = %key,
            revision = %revision,
            tier = tier.as_str(),
            receipt = receipt.as_str(),
            pending,
            "Render job submitted"
        );

        self.shared.doorbell.notify_one();
        Ok(receipt)
    }

    /// Submit `job` and wait for the outcome of the render that covers it.
    pub async fn render(&self, job: Job) -> Result<RenderOutcome, QueueError> {
        let (waiter, receiver) = oneshot::channel();
        self.submit(job, Some(waiter))?;
        receiver.await.map_err(|_| QueueError::Abandoned)
    }

    /// Stop intake and wait up to `grace` for workers to drain accepted jobs.
    ///
    /// Only the first call does anything; later calls return `Ok(())` at once.
    /// On timeout the workers are left running and finish in the background.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), QueueError> {
        {
            let mut inner = self.shared.lock("shutdown");
            if inner.lifecycle != QueueState::Open {
                return Ok(());
            }
            inner.lifecycle = QueueState::Closing;
        }

        self.shutdown.send_replace(true);
        let handles = std::mem::take(&mut *mutex_lock(&self.workers, SOURCE, "shutdown"));
        {
            let mut inner = self.shared.lock("shutdown");
            if inner.lifecycle == QueueState::Closing {
                inner.lifecycle = QueueState::Draining;
            }
        }

        info!(
            target = "application::queue::scheduler",
            workers = handles.len(),
            pending = self.pending_len(),
            grace_ms = grace.as_millis() as u64,
            "Render queue shutting down"
        );

        match timeout(grace, join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(err) = result {
                        warn!(
                            target = "application::queue::scheduler",
                            error = %err,
                            "Render worker terminated abnormally"
                        );
                    }
                }
                self.shared.set_lifecycle(QueueState::Closed);
                info!(
                    target = "application::queue::scheduler",
                    "Render queue drained"
                );
                Ok(())
            }
            Err(_) => {
                warn!(
                    target = "application::queue::scheduler",
                    grace_ms = grace.as_millis() as u64,
                    pending = self.pending_len(),
                    "Render queue shutdown timed out; workers continue draining"
                );
                Err(QueueError::ShutdownTimedOut { grace })
            }
        }
    }

    pub fn state(&self) -> QueueState {
        self.shared.lock("state").lifecycle
    }

    /// Number of jobs waiting for a worker. Jobs currently rendering are not
    /// counted.
    pub fn pending_len(&self) -> usize {
        self.shared.lock("pending_len").heap.len()
    }

    pub fn is_pending(&self, key: &DocumentKey) -> bool {
        self.shared.lock("is_pending").heap.contains(key)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}
