use std::{sync::Arc, time::Instant};

use metrics::{counter, gauge, histogram};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{
    METRIC_COMPLETED, METRIC_PENDING, METRIC_RENDER_MS, METRIC_WAITER_DROPPED,
    guard::render_isolated,
    job::{QueuedJob, RenderOutcome},
    scheduler::{Shared, Waiter},
};

/// Worker body: handle one job per doorbell ring until shutdown is signalled,
/// then drain everything still queued and exit.
///
/// A dropped shutdown sender counts as a shutdown signal.
pub(crate) async fn run_worker(
    worker: usize,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(
        target = "application::queue::worker",
        worker, "Render worker started"
    );

    loop {
        tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => break,
            () = shared.doorbell.notified() => {
                process_one_job(&shared, worker).await;
            }
        }
    }

    let mut drained = 0_usize;
    while process_one_job(&shared, worker).await {
        drained += 1;
    }

    debug!(
        target = "application::queue::worker",
        worker, drained, "Render worker exiting"
    );
    shared.worker_exited();
}

/// Resolves once shutdown is signalled or the queue handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

/// Dequeue and render the highest-priority job. Returns `false` when the heap
/// was empty.
pub(crate) async fn process_one_job(shared: &Shared, worker: usize) -> bool {
    let (job, waiters) = {
        let mut inner = shared.lock("process_one_job");
        let Some(job) = inner.heap.pop() else {
            return false;
        };
        let waiters = inner.waiters.remove(&job.key).unwrap_or_default();
        let remaining = inner.heap.len();
        gauge!(METRIC_PENDING).set(remaining as f64);

        // Rings may have coalesced while this job was queued; whoever takes a
        // job re-rings so the backlog never waits on a signal already spent.
        if remaining > 0 {
            shared.doorbell.notify_one();
        }
        (job, waiters)
    };

    let QueuedJob {
        id,
        key,
        revision,
        payload,
        tier,
        submitted_at,
        ..
    } = job;
    let queued_ms = (OffsetDateTime::now_utc() - submitted_at).whole_milliseconds();

    debug!(
        target = "application::queue::worker",
        worker,
        job_id = %id,
        key = %key,
        revision = %revision,
        tier = tier.as_str(),
        waiters = waiters.len(),
        queued_ms = queued_ms as i64,
        "Render job dequeued"
    );

    let started_at = Instant::now();
    let result = render_isolated(shared.renderer(), payload).await;
    let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_RENDER_MS).record(elapsed_ms);

    let status = match &result {
        Ok(_) => "ok",
        Err(err) if err.is_panic() => "panic",
        Err(_) => "error",
    };
    counter!(METRIC_COMPLETED, "status" => status).increment(1);

    if let Err(err) = &result {
        warn!(
            target = "application::queue::worker",
            worker,
            job_id = %id,
            key = %key,
            revision = %revision,
            error = %err,
            "Render job failed"
        );
    } else {
        debug!(
            target = "application::queue::worker",
            worker,
            job_id = %id,
            key = %key,
            elapsed_ms,
            "Render job completed"
        );
    }

    deliver(
        RenderOutcome {
            key,
            revision,
            result,
        },
        waiters,
    );
    true
}

/// Hand the outcome to every waiter without blocking. Waiters whose receiver
/// is already gone gave up on the result and are skipped.
fn deliver(outcome: RenderOutcome, waiters: Vec<Waiter>) {
    let mut dropped = 0_u64;
    for waiter in waiters {
        if waiter.send(outcome.clone()).is_err() {
            dropped += 1;
        }
    }

    if dropped > 0 {
        counter!(METRIC_WAITER_DROPPED).increment(dropped);
        debug!(
            target = "application::queue::worker",
            key = %outcome.key,
            dropped,
            "Discarded outcome for abandoned waiters"
        );
    }
}
