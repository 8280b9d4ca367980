use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Submission after shutdown began. Nothing was enqueued.
    #[error("render queue is closed")]
    Closed,
    #[error("render queue requires at least one worker")]
    NoWorkers,
    #[error("render queue must be started inside a tokio runtime")]
    NoRuntime,
    /// The job's waiter was released without an outcome, which only happens
    /// when the runtime tears the workers down.
    #[error("render queue dropped the job before it completed")]
    Abandoned,
    /// Workers were still draining when the grace period ran out; they keep
    /// running in the background.
    #[error("render workers did not drain within {grace:?}")]
    ShutdownTimedOut { grace: Duration },
}
