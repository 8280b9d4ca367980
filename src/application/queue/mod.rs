//! Render job scheduler.
//!
//! Decouples "a document was edited" from "its HTML was recomputed". Jobs are
//! tagged [`Tier::Interactive`] or [`Tier::Background`]; interactive work is
//! always dequeued first, duplicate pending work for one document collapses
//! into a single job, and [`RenderQueue::shutdown`] drains accepted jobs
//! before the workers exit.
//!
//! The queue is in-memory only and rebuilt on process start. Failed renders
//! are reported once through the outcome and never retried.

mod error;
mod guard;
mod heap;
mod job;
mod lock;
mod scheduler;
mod worker;

pub use error::QueueError;
pub use job::{DocumentKey, Job, RenderOutcome, RevisionId, SubmitReceipt, Tier};
pub use scheduler::{QueueState, RenderQueue, Waiter};

pub const METRIC_SUBMITTED: &str = "soffio_render_queue_submitted_total";
pub const METRIC_REJECTED: &str = "soffio_render_queue_rejected_total";
pub const METRIC_PENDING: &str = "soffio_render_queue_pending";
pub const METRIC_COMPLETED: &str = "soffio_render_queue_completed_total";
pub const METRIC_RENDER_MS: &str = "soffio_render_queue_render_ms";
pub const METRIC_WAITER_DROPPED: &str = "soffio_render_queue_waiter_dropped_total";
