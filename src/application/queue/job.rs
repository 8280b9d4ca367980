use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::render::RenderError;

/// Identity used to collapse duplicate work, typically the document URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Version of the content being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(i64);

impl RevisionId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Priority class of a job. Lower discriminant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// User-facing work such as an author saving an article.
    Interactive = 0,
    /// Bulk or maintenance re-renders.
    Background = 1,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Interactive => "interactive",
            Tier::Background => "background",
        }
    }
}

/// Render request handed to [`RenderQueue::submit`](super::RenderQueue::submit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub key: DocumentKey,
    pub revision: RevisionId,
    /// Markdown source to render.
    pub payload: String,
    pub tier: Tier,
}

impl Job {
    pub fn new(
        key: impl Into<DocumentKey>,
        revision: RevisionId,
        payload: impl Into<String>,
        tier: Tier,
    ) -> Self {
        Self {
            key: key.into(),
            revision,
            payload: payload.into(),
            tier,
        }
    }

    pub fn interactive(
        key: impl Into<DocumentKey>,
        revision: RevisionId,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(key, revision, payload, Tier::Interactive)
    }

    pub fn background(
        key: impl Into<DocumentKey>,
        revision: RevisionId,
        payload: impl Into<String>,
    ) -> Self {
        Self::new(key, revision, payload, Tier::Background)
    }
}

/// How a submission was admitted into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitReceipt {
    /// No pending job existed for the key; a new one was queued.
    Inserted,
    /// A pending job absorbed the new revision and kept its priority.
    Merged,
    /// A pending job absorbed the new revision and moved to a higher tier.
    Upgraded,
}

impl SubmitReceipt {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitReceipt::Inserted => "inserted",
            SubmitReceipt::Merged => "merged",
            SubmitReceipt::Upgraded => "upgraded",
        }
    }
}

/// Result of one completed job, broadcast to every waiter of its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub key: DocumentKey,
    /// Revision that was actually rendered, which may be newer than the one a
    /// waiter submitted if later edits were merged in.
    pub revision: RevisionId,
    pub result: Result<String, RenderError>,
}

impl RenderOutcome {
    pub fn output(&self) -> Option<&str> {
        self.result.as_deref().ok()
    }

    pub fn error(&self) -> Option<&RenderError> {
        self.result.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Job as stored in the heap, stamped on admission.
#[derive(Debug, Clone)]
pub(crate) struct QueuedJob {
    pub(crate) id: Uuid,
    pub(crate) key: DocumentKey,
    pub(crate) revision: RevisionId,
    pub(crate) payload: String,
    pub(crate) tier: Tier,
    /// Monotonic arrival epoch; FIFO tiebreaker within a tier.
    pub(crate) arrival: u64,
    pub(crate) submitted_at: OffsetDateTime,
}

impl QueuedJob {
    pub(crate) fn admit(job: Job, arrival: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: job.key,
            revision: job.revision,
            payload: job.payload,
            tier: job.tier,
            arrival,
            submitted_at: OffsetDateTime::now_utc(),
        }
    }

    pub(crate) fn priority(&self) -> (Tier, u64) {
        (self.tier, self.arrival)
    }

    /// Fold a duplicate submission into this pending job.
    ///
    /// Arrival is kept so repeated edits cannot starve the document, and the
    /// tier only ever moves towards `Interactive`.
    pub(crate) fn absorb(&mut self, job: Job) -> SubmitReceipt {
        self.revision = job.revision;
        self.payload = job.payload;
        if job.tier < self.tier {
            self.tier = job.tier;
            SubmitReceipt::Upgraded
        } else {
            SubmitReceipt::Merged
        }
    }
}
