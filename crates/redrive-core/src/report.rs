//! Result types handed back by the administrative operations. Plain data;
//! rendering is the caller's concern.

use crate::message::DeadLetterMessage;

/// Outcome of a passive status check for one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueState {
    Ready {
        message_count: u32,
        consumer_count: u32,
    },
    /// The queue does not exist. One missing queue never aborts the batch.
    NotFound,
}

/// Status snapshot for one monitored queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub name: String,
    pub state: QueueState,
}

/// Best-effort rendering of an opaque message body for display.
#[derive(Debug, Clone)]
pub enum BodyPreview {
    Json(serde_json::Value),
    /// The body was not valid JSON; shown as (lossily decoded) raw text.
    Raw(String),
}

impl BodyPreview {
    pub fn from_bytes(body: &[u8]) -> Self {
        match serde_json::from_slice(body) {
            Ok(value) => BodyPreview::Json(value),
            Err(_) => BodyPreview::Raw(String::from_utf8_lossy(body).into_owned()),
        }
    }
}

/// One message read during inspection, annotated with its 1-based position
/// in the batch.
#[derive(Debug, Clone)]
pub struct InspectedMessage {
    pub position: usize,
    pub message: DeadLetterMessage,
    pub preview: BodyPreview,
}

/// Result of inspecting a dead-letter queue.
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub queue: String,
    pub messages: Vec<InspectedMessage>,
    /// Set when a transient channel failure stopped the batch early; carries
    /// the failure text. Everything gathered up to that point is kept.
    pub aborted: Option<String>,
}

/// Result of a retry run.
#[derive(Debug, Clone)]
pub struct RetryReport {
    pub source: String,
    pub target: String,
    /// How many moves were requested.
    pub attempted: usize,
    /// How many messages were actually published and acknowledged.
    pub moved: usize,
    /// Source depth after the run, from the depth observed at the start.
    pub remaining_in_source: u32,
    /// Set when a transient channel failure stopped the batch early.
    pub aborted: Option<String>,
}

impl RetryReport {
    /// True when the source ran dry before `attempted` messages were moved
    /// (partial completion, not an error).
    pub fn ran_dry(&self) -> bool {
        self.moved < self.attempted && self.aborted.is_none()
    }
}

/// Result of a purge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeOutcome {
    /// False means the confirmation gate rejected the token: a cancellation
    /// with no side effect, not a failure.
    pub purged: bool,
    /// Messages in the queue: the number discarded when purged, the depth at
    /// the time of the check when cancelled.
    pub previous_count: u32,
}
