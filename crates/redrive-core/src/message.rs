use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::Delivery;

/// Wire names of the headers this subsystem reasons about. The pipeline's
/// workers stamp these on every failed message; the manual-retry pair is
/// written only by this tool.
pub mod header {
    pub const RETRY_COUNT: &str = "x-retry-count";
    pub const RETRY_REASON: &str = "x-retry-reason";
    pub const DLQ_REASON: &str = "x-dlq-reason";
    pub const MANUAL_RETRY: &str = "x-manual-retry";
    pub const MANUAL_RETRY_TIME: &str = "x-manual-retry-timestamp";
}

/// A single message-header value.
///
/// Broker header tables are more loosely typed than the fields this
/// subsystem cares about; anything it does not recognize is carried through
/// one of these variants untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Bool(b) => write!(f, "{b}"),
            HeaderValue::Int(n) => write!(f, "{n}"),
            HeaderValue::Str(s) => write!(f, "{s}"),
            HeaderValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// An ordered header table as carried on the wire.
pub type HeaderTable = BTreeMap<String, HeaderValue>;

/// Typed view of a dead-lettered message's headers.
///
/// The known retry-tracking fields get named, typed access; everything else
/// rides along in `extra` and is preserved verbatim on republish. A known
/// header with an unexpected wire type is treated as unrecognized rather
/// than dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHeaders {
    /// Processing attempts so far. Missing on the wire means zero.
    pub retry_count: u32,
    /// Last transient-failure description.
    pub retry_reason: Option<String>,
    /// Terminal-failure description that caused dead-letter routing.
    pub dlq_reason: Option<String>,
    /// True when this tool re-published the message.
    pub manual_retry: bool,
    /// When the manual retry occurred.
    pub manual_retry_time: Option<DateTime<Utc>>,
    /// Headers this subsystem does not reason about, preserved unchanged.
    pub extra: HeaderTable,
}

impl MessageHeaders {
    /// Parse a raw header table, pulling out the known retry-tracking fields.
    pub fn from_table(mut table: HeaderTable) -> Self {
        let retry_count = match table.remove(header::RETRY_COUNT) {
            Some(HeaderValue::Int(n)) => u32::try_from(n).unwrap_or(0),
            Some(other) => {
                table.insert(header::RETRY_COUNT.to_string(), other);
                0
            }
            None => 0,
        };

        let retry_reason = take_string(&mut table, header::RETRY_REASON);
        let dlq_reason = take_string(&mut table, header::DLQ_REASON);

        let manual_retry = match table.remove(header::MANUAL_RETRY) {
            Some(HeaderValue::Bool(b)) => b,
            Some(other) => {
                table.insert(header::MANUAL_RETRY.to_string(), other);
                false
            }
            None => false,
        };

        let manual_retry_time = match table.remove(header::MANUAL_RETRY_TIME) {
            Some(HeaderValue::Str(s)) => match DateTime::parse_from_rfc3339(&s) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(_) => {
                    table.insert(header::MANUAL_RETRY_TIME.to_string(), HeaderValue::Str(s));
                    None
                }
            },
            Some(other) => {
                table.insert(header::MANUAL_RETRY_TIME.to_string(), other);
                None
            }
            None => None,
        };

        Self {
            retry_count,
            retry_reason,
            dlq_reason,
            manual_retry,
            manual_retry_time,
            extra: table,
        }
    }

    /// Serialize back to a raw header table. `retry_count` is always
    /// written; optional fields are written only when present.
    pub fn to_table(&self) -> HeaderTable {
        let mut table = self.extra.clone();
        table.insert(
            header::RETRY_COUNT.to_string(),
            HeaderValue::Int(i64::from(self.retry_count)),
        );
        if let Some(reason) = &self.retry_reason {
            table.insert(
                header::RETRY_REASON.to_string(),
                HeaderValue::Str(reason.clone()),
            );
        }
        if let Some(reason) = &self.dlq_reason {
            table.insert(
                header::DLQ_REASON.to_string(),
                HeaderValue::Str(reason.clone()),
            );
        }
        if self.manual_retry {
            table.insert(header::MANUAL_RETRY.to_string(), HeaderValue::Bool(true));
        }
        if let Some(ts) = self.manual_retry_time {
            table.insert(
                header::MANUAL_RETRY_TIME.to_string(),
                HeaderValue::Str(ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }
        table
    }

    /// The header patch applied when a message is manually retried:
    /// the attempt counter resets, the manual-retry markers are stamped,
    /// and every other header is preserved unchanged.
    #[must_use]
    pub fn reset_for_retry(&self, now: DateTime<Utc>) -> Self {
        Self {
            retry_count: 0,
            retry_reason: self.retry_reason.clone(),
            dlq_reason: self.dlq_reason.clone(),
            manual_retry: true,
            manual_retry_time: Some(now),
            extra: self.extra.clone(),
        }
    }
}

fn take_string(table: &mut HeaderTable, name: &str) -> Option<String> {
    match table.remove(name) {
        Some(HeaderValue::Str(s)) => Some(s),
        Some(other) => {
            table.insert(name.to_string(), other);
            None
        }
        None => None,
    }
}

/// One message as held in a dead-letter queue.
///
/// Immutable as data: a manual retry publishes a *new* message with patched
/// headers while this one is terminally acknowledged. The body is opaque:
/// it is never parsed or mutated except for display.
#[derive(Debug, Clone)]
pub struct DeadLetterMessage {
    /// Broker-assigned handle for this delivery. Only valid against the
    /// channel that produced it, and only until acked or rejected.
    pub delivery_tag: u64,
    /// Whether the broker has delivered this message before.
    pub redelivered: bool,
    pub content_type: Option<String>,
    pub headers: MessageHeaders,
    pub body: Vec<u8>,
}

impl From<Delivery> for DeadLetterMessage {
    fn from(delivery: Delivery) -> Self {
        Self {
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            content_type: delivery.content_type,
            headers: MessageHeaders::from_table(delivery.headers),
            body: delivery.body,
        }
    }
}
