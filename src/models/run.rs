//! Run data model: one invocation inside a run group

use crate::types::{elapsed_ns, RunStatus, SequenceNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a run did not complete cleanly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RunError {
    /// The request never produced a response (connect, DNS, reset, ...)
    Transport(String),
    /// A response arrived with a status other than 200
    BadStatus(u16),
    /// The per-request deadline expired
    Timeout(u64),
    /// The shared cancellation token fired
    Cancelled,
    /// The server's upstream passthrough call failed
    Upstream(String),
}

impl RunError {
    /// Status this error maps to
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Timeout(_) => RunStatus::Timeout,
            Self::Cancelled => RunStatus::Cancelled,
            Self::Transport(_) | Self::BadStatus(_) | Self::Upstream(_) => RunStatus::Failed,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {}", msg),
            Self::BadStatus(code) => write!(f, "bad status code: {}", code),
            Self::Timeout(ms) => write!(f, "request timed out after {}ms", ms),
            Self::Cancelled => write!(f, "run cancelled"),
            Self::Upstream(msg) => write!(f, "upstream error: {}", msg),
        }
    }
}

/// A single test invocation
///
/// The client and the server each keep their own `Run` records for the same
/// group. Only `sequence` correlates them; `id` is assigned independently by
/// the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Server-assigned identifier, absent on client descriptors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Owning group
    #[serde(default)]
    pub group_id: String,

    /// Position in the group, 1..=N
    pub sequence: SequenceNumber,

    /// Request body bytes
    #[serde(default, with = "payload_base64")]
    pub payload: Vec<u8>,

    /// When this record was created
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_start: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_end: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_start: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_end: Option<DateTime<Utc>>,

    /// Status returned by the upstream passthrough, 0 when the call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,

    /// Elapsed time of the upstream passthrough
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_latency_ns: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

impl Run {
    /// Create a client-side descriptor that has not been sent yet
    pub fn descriptor(group_id: &str, sequence: SequenceNumber, payload: Vec<u8>) -> Self {
        Self {
            id: None,
            group_id: group_id.to_string(),
            sequence,
            payload,
            created_at: Utc::now(),
            client_start: None,
            client_end: None,
            server_start: None,
            server_end: None,
            upstream_status: None,
            upstream_latency_ns: None,
            error: None,
        }
    }

    /// Create a server-side record for an arriving request
    pub fn received(group_id: &str, sequence: SequenceNumber, payload: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            server_start: Some(now),
            created_at: now,
            ..Self::descriptor(group_id, sequence, payload)
        }
    }

    /// Client-observed duration, zero if the run never completed
    pub fn client_duration_ns(&self) -> u64 {
        match (self.client_start, self.client_end) {
            (Some(start), Some(end)) => elapsed_ns(start, end),
            _ => 0,
        }
    }

    /// Server-observed duration, zero if the record is incomplete
    pub fn server_duration_ns(&self) -> u64 {
        match (self.server_start, self.server_end) {
            (Some(start), Some(end)) => elapsed_ns(start, end),
            _ => 0,
        }
    }

    pub fn status(&self) -> RunStatus {
        match &self.error {
            Some(error) => error.status(),
            None if self.client_end.is_some() || self.server_end.is_some() => RunStatus::Success,
            None => RunStatus::Pending,
        }
    }
}

/// Serde adapter that carries payload bytes as a base64 string
pub mod payload_base64 {
    use base64::prelude::BASE64_STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
