use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::codes;
use super::method::{Method, Priority};

/// Wire protocol version; both directions carry it verbatim.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Opaque correlation token, unique per outstanding request per correlator
/// instance.
///
/// Ids compare only by equality; they are never ordered by magnitude, so the
/// type deliberately implements `Hash`/`Eq` but not `Ord`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an externally supplied token, e.g. when bridging envelopes from
    /// another transport.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub(crate) fn from_parts(prefix: u64, seq: u32) -> Self {
        Self(format!("{prefix:016x}-{seq:08x}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error descriptor carried by a failed [`ResponseEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl WireError {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(codes::INVALID_REQUEST, detail)
    }

    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }

    #[must_use]
    pub fn task_expired() -> Self {
        Self::new(codes::TASK_EXPIRED, "Task expired while queued")
    }

    #[must_use]
    pub fn channel_failure(reason: impl Into<String>) -> Self {
        Self::new(codes::CHANNEL_FAILURE, reason)
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Request envelope: the unit of caller-to-worker communication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub version: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Vec<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl RequestEnvelope {
    #[must_use]
    pub fn new(id: RequestId, method: Method, params: Vec<JsonValue>) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            id,
            method: method.as_str().to_string(),
            params,
            priority: None,
            ttl: None,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(i64::from(priority.to_wire()));
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Tier selector normalized from the wire value; absent or out-of-range
    /// values map to [`Priority::Normal`].
    #[must_use]
    pub fn tier(&self) -> Priority {
        Priority::from_wire(self.priority)
    }

    /// Queue residency bound, if the caller set one.
    #[must_use]
    pub fn ttl_duration(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_millis)
    }
}

/// Response envelope: at most one per request id.
///
/// Exactly one of `result`/`error` is present; an envelope with a null `id`
/// is a notification and is never matched to a pending request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub version: String,
    /// Serialized as `null` for notifications; an omitted field also counts
    /// as absent on the way in.
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn success(id: RequestId, result: JsonValue) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(id: Option<RequestId>, error: WireError) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}
