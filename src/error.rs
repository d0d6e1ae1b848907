use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::protocol::{WireError, codes};

#[derive(Debug, Error)]
pub enum SqlRelayError {
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("Request timed out")]
    RequestTimeout,

    #[error("Task expired while queued")]
    TaskExpired,

    #[error("Channel failure: {0}")]
    ChannelFailure(String),

    #[error("Relay disposed: {0}")]
    Disposed(String),

    #[error("Remote error {code}: {message}")]
    Remote {
        code: i64,
        message: String,
        data: Option<JsonValue>,
    },
}

impl SqlRelayError {
    /// Map a failure onto the wire error descriptor sent back to callers.
    ///
    /// Engine failures keep their native result code where `rusqlite` exposes
    /// one; everything else without a dedicated code maps to -32603.
    #[must_use]
    pub fn to_wire(&self) -> WireError {
        match self {
            Self::SqliteError(err) => {
                let code = match err {
                    rusqlite::Error::SqliteFailure(inner, _) => i64::from(inner.extended_code),
                    _ => codes::INTERNAL_ERROR,
                };
                WireError::new(code, err.to_string())
            }
            Self::ParameterError(detail) => WireError::invalid_request(detail.clone()),
            Self::RequestTimeout => WireError::new(codes::REQUEST_TIMEOUT, "Request timed out"),
            Self::TaskExpired => WireError::task_expired(),
            Self::ChannelFailure(reason) | Self::Disposed(reason) => {
                WireError::channel_failure(reason.clone())
            }
            Self::Remote {
                code,
                message,
                data,
            } => WireError {
                code: *code,
                message: message.clone(),
                data: data.clone(),
            },
            Self::ConnectionError(_) | Self::ExecutionError(_) => {
                WireError::internal(self.to_string())
            }
        }
    }

    /// Rebuild the caller-facing error kind from a wire descriptor, so the
    /// relay's own codes surface as their distinct variants rather than as
    /// opaque remote failures.
    #[must_use]
    pub fn from_wire(error: WireError) -> Self {
        match error.code {
            codes::REQUEST_TIMEOUT => Self::RequestTimeout,
            codes::TASK_EXPIRED => Self::TaskExpired,
            codes::CHANNEL_FAILURE => Self::ChannelFailure(error.message),
            _ => Self::Remote {
                code: error.code,
                message: error.message,
                data: error.data,
            },
        }
    }
}
