//! Transport error types.

use sam_auth::{AuthError, SessionError};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue;

/// A frame that could not be decoded. The frame is dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame does not start with decimal digits.
    #[error("frame has no leading return code: {0:?}")]
    MissingReturnCode(String),

    /// The leading digits do not fit a return code.
    #[error("return code out of range: {0}")]
    InvalidReturnCode(String),

    /// The payload looked like JSON but did not parse.
    #[error("invalid JSON payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// A `frommedi` event with an unexpected envelope. The event is dropped.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// `data.header.from` is missing or not a string.
    #[error("event envelope has no source metric")]
    MissingSource,

    /// `data.body` is missing or not a string.
    #[error("event {metric} has no body")]
    MissingBody {
        /// Source metric name.
        metric: String,
    },

    /// `data.body` is not valid JSON.
    #[error("event {metric} has an invalid body: {source}")]
    InvalidBody {
        /// Source metric name.
        metric: String,
        /// Parse failure.
        source: serde_json::Error,
    },
}

/// Failures setting up the realtime connection.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection URL could not be turned into a request.
    #[error("invalid connection request: {0}")]
    Request(#[source] tungstenite::Error),

    /// The cookie jar does not fit in a header.
    #[error("invalid cookie header: {0}")]
    InvalidCookie(#[from] InvalidHeaderValue),

    /// Connecting or upgrading failed.
    #[error("connect failed: {0}")]
    Connect(#[source] tungstenite::Error),
}

/// One pipeline attempt (authenticate, handshake, stream) failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Login failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Session handshake failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The realtime connection could not be established.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PipelineError {
    /// Whether this failure stops supervision when it ends the first attempt.
    ///
    /// Later attempts always restart, whatever the error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Session(_))
    }

    /// Short label for logs and metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Session(_) => "session",
            Self::Transport(_) => "transport",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
