//! Auth error types.

/// Errors from the login exchange.
///
/// All variants are hard failures for the current attempt: either the
/// credentials or the controller state are wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The login answer was not a redirect.
    #[error("received unexpected status code {status} from login")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The login redirected somewhere other than the HMI start page.
    #[error("invalid redirect to {location:?}, expected {expected:?}; check credentials")]
    UnexpectedRedirect {
        /// `Location` header value (empty if missing).
        location: String,
        /// Location a successful login redirects to.
        expected: &'static str,
    },
}

/// Errors from the polling session handshake.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The handshake answer was not 200.
    #[error("received unexpected status code {status} from session handshake")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// The body contained no `{...}` object.
    #[error("session handshake body contains no JSON object")]
    MissingJson,

    /// The embedded object was not a valid handshake.
    #[error("malformed session handshake: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
