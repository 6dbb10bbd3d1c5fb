//! Controller URL construction.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left untouched in query values (RFC 3986 unreserved set).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Login form target.
pub const LOGIN_PATH: &str = "/HMI/login.html";
/// Location the controller redirects to after a successful login.
pub const LOGIN_SUCCESS_LOCATION: &str = "/HMI";
/// Engine endpoint shared by the polling handshake and the websocket upgrade.
pub const ENGINE_PATH: &str = "/socket.io/";

/// Address of the single controller this exporter talks to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerEndpoint {
    host: String,
    port: u16,
}

impl ControllerEndpoint {
    /// Create an endpoint for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Controller host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Controller HTTP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://host:port` without a trailing slash.
    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// URL of the login form.
    pub fn login_url(&self) -> String {
        format!("{}{LOGIN_PATH}", self.http_base())
    }

    /// URL of the long-polling session handshake.
    pub fn polling_url(&self) -> String {
        format!("{}{ENGINE_PATH}?transport=polling", self.http_base())
    }

    /// URL of the realtime connection for an established session.
    pub fn websocket_url(&self, sid: &str) -> String {
        format!(
            "ws://{}:{}{ENGINE_PATH}?EIO=3&transport=websocket&sid={}",
            self.host,
            self.port,
            utf8_percent_encode(sid, QUERY_VALUE)
        )
    }
}
