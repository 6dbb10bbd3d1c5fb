//! HTTP login and polling session handshake.

use std::fmt;

use reqwest::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use sam_core::endpoint::LOGIN_SUCCESS_LOCATION;
use sam_core::{ControllerEndpoint, CookieJar, SessionInfo};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::errors::{AuthError, SessionError};

/// Cookie name under which the session id is replayed.
pub const SESSION_COOKIE: &str = "io";

/// Lowercase hex SHA-256 digest of the plaintext password.
pub fn password_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Extract the `{...}` object embedded in a polling response body.
///
/// The body carries engine framing around the object (length prefixes,
/// packet types, trailing packets), so only the span from the first `{`
/// to the last `}` is JSON.
pub fn extract_embedded_json(body: &str) -> Option<&str> {
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (end > start).then(|| &body[start..=end])
}

/// Performs the login and session handshake for one controller user.
#[derive(Clone)]
pub struct Authenticator {
    client: reqwest::Client,
    endpoint: ControllerEndpoint,
    user: String,
    password: String,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create an authenticator. Redirects are never followed, since the
    /// login result is read from the redirect itself.
    pub fn new(
        endpoint: ControllerEndpoint,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder().redirect(Policy::none()).build()?;
        Ok(Self {
            client,
            endpoint,
            user: user.into(),
            password: password.into(),
        })
    }

    /// Controller this authenticator talks to.
    pub fn endpoint(&self) -> &ControllerEndpoint {
        &self.endpoint
    }

    /// Log in and return the session cookies.
    ///
    /// Only a 302 to the HMI start page counts as success.
    #[tracing::instrument(skip_all, fields(user = %self.user))]
    pub async fn login(&self) -> Result<CookieJar, AuthError> {
        let hash = password_hash(&self.password);
        let form = [
            ("inputUser", self.user.as_str()),
            ("inputPassword", ""),
            ("inputPassHash", hash.as_str()),
        ];

        let resp = self
            .client
            .post(self.endpoint.login_url())
            .form(&form)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 302 {
            return Err(AuthError::UnexpectedStatus { status });
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if location != LOGIN_SUCCESS_LOCATION {
            return Err(AuthError::UnexpectedRedirect {
                location: location.to_string(),
                expected: LOGIN_SUCCESS_LOCATION,
            });
        }

        let jar = CookieJar::from_set_cookie(
            resp.headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        info!(cookies = jar.len(), "logged into controller");
        Ok(jar)
    }

    /// Run the polling handshake and append the session cookie to `jar`.
    #[tracing::instrument(skip_all)]
    pub async fn open_session(&self, jar: &mut CookieJar) -> Result<SessionInfo, SessionError> {
        let mut request = self.client.get(self.endpoint.polling_url());
        if !jar.is_empty() {
            request = request.header(COOKIE, jar.header_value());
        }
        let resp = request.send().await?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(SessionError::UnexpectedStatus { status });
        }

        let body = resp.text().await?;
        debug!(len = body.len(), "received session handshake");
        let json = extract_embedded_json(&body).ok_or(SessionError::MissingJson)?;
        let info: SessionInfo = serde_json::from_str(json)?;

        jar.push(SESSION_COOKIE, &info.sid);
        info!(sid = %info.sid, user = %self.user, "received controller session");
        Ok(info)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
