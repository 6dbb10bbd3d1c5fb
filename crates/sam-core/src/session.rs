//! Session handshake types.
//!
//! The authenticator produces a [`CookieJar`] from the login response and a
//! [`SessionInfo`] from the polling handshake. Both are handed to exactly one
//! transport instance per connection attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine handshake answer embedded in the polling response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session identifier, pinned into the realtime connection URL.
    pub sid: String,
    /// Transports the controller allows upgrading to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server-side ping interval in milliseconds.
    #[serde(default)]
    pub ping_interval: u64,
    /// Server-side ping timeout in milliseconds.
    #[serde(default)]
    pub ping_timeout: u64,
}

/// Ordered list of `name=value` cookie entries.
///
/// Attributes such as `Path` or `HttpOnly` are stripped when cookies are
/// taken from `Set-Cookie` headers, so the jar can be replayed verbatim in a
/// `Cookie` request header.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    entries: Vec<String>,
}

impl CookieJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar from raw `Set-Cookie` header values.
    pub fn from_set_cookie<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut jar = Self::new();
        for header in headers {
            jar.push_set_cookie(header);
        }
        jar
    }

    /// Add a cookie from a raw `Set-Cookie` header value.
    pub fn push_set_cookie(&mut self, header: &str) {
        let pair = header.split(';').next().unwrap_or_default().trim();
        if !pair.is_empty() {
            self.entries.push(pair.to_string());
        }
    }

    /// Add a `name=value` entry.
    pub fn push(&mut self, name: &str, value: &str) {
        self.entries.push(format!("{name}={value}"));
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> String {
        self.entries.join("; ")
    }

    /// Look up the value of the first cookie with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            (key == name).then_some(value)
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the jar holds no cookies.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CookieJar {
    // Cookie values are session credentials; only names are printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .entries
            .iter()
            .map(|entry| entry.split_once('=').map_or(entry.as_str(), |(name, _)| name))
            .collect();
        f.debug_struct("CookieJar").field("names", &names).finish()
    }
}
