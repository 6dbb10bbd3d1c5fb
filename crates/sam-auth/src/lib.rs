//! # sam-auth
//!
//! Session authenticator for the controller's web interface.
//!
//! [`Authenticator::login`] posts the user name and a SHA-256 digest of the
//! password and returns the session cookies; [`Authenticator::open_session`]
//! runs the polling handshake that yields the [`sam_core::SessionInfo`] the
//! realtime transport connects with.

#![deny(unsafe_code)]

pub mod authenticator;
pub mod errors;

pub use authenticator::{Authenticator, extract_embedded_json, password_hash};
pub use errors::{AuthError, SessionError};
