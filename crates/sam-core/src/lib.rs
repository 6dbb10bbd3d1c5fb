//! # sam-core
//!
//! Foundation types shared by the Sigma Air Manager exporter crates:
//!
//! - [`SessionInfo`]: the engine handshake answer produced by the authenticator
//! - [`CookieJar`]: the cookies accumulated across login and session handshake
//! - [`ControllerEndpoint`]: URL construction for every controller request
//! - [`clock`]: wall-clock helpers in epoch milliseconds

#![deny(unsafe_code)]

pub mod clock;
pub mod endpoint;
pub mod session;

pub use endpoint::ControllerEndpoint;
pub use session::{CookieJar, SessionInfo};
