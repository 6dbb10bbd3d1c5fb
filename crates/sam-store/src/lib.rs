//! # sam-store
//!
//! Authoritative in-memory snapshot of the latest value per controller
//! metric, plus the path interpreter used to address fragments of it.
//!
//! The realtime transport is the only writer; renderers and the JSON
//! snapshot endpoint read through cloned [`ValueStore`] handles.

#![deny(unsafe_code)]

pub mod path;
pub mod store;

pub use path::{PathToken, resolve};
pub use store::{LIVENESS_KEY, ValueStore};
