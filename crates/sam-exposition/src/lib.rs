//! # sam-exposition
//!
//! Turns value-store fragments into Prometheus text exposition lines.
//!
//! - [`gauge`]: one declarative gauge → 0..3 lines
//! - [`transform`]: unit conversions and flag/liveness mappings
//! - [`fanout`]: contiguous per-metric blocks across dynamic entities
//! - [`catalog`]: the curated page served on `/metrics`

#![deny(unsafe_code)]

pub mod catalog;
pub mod errors;
pub mod fanout;
pub mod gauge;
pub mod transform;

pub use catalog::render_page;
pub use errors::LookupError;
pub use fanout::FanOut;
pub use gauge::Gauge;
