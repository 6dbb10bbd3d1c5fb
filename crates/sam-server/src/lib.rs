//! # sam-server
//!
//! Read-only HTTP surface over the value store:
//!
//! - `GET /metrics`: curated controller page followed by the exporter's own counters
//! - `GET /currentValues`: the raw store as JSON
//! - `GET /health`: uptime and ingestion freshness

#![deny(unsafe_code)]

pub mod health;
pub mod server;

pub use health::{HealthResponse, health_check};
pub use server::{AppState, build_router, serve};
