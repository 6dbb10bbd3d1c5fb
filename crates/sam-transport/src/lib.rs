//! # sam-transport
//!
//! Realtime push-protocol engine for the controller.
//!
//! - [`frame`]: `<return code><payload>` codec
//! - [`event`]: `frommedi` event envelope parsing, filtering and keying
//! - [`protocol`]: I/O-free connection state machine
//! - [`connection`]: websocket driver with keep-alive timers
//! - [`supervisor`]: restart loop around authenticate → connect → stream

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod event;
pub mod frame;
pub mod protocol;
pub mod supervisor;

pub use connection::{CloseKind, run_connection};
pub use errors::{EventError, PipelineError, ProtocolError, TransportError};
pub use event::ParsedEvent;
pub use frame::Frame;
pub use protocol::{Action, ConnectionState, Protocol, Timer};
pub use supervisor::{ControllerPipeline, Pipeline, PipelineEvent, Session, Supervisor, SupervisorExit};
