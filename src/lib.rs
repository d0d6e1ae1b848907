//! Async RPC relay for embedded `SQLite`.
//!
//! The engine may run in-process (drive [`handler::SqliteHandler`] directly)
//! or inside a worker reachable only via asynchronous message passing, in
//! which case the relay supplies the request/response machinery around it:
//!
//! - [`correlator::RpcCorrelator`] gives request/response semantics to a
//!   one-way, unordered channel: unique ids, pending-request bookkeeping,
//!   per-request timeouts, and clean teardown on channel failure.
//! - [`dispatcher::PriorityDispatcher`] turns the worker's inbound stream
//!   into a serialized, priority-ordered execution sequence with per-task
//!   TTL expiry.
//! - [`relay::spawn_worker`] wires both over in-process channels and returns
//!   a typed [`relay::RelayClient`].

pub mod config;
pub mod correlator;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod path;
pub mod prelude;
pub mod protocol;
pub mod relay;
pub mod transport;

pub use error::SqlRelayError;
pub use relay::{RelayClient, RelayPreparedStatement, spawn_worker};
