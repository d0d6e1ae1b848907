//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::config::{RelayOptions, RelayOptionsBuilder};
pub use crate::correlator::{ReceiveOutcome, RpcCorrelator, SendOptions};
pub use crate::dispatcher::PriorityDispatcher;
pub use crate::error::SqlRelayError;
pub use crate::handler::{OperationHandler, SqliteHandler};
pub use crate::path::{StorageLocation, normalize_storage_path};
pub use crate::protocol::{
    Method, Priority, RequestEnvelope, RequestId, ResponseEnvelope, WireError,
};
pub use crate::relay::{RelayClient, RelayPreparedStatement, spawn_worker};
