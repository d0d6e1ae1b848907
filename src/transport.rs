//! Envelope delivery seam between the correlator/dispatcher cores and
//! whatever carries their messages.
//!
//! Both cores are written purely in terms of "deliver an envelope"; the
//! in-process implementation rides a tokio channel, and a port over pipes or
//! processes only needs another [`EnvelopeSink`] implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SqlRelayError;

/// One-way, asynchronous envelope delivery.
///
/// Delivery is at-most-once and unordered from the receiver's point of view;
/// correlation happens entirely at the protocol layer.
#[async_trait]
pub trait EnvelopeSink<T: Send + 'static>: Send + Sync {
    /// Hand an envelope to the transport.
    ///
    /// # Errors
    /// Returns [`SqlRelayError::ChannelFailure`] if the receiving side is
    /// gone; the message is lost in that case, never partially delivered.
    async fn deliver(&self, envelope: T) -> Result<(), SqlRelayError>;
}

#[async_trait]
impl<T: Send + 'static> EnvelopeSink<T> for mpsc::UnboundedSender<T> {
    async fn deliver(&self, envelope: T) -> Result<(), SqlRelayError> {
        self.send(envelope)
            .map_err(|_| SqlRelayError::ChannelFailure("envelope channel closed".into()))
    }
}

#[async_trait]
impl<T: Send + 'static> EnvelopeSink<T> for mpsc::Sender<T> {
    async fn deliver(&self, envelope: T) -> Result<(), SqlRelayError> {
        self.send(envelope)
            .await
            .map_err(|_| SqlRelayError::ChannelFailure("envelope channel closed".into()))
    }
}
