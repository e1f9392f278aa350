//! Fragment sink port.
//!
//! Where the turn accumulator relays generated text as it arrives. The
//! HTTP adapter backs this with a channel feeding the response body.

use async_trait::async_trait;
use thiserror::Error;

/// The reader on the other side of the sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("fragment sink closed")]
pub struct SinkClosed;

#[async_trait]
pub trait FragmentSink: Send + Sync {
    /// Delivers one fragment, in order, without batching.
    ///
    /// Returns `SinkClosed` once the reader has disconnected. Callers keep
    /// generating and persisting regardless.
    async fn emit(&self, fragment: &str) -> Result<(), SinkClosed>;

    /// Terminates the stream abnormally after content may already have been
    /// sent. The default does nothing; the stream then just ends.
    async fn abort(&self, _reason: &str) {}
}
