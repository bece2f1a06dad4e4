//! Unified error type for the server binary.

use scrawl_protocol::ProtocolError;
use scrawl_store::StoreError;
use scrawl_transport::TransportError;

/// Top-level error wrapping the per-crate errors, so `?` works across
/// layer boundaries in the server and handler code.
#[derive(Debug, thiserror::Error)]
pub enum ScrawlError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bad or missing configuration at startup.
    #[error("configuration error: {0}")]
    Config(String),
}
