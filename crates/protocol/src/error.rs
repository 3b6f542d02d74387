//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding a client frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Empty message frame")]
    EmptyFrame,

    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}
