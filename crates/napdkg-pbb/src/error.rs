//! Error types for the bulletin board

use thiserror::Error;

/// Result type alias for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur while talking to the bulletin board
#[derive(Debug, Error)]
pub enum BoardError {
    /// A record could not be encoded or decoded
    #[error("Serialization error on topic {topic}: {reason}")]
    Serialization { topic: &'static str, reason: String },
}
