//! Error types for the NAP-DKG core primitives

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid (t, n) or group description
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Evaluation points collide, so a modular inverse does not exist
    #[error("Degenerate parameters: {0}")]
    DegenerateParameters(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    /// A contribution whose vectors do not match the protocol parameters
    #[error("Malformed contribution: {0}")]
    MalformedContribution(String),
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Decoding(e.to_string())
    }
}
