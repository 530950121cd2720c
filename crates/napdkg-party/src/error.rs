//! Error types for the per-party protocol

use thiserror::Error;

use napdkg_core::PartyIndex;

/// Result type alias for party operations
pub type Result<T> = std::result::Result<T, PartyError>;

/// Errors that can occur while running a party
#[derive(Debug, Error)]
pub enum PartyError {
    /// Core primitive error
    #[error("Core error: {0}")]
    Core(#[from] napdkg_core::Error),

    /// Bulletin board error
    #[error("Board error: {0}")]
    Board(#[from] napdkg_pbb::BoardError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A Schnorr or DLEQ proof did not verify
    #[error("Proof verification failed: {0}")]
    ProofVerification(String),

    /// An unmasked share does not match its commitment
    #[error("Mask consistency failure: {0}")]
    MaskConsistency(String),

    /// Too few valid threshold outputs to reconstruct
    #[error("Insufficient quorum: {have} valid entries, need {need}")]
    InsufficientQuorum { have: usize, need: usize },

    /// A party is missing from the ephemeral key directory
    #[error("Identity lookup failed: {0}")]
    IdentityLookup(String),

    /// A bounded wait on the board expired
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Phase called out of order
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PartyError {
    /// Failures that only disqualify one candidate contribution.
    ///
    /// Callers drop the dealer or threshold output and keep going.
    pub fn is_candidate_rejection(&self) -> bool {
        matches!(
            self,
            PartyError::ProofVerification(_)
                | PartyError::MaskConsistency(_)
                | PartyError::Core(napdkg_core::Error::Decoding(_))
                | PartyError::Core(napdkg_core::Error::MalformedContribution(_))
        )
    }
}

impl From<serde_json::Error> for PartyError {
    fn from(e: serde_json::Error) -> Self {
        PartyError::Serialization(e.to_string())
    }
}

/// Why a candidate was dropped, kept for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    ProofVerification,
    MaskConsistency,
    Malformed,
    /// Nothing arrived before the wait expired
    Absent,
}

/// A dropped dealer or threshold output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejection {
    pub party: PartyIndex,
    pub kind: RejectionKind,
}

impl Rejection {
    pub(crate) fn from_error(party: PartyIndex, err: &PartyError) -> Option<Self> {
        let kind = match err {
            PartyError::ProofVerification(_) => RejectionKind::ProofVerification,
            PartyError::MaskConsistency(_) => RejectionKind::MaskConsistency,
            e if e.is_candidate_rejection() => RejectionKind::Malformed,
            _ => return None,
        };
        Some(Self { party, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_rejection_classification() {
        assert!(PartyError::ProofVerification("x".into()).is_candidate_rejection());
        assert!(PartyError::MaskConsistency("x".into()).is_candidate_rejection());
        assert!(PartyError::Core(napdkg_core::Error::Decoding("x".into())).is_candidate_rejection());
        assert!(!PartyError::InsufficientQuorum { have: 1, need: 2 }.is_candidate_rejection());
        assert!(!PartyError::IdentityLookup("x".into()).is_candidate_rejection());
        assert!(!PartyError::Core(napdkg_core::Error::Configuration("x".into())).is_candidate_rejection());
    }

    #[test]
    fn test_rejection_from_error() {
        let r = Rejection::from_error(3, &PartyError::MaskConsistency("bad".into())).unwrap();
        assert_eq!(r, Rejection { party: 3, kind: RejectionKind::MaskConsistency });
        assert!(Rejection::from_error(3, &PartyError::Timeout("t".into())).is_none());
    }
}
