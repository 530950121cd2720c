//! NAP-DKG per-party protocol
//!
//! Each participant is both a dealer and a verifier. Parties never talk to
//! each other; everything goes through a [`napdkg_pbb::BulletinBoard`]:
//!
//! 1. Setup: publish an ephemeral key with a Schnorr proof, collect all `n`
//! 2. Sharing: publish one masked, SCRAPE-proven sharing of a fresh secret
//! 3. Verification: accept dealers into Q1, decrypting our own column
//! 4. Threshold: publish Θ and collect a verified Q2
//! 5. Reconstruction: interpolate the group key from Q2

pub mod config;
pub mod driver;
pub mod error;
pub mod keys;
pub mod party;
pub mod reference;
pub mod setup;
pub mod sharing;
pub mod verification;

pub use config::DkgConfig;
pub use driver::{run_ceremony, run_party, CeremonyReport, PartyOutcome, PartyReport, PhaseTimings};
pub use error::{PartyError, Rejection, RejectionKind, Result};
pub use keys::EphemeralKeyPair;
pub use party::{Party, Reconstruction};
pub use reference::{GroupKeyReference, ReferenceOutcome};
pub use setup::KeyDirectory;
pub use sharing::MaskedDealing;
pub use verification::VerificationState;
