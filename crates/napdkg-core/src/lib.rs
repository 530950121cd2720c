//! NAP-DKG Core - Group codec, SCRAPE parameters, masking and NIZK proofs
//!
//! This crate provides the pure, transport-free primitives of the NAP-DKG
//! publicly verifiable DKG over secp256k1. The per-party protocol that drives
//! them over a bulletin board lives in `napdkg-party`.

pub mod error;
pub mod group;
pub mod mask;
pub mod params;
pub mod proofs;
pub mod scrape;
pub mod shamir;
pub mod types;
pub mod wire;

pub use error::{Error, Result};
pub use group::{GroupParameters, POINT_SIZE, SCALAR_SIZE};
pub use mask::{mask, mask_scalar, unmask, unmask_scalar, MaskedShare};
pub use params::ProtocolParameters;
pub use proofs::{DlProof, DleqProof};
pub use scrape::{aggregate, Aggregate};
pub use shamir::{generate_shares, reconstruct_point, reconstruct_scalar, Share};
pub use types::{PublicKeyWithProof, ShareVerificationPublish, SharingOutput};
pub use wire::{EphemeralKeyRecord, ProofRecord, ShareVerificationRecord, SharingOutputRecord};

/// Party identifier (0-indexed; party `i` evaluates at `αᵢ₊₁`)
pub type PartyIndex = u16;

pub use k256::{ProjectivePoint, Scalar};
