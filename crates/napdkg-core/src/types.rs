//! Protocol messages in decoded form

use k256::ProjectivePoint;

use crate::mask::MaskedShare;
use crate::proofs::{DlProof, DleqProof};
use crate::PartyIndex;

/// A party's ephemeral public key together with its Schnorr proof of knowledge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyWithProof {
    pub party_index: PartyIndex,
    pub public_key: ProjectivePoint,
    pub proof: DlProof,
}

impl PublicKeyWithProof {
    pub fn verify(&self) -> bool {
        self.proof.verify(&self.public_key)
    }
}

/// A dealer's publication: one masked column entry per recipient plus the SCRAPE proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingOutput {
    pub dealer_index: PartyIndex,
    pub dealer_public_key: ProjectivePoint,

    /// `Cⱼ = sk_dealer·Eⱼ + Aⱼ`, in recipient order
    pub commitments: Vec<ProjectivePoint>,

    /// `Ĉⱼ = mask(Aⱼ, aⱼ)`, in recipient order
    pub masked_shares: Vec<MaskedShare>,

    /// DLEQ proof that `V = sk_dealer·U`
    pub proof: DleqProof,
}

impl SharingOutput {
    /// The (C, Ĉ) pair addressed to `recipient`
    pub fn column(&self, recipient: PartyIndex) -> Option<(&ProjectivePoint, &MaskedShare)> {
        let j = recipient as usize;
        Some((self.commitments.get(j)?, self.masked_shares.get(j)?))
    }
}

/// Θ: a party's threshold output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareVerificationPublish {
    pub party_index: PartyIndex,

    /// τ = Σ Aₖ over the dealers in the publisher's Q1
    pub tau: ProjectivePoint,

    /// DLEQ proof that `W − τ = sk·EQ1` where `E = sk·G`
    pub proof: DleqProof,
}
