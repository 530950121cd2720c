//! Per-run ephemeral key pairs

use k256::{NonZeroScalar, ProjectivePoint, Scalar};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use napdkg_core::{DlProof, PartyIndex, PublicKeyWithProof};

/// Ephemeral `(sk, pk = sk·G)` used for masking and for decrypting shares
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EphemeralKeyPair {
    secret: Scalar,
    #[zeroize(skip)]
    public: ProjectivePoint,
}

impl EphemeralKeyPair {
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let secret = *NonZeroScalar::random(rng);
        Self {
            secret,
            public: ProjectivePoint::GENERATOR * secret,
        }
    }

    pub fn public(&self) -> &ProjectivePoint {
        &self.public
    }

    pub(crate) fn secret(&self) -> &Scalar {
        &self.secret
    }

    /// Public key with a fresh Schnorr proof of knowledge, ready to publish
    pub fn prove<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        party_index: PartyIndex,
    ) -> PublicKeyWithProof {
        PublicKeyWithProof {
            party_index,
            public_key: self.public,
            proof: DlProof::generate(rng, &self.secret, &self.public),
        }
    }
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("secret", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}
