//! Discrete-log equality proof over the bases `G` and `h`

use k256::{NonZeroScalar, ProjectivePoint, Scalar};
use rand::{CryptoRng, RngCore};
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use zeroize::Zeroize;

use crate::error::Result;
use crate::group::hash_points;

use super::{pair_from_wire, pair_to_wire};

const DOMAIN: &[u8] = b"napdkg/dleq/v1";

/// Proof `(e, z)` that `x = α·G` and `y = α·h`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DleqProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

/// Challenge `e ∈ [1, p−1]` drawn from a ChaCha20 stream seeded with the transcript hash.
///
/// Prover and verifier both go through here, so the derivation cannot drift.
pub fn derive_challenge(transcript_hash: &Scalar) -> Scalar {
    let seed: [u8; 32] = transcript_hash.to_bytes().into();
    let mut prg = ChaCha20Rng::from_seed(seed);
    *NonZeroScalar::random(&mut prg)
}

fn transcript(
    h: &ProjectivePoint,
    x: &ProjectivePoint,
    y: &ProjectivePoint,
    a1: &ProjectivePoint,
    a2: &ProjectivePoint,
) -> Scalar {
    hash_points(DOMAIN, &[&ProjectivePoint::GENERATOR, x, h, y, a1, a2])
}

impl DleqProof {
    /// Prove that `x = α·G` and `y = α·h`
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        h: &ProjectivePoint,
        x: &ProjectivePoint,
        y: &ProjectivePoint,
        alpha: &Scalar,
    ) -> Self {
        let mut w = *NonZeroScalar::random(rng);
        let a1 = ProjectivePoint::GENERATOR * w;
        let a2 = *h * w;

        let challenge = derive_challenge(&transcript(h, x, y, &a1, &a2));
        let response = w - challenge * alpha;
        w.zeroize();

        Self {
            challenge,
            response,
        }
    }

    /// Recompute `a₁' = z·G + e·x`, `a₂' = z·h + e·y` and re-derive the challenge
    pub fn verify(&self, h: &ProjectivePoint, x: &ProjectivePoint, y: &ProjectivePoint) -> bool {
        let a1 = ProjectivePoint::GENERATOR * self.response + *x * self.challenge;
        let a2 = *h * self.response + *y * self.challenge;
        derive_challenge(&transcript(h, x, y, &a1, &a2)) == self.challenge
    }

    pub fn to_wire(&self) -> String {
        pair_to_wire(&self.challenge, &self.response)
    }

    pub fn from_wire(s: &str) -> Result<Self> {
        let (challenge, response) = pair_from_wire(s)?;
        Ok(Self {
            challenge,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    struct Statement {
        h: ProjectivePoint,
        x: ProjectivePoint,
        y: ProjectivePoint,
        alpha: Scalar,
    }

    fn statement() -> Statement {
        let alpha = *NonZeroScalar::random(&mut OsRng);
        let h = ProjectivePoint::GENERATOR * *NonZeroScalar::random(&mut OsRng);
        Statement {
            h,
            x: ProjectivePoint::GENERATOR * alpha,
            y: h * alpha,
            alpha,
        }
    }

    #[test]
    fn test_valid_proof_verifies() {
        let s = statement();
        let proof = DleqProof::generate(&mut OsRng, &s.h, &s.x, &s.y, &s.alpha);
        assert!(proof.verify(&s.h, &s.x, &s.y));
    }

    #[test]
    fn test_perturbations_fail() {
        let s = statement();
        let proof = DleqProof::generate(&mut OsRng, &s.h, &s.x, &s.y, &s.alpha);
        let g = ProjectivePoint::GENERATOR;

        let mut bad = proof;
        bad.challenge += Scalar::ONE;
        assert!(!bad.verify(&s.h, &s.x, &s.y));

        let mut bad = proof;
        bad.response += Scalar::ONE;
        assert!(!bad.verify(&s.h, &s.x, &s.y));

        assert!(!proof.verify(&s.h, &(s.x + g), &s.y));
        assert!(!proof.verify(&s.h, &s.x, &(s.y + g)));
        assert!(!proof.verify(&(s.h + g), &s.x, &s.y));
    }

    #[test]
    fn test_unequal_logs_fail() {
        let s = statement();
        let y = s.h * (s.alpha + Scalar::ONE);
        let proof = DleqProof::generate(&mut OsRng, &s.h, &s.x, &y, &s.alpha);
        assert!(!proof.verify(&s.h, &s.x, &y));
    }

    #[test]
    fn test_challenge_derivation_is_deterministic_and_nonzero() {
        let h = Scalar::from(77u64);
        assert_eq!(derive_challenge(&h), derive_challenge(&h));
        assert_ne!(derive_challenge(&h), derive_challenge(&Scalar::from(78u64)));
        assert_ne!(derive_challenge(&Scalar::ZERO), Scalar::ZERO);
    }

    #[test]
    fn test_wire_roundtrip() {
        let s = statement();
        let proof = DleqProof::generate(&mut OsRng, &s.h, &s.x, &s.y, &s.alpha);
        assert_eq!(DleqProof::from_wire(&proof.to_wire()).unwrap(), proof);
    }
}
