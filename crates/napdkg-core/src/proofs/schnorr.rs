//! Schnorr proof of knowledge of a discrete logarithm

use k256::{NonZeroScalar, ProjectivePoint, Scalar};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::Result;
use crate::group::hash_points;

use super::{pair_from_wire, pair_to_wire};

const DOMAIN: &[u8] = b"napdkg/schnorr-dl/v1";

/// Proof `(c, z)` for the statement `X = x·G`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DlProof {
    pub challenge: Scalar,
    pub response: Scalar,
}

impl DlProof {
    /// Prove knowledge of `secret` for `public = secret·G`
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        secret: &Scalar,
        public: &ProjectivePoint,
    ) -> Self {
        let mut nonce = *NonZeroScalar::random(rng);
        let commitment = ProjectivePoint::GENERATOR * nonce;
        let challenge = hash_points(DOMAIN, &[&ProjectivePoint::GENERATOR, public, &commitment]);
        let response = nonce - challenge * secret;
        nonce.zeroize();

        Self {
            challenge,
            response,
        }
    }

    /// Recompute `R' = z·G + c·X` and check the challenge derivation
    pub fn verify(&self, public: &ProjectivePoint) -> bool {
        let commitment =
            ProjectivePoint::GENERATOR * self.response + *public * self.challenge;
        let expected = hash_points(DOMAIN, &[&ProjectivePoint::GENERATOR, public, &commitment]);
        expected == self.challenge
    }

    /// Wire form `"challengeHex|responseHex"`
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

    fn keypair() -> (Scalar, ProjectivePoint) {
        let secret = *NonZeroScalar::random(&mut OsRng);
        (secret, ProjectivePoint::GENERATOR * secret)
    }

    #[test]
    fn test_prove_and_verify() {
        let (secret, public) = keypair();
        let proof = DlProof::generate(&mut OsRng, &secret, &public);
        assert!(proof.verify(&public));
    }

    #[test]
    fn test_wrong_key_fails() {
        let (secret, public) = keypair();
        let (_, other) = keypair();
        let proof = DlProof::generate(&mut OsRng, &secret, &public);
        assert!(!proof.verify(&other));
    }

    #[test]
    fn test_tampered_proof_fails() {
        let (secret, public) = keypair();
        let proof = DlProof::generate(&mut OsRng, &secret, &public);

        let mut bad = proof;
        bad.response += Scalar::ONE;
        assert!(!bad.verify(&public));

        let mut bad = proof;
        bad.challenge += Scalar::ONE;
        assert!(!bad.verify(&public));
    }

    #[test]
    fn test_wire_roundtrip() {
        let (secret, public) = keypair();
        let proof = DlProof::generate(&mut OsRng, &secret, &public);
        let wire = proof.to_wire();
        assert_eq!(wire.matches('|').count(), 1);
        assert_eq!(DlProof::from_wire(&wire).unwrap(), proof);
        assert!(DlProof::from_wire("abc").is_err());
        assert!(DlProof::from_wire("01|02|03").is_err());
        assert!(DlProof::from_wire("|").is_err());
        assert!(DlProof::from_wire("01|").is_err());
    }
}
