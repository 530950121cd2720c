//! Protocol parameter derivation
//!
//! `pp = (group, t, n, {α₀..αₙ}, {v₁..vₙ})` where the αᵢ are distinct Shamir
//! evaluation points and the vⱼ are the SCRAPE dual-code weights
//!
//! ```text
//! vⱼ = ∏_{k≠j} (αⱼ − α_k)⁻¹ mod p,   j ∈ [1, n]
//! ```
//!
//! Parties are 0-indexed; party `i` owns evaluation point `α_{i+1}` and weight `v_{i+1}`.

use k256::Scalar;

use crate::error::{Error, Result};
use crate::group::GroupParameters;
use crate::PartyIndex;

/// Immutable public parameters shared by every party of a run
#[derive(Debug, Clone)]
pub struct ProtocolParameters {
    /// Underlying group
    pub group: GroupParameters,

    /// Threshold (degree of the sharing polynomial)
    pub t: usize,

    /// Number of participants
    pub n: usize,

    /// Evaluation points α₀..αₙ (α₀ is the secret's position)
    alphas: Vec<Scalar>,

    /// Dual-code weights v₁..vₙ, stored zero-based
    weights: Vec<Scalar>,
}

impl ProtocolParameters {
    /// Derive parameters with αᵢ = i.
    ///
    /// Any distinct set of points works; consecutive integers keep the
    /// reconstruction index equal to `party + 1`.
    pub fn derive(group: GroupParameters, t: usize, n: usize) -> Result<Self> {
        let alphas = (0..=n as u64).map(Scalar::from).collect();
        Self::with_alphas(group, t, n, alphas)
    }

    /// Derive parameters from caller-chosen evaluation points `α₀..αₙ`
    pub fn with_alphas(
        group: GroupParameters,
        t: usize,
        n: usize,
        alphas: Vec<Scalar>,
    ) -> Result<Self> {
        group.require_order()?;
        if n < t + 3 {
            return Err(Error::Configuration(format!(
                "Requires n - t - 2 > 0, got t={} n={}",
                t, n
            )));
        }
        if t == 0 {
            return Err(Error::Configuration("Threshold must be >= 1".to_string()));
        }
        if n > PartyIndex::MAX as usize {
            return Err(Error::Configuration(format!(
                "Too many participants: {}",
                n
            )));
        }
        if alphas.len() != n + 1 {
            return Err(Error::Configuration(format!(
                "Expected {} evaluation points, got {}",
                n + 1,
                alphas.len()
            )));
        }

        let weights = derive_dual_code_weights(&alphas[1..])?;

        Ok(Self {
            group,
            t,
            n,
            alphas,
            weights,
        })
    }

    /// All evaluation points α₀..αₙ
    pub fn alphas(&self) -> &[Scalar] {
        &self.alphas
    }

    /// Dual-code weights v₁..vₙ (zero-based slice)
    pub fn weights(&self) -> &[Scalar] {
        &self.weights
    }

    /// Evaluation point owned by `party`
    pub fn alpha_for_party(&self, party: PartyIndex) -> Scalar {
        self.alphas[party as usize + 1]
    }

    /// Dual-code weight of `party`'s column
    pub fn weight_for_party(&self, party: PartyIndex) -> Scalar {
        self.weights[party as usize]
    }

    /// Degree of the hash-derived polynomial m*(X)
    pub fn mstar_degree(&self) -> usize {
        self.n - self.t - 2
    }

    /// Target size of Q1 and of the Q2 collection, `t + fa`
    pub fn quorum_target(&self, fa: usize) -> usize {
        self.t + fa
    }

    /// Minimum number of threshold outputs able to reconstruct, `t + 1`
    pub fn reconstruction_threshold(&self) -> usize {
        self.t + 1
    }
}

/// SCRAPE dual-code weights for the given points.
///
/// Fails with [`Error::DegenerateParameters`] if two points coincide.
pub fn derive_dual_code_weights(points: &[Scalar]) -> Result<Vec<Scalar>> {
    let mut weights = Vec::with_capacity(points.len());
    for (j, alpha_j) in points.iter().enumerate() {
        let mut product = Scalar::ONE;
        for (k, alpha_k) in points.iter().enumerate() {
            if j == k {
                continue;
            }
            let inverse: Option<Scalar> = (*alpha_j - alpha_k).invert().into();
            let inverse = inverse.ok_or_else(|| {
                Error::DegenerateParameters(format!(
                    "Evaluation points {} and {} coincide",
                    j + 1,
                    k + 1
                ))
            })?;
            product *= inverse;
        }
        weights.push(product);
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pow(base: Scalar, exp: usize) -> Scalar {
        (0..exp).fold(Scalar::ONE, |acc, _| acc * base)
    }

    #[test]
    fn test_rejects_small_n() {
        let group = GroupParameters::secp256k1();
        assert!(matches!(
            ProtocolParameters::derive(group.clone(), 3, 5),
            Err(Error::Configuration(_))
        ));
        assert!(ProtocolParameters::derive(group, 3, 6).is_ok());
    }

    #[test]
    fn test_rejects_missing_order() {
        let group = GroupParameters {
            order: None,
            ..GroupParameters::secp256k1()
        };
        assert!(matches!(
            ProtocolParameters::derive(group, 2, 6),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_duplicate_alphas_are_degenerate() {
        let alphas = vec![
            Scalar::ZERO,
            Scalar::from(1u64),
            Scalar::from(2u64),
            Scalar::from(2u64),
            Scalar::from(4u64),
            Scalar::from(5u64),
        ];
        let result = ProtocolParameters::with_alphas(GroupParameters::secp256k1(), 2, 5, alphas);
        assert!(matches!(result, Err(Error::DegenerateParameters(_))));
    }

    #[test]
    fn test_dual_code_property() {
        for (t, n) in [(1usize, 4usize), (3, 8), (6, 10), (2, 12)] {
            let pp = ProtocolParameters::derive(GroupParameters::secp256k1(), t, n).unwrap();
            assert!(pp.weights().iter().all(|v| *v != Scalar::ZERO));

            for k in 0..=(n - t - 2) {
                let sum: Scalar = (0..n as PartyIndex)
                    .map(|j| pp.weight_for_party(j) * pow(pp.alpha_for_party(j), k))
                    .sum();
                assert_eq!(sum, Scalar::ZERO, "t={} n={} k={}", t, n, k);
            }
        }
    }

    #[test]
    fn test_alpha_layout() {
        let pp = ProtocolParameters::derive(GroupParameters::secp256k1(), 6, 10).unwrap();
        assert_eq!(pp.alphas().len(), 11);
        assert_eq!(pp.weights().len(), 10);
        assert_eq!(pp.alpha_for_party(0), Scalar::from(1u64));
        assert_eq!(pp.alpha_for_party(9), Scalar::from(10u64));
        assert_eq!(pp.mstar_degree(), 2);
        assert_eq!(pp.quorum_target(1), 7);
        assert_eq!(pp.reconstruction_threshold(), 7);
    }
}
