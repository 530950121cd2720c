//! SCRAPE aggregate check shared by dealer and verifiers
//!
//! The dealer's publication is hashed into a polynomial m*(X) of degree
//! `n − t − 2`. With wⱼ = vⱼ·m*(αⱼ):
//!
//! ```text
//! U = Σ wⱼ·Eⱼ        V = Σ wⱼ·Cⱼ = sk·U + Σ wⱼ·Aⱼ
//! ```
//!
//! `Σ wⱼ·Aⱼ` vanishes exactly when the Aⱼ lie on a degree-`t` polynomial, so a
//! DLEQ proof of `V = sk·U` against the dealer's key proves well-formed sharing.

use k256::{ProjectivePoint, Scalar};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::group::{point_to_bytes, scalar_from_digest};
use crate::mask::MaskedShare;
use crate::params::ProtocolParameters;
use crate::shamir::evaluate_polynomial;
use crate::PartyIndex;

const DOMAIN: &[u8] = b"napdkg/scrape-mstar/v1";

/// Aggregated bases of one dealer's SCRAPE relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregate {
    pub u: ProjectivePoint,
    pub v: ProjectivePoint,
}

fn check_lengths(
    pp: &ProtocolParameters,
    ephemeral_keys: &[ProjectivePoint],
    commitments: &[ProjectivePoint],
    masked_shares: &[MaskedShare],
) -> Result<()> {
    if ephemeral_keys.len() != pp.n
        || commitments.len() != pp.n
        || masked_shares.len() != pp.n
    {
        return Err(Error::MalformedContribution(format!(
            "Expected {} entries, got E={} C={} Ĉ={}",
            pp.n,
            ephemeral_keys.len(),
            commitments.len(),
            masked_shares.len()
        )));
    }
    Ok(())
}

/// Coefficients of m*(X), bound to one dealer publication
pub fn derive_mstar(
    pp: &ProtocolParameters,
    dealer_public_key: &ProjectivePoint,
    ephemeral_keys: &[ProjectivePoint],
    commitments: &[ProjectivePoint],
    masked_shares: &[MaskedShare],
) -> Result<Vec<Scalar>> {
    check_lengths(pp, ephemeral_keys, commitments, masked_shares)?;

    let mut hasher = Sha256::new();
    hasher.update(DOMAIN);
    hasher.update((pp.t as u32).to_be_bytes());
    hasher.update((pp.n as u32).to_be_bytes());
    hasher.update(point_to_bytes(dealer_public_key));
    for key in ephemeral_keys {
        hasher.update(point_to_bytes(key));
    }
    for commitment in commitments {
        hasher.update(point_to_bytes(commitment));
    }
    for masked in masked_shares {
        hasher.update(masked.as_bytes());
    }
    let seed: [u8; 32] = hasher.finalize().into();

    Ok((0..=pp.mstar_degree() as u32)
        .map(|k| {
            let mut hasher = Sha256::new();
            hasher.update(seed);
            hasher.update(k.to_be_bytes());
            scalar_from_digest(hasher.finalize().into())
        })
        .collect())
}

/// Compute `(U, V)` for a publication. Keys and commitments are in party order.
pub fn aggregate(
    pp: &ProtocolParameters,
    dealer_public_key: &ProjectivePoint,
    ephemeral_keys: &[ProjectivePoint],
    commitments: &[ProjectivePoint],
    masked_shares: &[MaskedShare],
) -> Result<Aggregate> {
    let mstar = derive_mstar(
        pp,
        dealer_public_key,
        ephemeral_keys,
        commitments,
        masked_shares,
    )?;

    let mut u = ProjectivePoint::IDENTITY;
    let mut v = ProjectivePoint::IDENTITY;
    for (j, (key, commitment)) in ephemeral_keys.iter().zip(commitments).enumerate() {
        let party = j as PartyIndex;
        let weight =
            pp.weight_for_party(party) * evaluate_polynomial(&mstar, &pp.alpha_for_party(party));
        u += *key * weight;
        v += *commitment * weight;
    }
    Ok(Aggregate { u, v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupParameters;
    use crate::mask::mask_scalar;
    use crate::shamir::generate_shares;
    use k256::elliptic_curve::Field;
    use k256::NonZeroScalar;
    use rand::rngs::OsRng;

    struct Dealing {
        pp: ProtocolParameters,
        sk: Scalar,
        pk: ProjectivePoint,
        keys: Vec<ProjectivePoint>,
        commitments: Vec<ProjectivePoint>,
        masked: Vec<MaskedShare>,
    }

    fn dealing(degree_bump: bool) -> Dealing {
        let pp = ProtocolParameters::derive(GroupParameters::secp256k1(), 3, 8).unwrap();
        let sk = *NonZeroScalar::random(&mut OsRng);
        let pk = ProjectivePoint::GENERATOR * sk;
        let keys: Vec<_> = (0..pp.n)
            .map(|_| ProjectivePoint::GENERATOR * *NonZeroScalar::random(&mut OsRng))
            .collect();

        let mut shares = generate_shares(&mut OsRng, Scalar::random(&mut OsRng), &pp).0;
        if degree_bump {
            // push one evaluation off the degree-t polynomial
            shares[2].scalar += Scalar::ONE;
            shares[2].point = ProjectivePoint::GENERATOR * shares[2].scalar;
        }

        let commitments = keys
            .iter()
            .zip(&shares)
            .map(|(e, s)| *e * sk + s.point)
            .collect();
        let masked = shares
            .iter()
            .map(|s| mask_scalar(&s.point, &s.scalar))
            .collect();

        Dealing {
            pp,
            sk,
            pk,
            keys,
            commitments,
            masked,
        }
    }

    #[test]
    fn test_honest_dealing_satisfies_relation() {
        let d = dealing(false);
        let agg = aggregate(&d.pp, &d.pk, &d.keys, &d.commitments, &d.masked).unwrap();
        assert_eq!(agg.v, agg.u * d.sk);
    }

    #[test]
    fn test_off_polynomial_share_breaks_relation() {
        let d = dealing(true);
        let agg = aggregate(&d.pp, &d.pk, &d.keys, &d.commitments, &d.masked).unwrap();
        assert_ne!(agg.v, agg.u * d.sk);
    }

    #[test]
    fn test_mstar_binds_publication() {
        let d = dealing(false);
        let base = derive_mstar(&d.pp, &d.pk, &d.keys, &d.commitments, &d.masked).unwrap();
        assert_eq!(base.len(), d.pp.mstar_degree() + 1);

        let mut masked = d.masked.clone();
        masked[0] = MaskedShare([7u8; 32]);
        let changed = derive_mstar(&d.pp, &d.pk, &d.keys, &d.commitments, &masked).unwrap();
        assert_ne!(base, changed);
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let d = dealing(false);
        let result = aggregate(&d.pp, &d.pk, &d.keys[1..], &d.commitments, &d.masked);
        assert!(matches!(result, Err(Error::MalformedContribution(_))));
    }
}
