//! Dealer role
//!
//! Every party deals once. For a fresh secret `s` with shares `(aⱼ, Aⱼ)`:
//!
//! ```text
//! Cⱼ = sk_dealer·Eⱼ + Aⱼ        Ĉⱼ = mask(Aⱼ, aⱼ)
//! ```
//!
//! followed by the SCRAPE DLEQ proof `V = sk_dealer·U` over the sealed columns.

use k256::{elliptic_curve::Field, ProjectivePoint, Scalar};
use rand::{CryptoRng, RngCore};
use tracing::debug;

use napdkg_core::{
    generate_shares, mask_scalar, scrape, DleqProof, MaskedShare, PartyIndex, ProtocolParameters,
    SharingOutput,
};

use crate::error::{PartyError, Result};
use crate::keys::EphemeralKeyPair;
use crate::setup::KeyDirectory;

/// Masked columns of one dealing, before the proof is attached
#[derive(Debug, Clone)]
pub struct MaskedDealing {
    pub commitments: Vec<ProjectivePoint>,
    pub masked_shares: Vec<MaskedShare>,
}

/// Share a fresh random secret and mask every column for its recipient
pub fn mask_shares<R: RngCore + CryptoRng>(
    rng: &mut R,
    pp: &ProtocolParameters,
    key: &EphemeralKeyPair,
    directory: &KeyDirectory,
) -> MaskedDealing {
    let secret = Scalar::random(&mut *rng);
    let (shares, _polynomial) = generate_shares(rng, secret, pp);

    let commitments = directory
        .keys()
        .iter()
        .zip(&shares)
        .map(|(recipient, share)| *recipient * key.secret() + share.point)
        .collect();
    let masked_shares = shares
        .iter()
        .map(|share| mask_scalar(&share.point, &share.scalar))
        .collect();

    MaskedDealing {
        commitments,
        masked_shares,
    }
}

/// Bind the columns to m*(X) and prove `V = sk_dealer·U`
pub fn seal<R: RngCore + CryptoRng>(
    rng: &mut R,
    pp: &ProtocolParameters,
    dealer_index: PartyIndex,
    key: &EphemeralKeyPair,
    directory: &KeyDirectory,
    dealing: MaskedDealing,
) -> Result<SharingOutput> {
    if directory.key(dealer_index)? != key.public() {
        return Err(PartyError::IdentityLookup(format!(
            "Directory key for dealer {} is not ours",
            dealer_index
        )));
    }

    let agg = scrape::aggregate(
        pp,
        key.public(),
        directory.keys(),
        &dealing.commitments,
        &dealing.masked_shares,
    )?;
    let proof = DleqProof::generate(rng, &agg.u, key.public(), &agg.v, key.secret());
    debug!("Dealer {} sealed {} columns", dealer_index, dealing.commitments.len());

    Ok(SharingOutput {
        dealer_index,
        dealer_public_key: *key.public(),
        commitments: dealing.commitments,
        masked_shares: dealing.masked_shares,
        proof,
    })
}

/// [`mask_shares`] then [`seal`]
pub fn deal<R: RngCore + CryptoRng>(
    rng: &mut R,
    pp: &ProtocolParameters,
    dealer_index: PartyIndex,
    key: &EphemeralKeyPair,
    directory: &KeyDirectory,
) -> Result<SharingOutput> {
    let dealing = mask_shares(rng, pp, key, directory);
    seal(rng, pp, dealer_index, key, directory, dealing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use napdkg_core::unmask_scalar;
    use rand::rngs::OsRng;

    #[test]
    fn test_dealing_verifies_and_unmasks() {
        let (pp, keys, dir) = fixture(2, 6);
        let output = deal(&mut OsRng, &pp, 1, &keys[1], &dir).unwrap();

        let agg = scrape::aggregate(
            &pp,
            &output.dealer_public_key,
            dir.keys(),
            &output.commitments,
            &output.masked_shares,
        )
        .unwrap();
        assert!(output.proof.verify(&agg.u, &output.dealer_public_key, &agg.v));

        for (j, recipient) in keys.iter().enumerate() {
            let (c, c_hat) = output.column(j as PartyIndex).unwrap();
            let share_point = *c - output.dealer_public_key * recipient.secret();
            let share = unmask_scalar(&share_point, c_hat).unwrap();
            assert_eq!(ProjectivePoint::GENERATOR * share, share_point);
        }
    }

    #[test]
    fn test_seal_rejects_foreign_key() {
        let (pp, keys, dir) = fixture(2, 6);
        let dealing = mask_shares(&mut OsRng, &pp, &keys[0], &dir);
        assert!(matches!(
            seal(&mut OsRng, &pp, 3, &keys[0], &dir, dealing),
            Err(PartyError::IdentityLookup(_))
        ));
    }
}
