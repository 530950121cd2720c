//! Ephemeral key directory built during Setup
//!
//! Keys are addressed by party index only. The order in which records arrived
//! on the board never affects which column or evaluation point a party owns.

use k256::ProjectivePoint;
use tracing::{debug, warn};

use napdkg_core::{EphemeralKeyRecord, PartyIndex, ProtocolParameters, PublicKeyWithProof};

use crate::error::{PartyError, Result};

/// Verified ephemeral public keys of all `n` parties
#[derive(Debug, Clone)]
pub struct KeyDirectory {
    by_index: Vec<ProjectivePoint>,
}

/// Number of distinct in-range party indices among `records`
pub fn distinct_parties(pp: &ProtocolParameters, records: &[EphemeralKeyRecord]) -> usize {
    let mut seen = vec![false; pp.n];
    for record in records {
        if let Some(slot) = seen.get_mut(record.party_index as usize) {
            *slot = true;
        }
    }
    seen.into_iter().filter(|s| *s).count()
}

impl KeyDirectory {
    /// Decode and verify every key on the `ephemeralKeys` topic.
    ///
    /// Any undecodable key or failing Schnorr proof aborts Setup: masking to an
    /// unauthenticated key would leak that party's shares from every dealer.
    pub fn from_records(pp: &ProtocolParameters, records: &[EphemeralKeyRecord]) -> Result<Self> {
        let mut slots: Vec<Option<ProjectivePoint>> = vec![None; pp.n];

        for record in records {
            let key = PublicKeyWithProof::try_from(record)?;
            let slot = slots.get_mut(key.party_index as usize).ok_or_else(|| {
                PartyError::IdentityLookup(format!(
                    "Ephemeral key for out-of-range party {}",
                    key.party_index
                ))
            })?;
            if !key.verify() {
                return Err(PartyError::ProofVerification(format!(
                    "Schnorr proof for party {} does not verify",
                    key.party_index
                )));
            }
            match slot {
                Some(existing) if *existing != key.public_key => {
                    warn!(
                        "Party {} published a second, different ephemeral key; keeping the first",
                        key.party_index
                    );
                }
                Some(_) => {}
                None => {
                    debug!("Registered ephemeral key for party {}", key.party_index);
                    *slot = Some(key.public_key);
                }
            }
        }

        let by_index = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    PartyError::IdentityLookup(format!("No ephemeral key for party {}", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { by_index })
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }

    /// Keys in party-index order
    pub fn keys(&self) -> &[ProjectivePoint] {
        &self.by_index
    }

    pub fn key(&self, party: PartyIndex) -> Result<&ProjectivePoint> {
        self.by_index.get(party as usize).ok_or_else(|| {
            PartyError::IdentityLookup(format!("Party {} is not in the key directory", party))
        })
    }

    /// Index of the party that registered `key`
    pub fn locate(&self, key: &ProjectivePoint) -> Option<PartyIndex> {
        self.by_index
            .iter()
            .position(|k| k == key)
            .map(|i| i as PartyIndex)
    }
}
