//! Bulletin-board wire records
//!
//! Points travel as compressed hex, scalars as big-endian hex and masked
//! shares as minimal big-integer hex. Every record carries a random `id` so
//! the board can delete and deduplicate it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::group::{decode_point, decode_scalar, encode_point, encode_scalar};
use crate::mask::MaskedShare;
use crate::proofs::{DlProof, DleqProof};
use crate::types::{PublicKeyWithProof, ShareVerificationPublish, SharingOutput};
use crate::PartyIndex;

fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// DLEQ proof as a `{challenge, response}` hex object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub challenge: String,
    pub response: String,
}

impl From<&DleqProof> for ProofRecord {
    fn from(proof: &DleqProof) -> Self {
        Self {
            challenge: encode_scalar(&proof.challenge),
            response: encode_scalar(&proof.response),
        }
    }
}

impl TryFrom<&ProofRecord> for DleqProof {
    type Error = Error;

    fn try_from(record: &ProofRecord) -> Result<Self> {
        Ok(DleqProof {
            challenge: decode_scalar(&record.challenge)?,
            response: decode_scalar(&record.response)?,
        })
    }
}

/// Entry of the `ephemeralKeys` topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralKeyRecord {
    pub id: String,
    pub party_index: PartyIndex,
    pub public_key: String,
    pub schnorr_proof: String,
}

impl From<&PublicKeyWithProof> for EphemeralKeyRecord {
    fn from(key: &PublicKeyWithProof) -> Self {
        Self {
            id: new_record_id(),
            party_index: key.party_index,
            public_key: encode_point(&key.public_key),
            schnorr_proof: key.proof.to_wire(),
        }
    }
}

impl TryFrom<&EphemeralKeyRecord> for PublicKeyWithProof {
    type Error = Error;

    fn try_from(record: &EphemeralKeyRecord) -> Result<Self> {
        Ok(PublicKeyWithProof {
            party_index: record.party_index,
            public_key: decode_point(&record.public_key)?,
            proof: DlProof::from_wire(&record.schnorr_proof)?,
        })
    }
}

/// Entry of the `DealerPublish` topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingOutputRecord {
    pub id: String,
    pub dealer_index: PartyIndex,
    pub dealer_public_key: String,
    #[serde(rename = "C")]
    pub commitments: Vec<String>,
    #[serde(rename = "cHat")]
    pub masked_shares: Vec<String>,
    pub proof: ProofRecord,
}

impl From<&SharingOutput> for SharingOutputRecord {
    fn from(output: &SharingOutput) -> Self {
        Self {
            id: new_record_id(),
            dealer_index: output.dealer_index,
            dealer_public_key: encode_point(&output.dealer_public_key),
            commitments: output.commitments.iter().map(encode_point).collect(),
            masked_shares: output.masked_shares.iter().map(MaskedShare::to_hex).collect(),
            proof: ProofRecord::from(&output.proof),
        }
    }
}

impl TryFrom<&SharingOutputRecord> for SharingOutput {
    type Error = Error;

    fn try_from(record: &SharingOutputRecord) -> Result<Self> {
        if record.commitments.len() != record.masked_shares.len() {
            return Err(Error::MalformedContribution(format!(
                "Dealer {} published {} commitments but {} masked shares",
                record.dealer_index,
                record.commitments.len(),
                record.masked_shares.len()
            )));
        }
        Ok(SharingOutput {
            dealer_index: record.dealer_index,
            dealer_public_key: decode_point(&record.dealer_public_key)?,
            commitments: record
                .commitments
                .iter()
                .map(|c| decode_point(c))
                .collect::<Result<_>>()?,
            masked_shares: record
                .masked_shares
                .iter()
                .map(|c| MaskedShare::from_hex(c))
                .collect::<Result<_>>()?,
            proof: DleqProof::try_from(&record.proof)?,
        })
    }
}

/// Entry of the `ShareVerificationOutput` topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareVerificationRecord {
    pub id: String,
    pub verifier_index: PartyIndex,
    pub tau: String,
    pub proof: ProofRecord,
}

impl From<&ShareVerificationPublish> for ShareVerificationRecord {
    fn from(theta: &ShareVerificationPublish) -> Self {
        Self {
            id: new_record_id(),
            verifier_index: theta.party_index,
            tau: encode_point(&theta.tau),
            proof: ProofRecord::from(&theta.proof),
        }
    }
}

impl TryFrom<&ShareVerificationRecord> for ShareVerificationPublish {
    type Error = Error;

    fn try_from(record: &ShareVerificationRecord) -> Result<Self> {
        Ok(ShareVerificationPublish {
            party_index: record.verifier_index,
            tau: decode_point(&record.tau)?,
            proof: DleqProof::try_from(&record.proof)?,
        })
    }
}

/// Parse any wire record from JSON
pub fn from_json<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| Error::Decoding(format!("Invalid record JSON: {}", e)))
}

pub fn to_json<T: Serialize>(record: &T) -> Result<String> {
    serde_json::to_string(record)
        .map_err(|e| Error::Decoding(format!("Failed to serialize record: {}", e)))
}
