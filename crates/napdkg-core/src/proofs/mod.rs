//! Non-interactive zero-knowledge proofs (Fiat-Shamir)
//!
//! - [`DlProof`]: Schnorr proof of knowledge of `x` with `X = x·G`
//! - [`DleqProof`]: proof that `x = α·G` and `y = α·h` share the exponent `α`
//!
//! Verification returns `bool`; what a failed proof means is decided by the
//! calling phase.

mod dleq;
mod schnorr;

pub use dleq::{derive_challenge, DleqProof};
pub use schnorr::DlProof;

use crate::error::{Error, Result};
use crate::group::{decode_scalar, encode_scalar};
use k256::Scalar;

/// Hex pair `"challenge|response"`
pub(crate) fn pair_to_wire(challenge: &Scalar, response: &Scalar) -> String {
    format!("{}|{}", encode_scalar(challenge), encode_scalar(response))
}

pub(crate) fn pair_from_wire(s: &str) -> Result<(Scalar, Scalar)> {
    let (challenge, response) = s
        .split_once('|')
        .ok_or_else(|| Error::Decoding("Bad proof format, expected challenge|response".to_string()))?;
    if response.contains('|') {
        return Err(Error::Decoding("Bad proof format, too many fields".to_string()));
    }
    Ok((decode_scalar(challenge)?, decode_scalar(response)?))
}
