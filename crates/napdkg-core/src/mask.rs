//! Hash-keyed XOR masking of a scalar share against its commitment point
//!
//! `Ĉ = fixed32(a) ⊕ SHA-256(compressed(A))`. The recipient recovers `A`
//! from the Diffie-Hellman masked commitment and strips the mask again.
//!
//! `fixed32` left-pads short big-endian input with zeros and keeps only the
//! rightmost 32 bytes of longer input. A reduced scalar never exceeds 32
//! bytes, but raw integers handed to [`mask`] can, and their high-order bytes
//! are silently dropped.

use k256::{FieldBytes, ProjectivePoint, Scalar};
use k256::elliptic_curve::PrimeField;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::group::point_to_bytes;

/// Width of the mask and of every masked value
pub const MASK_BYTES: usize = 32;

/// A masked scalar share Ĉ, as a 256-bit unsigned integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskedShare(pub [u8; MASK_BYTES]);

impl MaskedShare {
    pub fn as_bytes(&self) -> &[u8; MASK_BYTES] {
        &self.0
    }

    /// Minimal big-integer hex (`"0"` for zero)
    pub fn to_hex(&self) -> String {
        let full = hex::encode(self.0);
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Parse big-integer hex with the same padding/truncation rule as [`to_fixed32`]
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Decoding("Empty masked share".to_string()));
        }
        let raw = if s.len() % 2 == 1 {
            hex::decode(format!("0{}", s))?
        } else {
            hex::decode(s)?
        };
        Ok(Self(to_fixed32(&raw)))
    }
}

/// Fixed 32-byte big-endian form of an unsigned integer
pub fn to_fixed32(be: &[u8]) -> [u8; MASK_BYTES] {
    let mut out = [0u8; MASK_BYTES];
    let copy = be.len().min(MASK_BYTES);
    out[MASK_BYTES - copy..].copy_from_slice(&be[be.len() - copy..]);
    out
}

fn mask_key(commitment: &ProjectivePoint) -> [u8; MASK_BYTES] {
    Sha256::digest(point_to_bytes(commitment)).into()
}

fn xor32(a: &[u8; MASK_BYTES], b: &[u8; MASK_BYTES]) -> [u8; MASK_BYTES] {
    let mut out = [0u8; MASK_BYTES];
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x ^ y;
    }
    out
}

/// Mask a big-endian share against commitment `A`
pub fn mask(commitment: &ProjectivePoint, share_be: &[u8]) -> MaskedShare {
    MaskedShare(xor32(&to_fixed32(share_be), &mask_key(commitment)))
}

pub fn mask_scalar(commitment: &ProjectivePoint, share: &Scalar) -> MaskedShare {
    mask(commitment, share.to_bytes().as_slice())
}

/// Strip the mask. The result is not reduced mod p; callers must check
/// `G·a == A` before trusting it.
pub fn unmask(commitment: &ProjectivePoint, masked: &MaskedShare) -> [u8; MASK_BYTES] {
    xor32(&masked.0, &mask_key(commitment))
}

/// Strip the mask and interpret the result as a scalar, `None` if it is >= p
pub fn unmask_scalar(commitment: &ProjectivePoint, masked: &MaskedShare) -> Option<Scalar> {
    let raw = unmask(commitment, masked);
    Scalar::from_repr(FieldBytes::from(raw)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(k: u64) -> ProjectivePoint {
        ProjectivePoint::GENERATOR * Scalar::from(k)
    }

    #[test]
    fn test_roundtrip_zero_share() {
        let a = point(7);
        let masked = mask_scalar(&a, &Scalar::ZERO);
        assert_eq!(unmask_scalar(&a, &masked), Some(Scalar::ZERO));
    }

    #[test]
    fn test_roundtrip_max_width() {
        let a = point(9);
        let share = [0xffu8; 32];
        let masked = mask(&a, &share);
        assert_eq!(unmask(&a, &masked), share);
        // 2^256 - 1 exceeds p, so it is not a scalar
        assert_eq!(unmask_scalar(&a, &masked), None);
    }

    #[test]
    fn test_long_input_is_leftmost_truncated() {
        let mut long = vec![0xaau8; 4];
        long.extend_from_slice(&[0x11u8; 32]);
        assert_eq!(to_fixed32(&long), [0x11u8; 32]);

        let a = point(3);
        assert_eq!(mask(&a, &long), mask(&a, &[0x11u8; 32]));
    }

    #[test]
    fn test_short_input_is_left_padded() {
        let fixed = to_fixed32(&[0x01, 0x02]);
        assert_eq!(&fixed[..30], &[0u8; 30]);
        assert_eq!(&fixed[30..], &[0x01, 0x02]);
    }

    #[test]
    fn test_wrong_commitment_does_not_unmask() {
        let share = Scalar::from(12345u64);
        let masked = mask_scalar(&point(1), &share);
        assert_ne!(unmask_scalar(&point(2), &masked), Some(share));
    }

    #[test]
    fn test_hex_form() {
        assert_eq!(MaskedShare([0u8; 32]).to_hex(), "0");
        let mut bytes = [0u8; 32];
        bytes[31] = 0x0a;
        bytes[30] = 0x01;
        let share = MaskedShare(bytes);
        assert_eq!(share.to_hex(), "10a");
        assert_eq!(MaskedShare::from_hex("10a").unwrap(), share);
        assert_eq!(MaskedShare::from_hex("0").unwrap(), MaskedShare([0u8; 32]));
        assert!(MaskedShare::from_hex("").is_err());
        assert!(MaskedShare::from_hex("xyz").is_err());
    }
}
