//! Group parameters and point/scalar codecs for secp256k1

use k256::{
    elliptic_curve::{
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Curve, PrimeField,
    },
    AffinePoint, EncodedPoint, FieldBytes, ProjectivePoint, Scalar, Secp256k1, U256,
};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Size of a compressed SEC1 point
pub const POINT_SIZE: usize = 33;

/// Size of a big-endian scalar
pub const SCALAR_SIZE: usize = 32;

/// Description of the prime-order group the protocol runs in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupParameters {
    /// Curve name, for logs and diagnostics
    pub curve: &'static str,

    /// Generator G
    pub generator: ProjectivePoint,

    /// Prime order p of the subgroup generated by G
    pub order: Option<U256>,

    /// Cofactor of the subgroup
    pub cofactor: u32,
}

impl GroupParameters {
    /// secp256k1 with its standard generator
    pub fn secp256k1() -> Self {
        Self {
            curve: "secp256k1",
            generator: ProjectivePoint::GENERATOR,
            order: Some(Secp256k1::ORDER),
            cofactor: 1,
        }
    }

    /// The group order, or a configuration error if it was never set.
    ///
    /// Only the secp256k1 order is accepted since all arithmetic runs on `k256`.
    pub fn require_order(&self) -> Result<U256> {
        let order = self
            .order
            .ok_or_else(|| Error::Configuration("Missing group order".to_string()))?;
        if order != Secp256k1::ORDER {
            return Err(Error::Configuration(format!(
                "Unsupported group order for curve {}",
                self.curve
            )));
        }
        Ok(order)
    }
}

/// Compressed SEC1 encoding of a point (the identity encodes as `[0x00]`)
pub fn point_to_bytes(point: &ProjectivePoint) -> Vec<u8> {
    point.to_affine().to_encoded_point(true).as_bytes().to_vec()
}

/// Decode a SEC1 point, accepting the identity encoding
pub fn point_from_bytes(bytes: &[u8]) -> Result<ProjectivePoint> {
    let encoded = EncodedPoint::from_bytes(bytes)
        .map_err(|e| Error::Decoding(format!("Invalid point encoding: {}", e)))?;
    let affine: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
    affine
        .map(ProjectivePoint::from)
        .ok_or_else(|| Error::Decoding("Point is not on the curve".to_string()))
}

/// Hex of the compressed point encoding
pub fn encode_point(point: &ProjectivePoint) -> String {
    hex::encode(point_to_bytes(point))
}

pub fn decode_point(s: &str) -> Result<ProjectivePoint> {
    let bytes = hex::decode(s)?;
    point_from_bytes(&bytes)
}

/// 32-byte big-endian hex of a scalar
pub fn encode_scalar(scalar: &Scalar) -> String {
    hex::encode(scalar.to_bytes())
}

/// Decode a big-endian scalar; short input is left-padded, values >= p are rejected
pub fn decode_scalar(s: &str) -> Result<Scalar> {
    if s.is_empty() {
        return Err(Error::Decoding("Empty scalar".to_string()));
    }
    let padded;
    let s = if s.len() % 2 == 1 {
        padded = format!("0{}", s);
        padded.as_str()
    } else {
        s
    };
    let raw = hex::decode(s)?;
    if raw.len() > SCALAR_SIZE {
        return Err(Error::Decoding(format!(
            "Scalar too long: {} bytes",
            raw.len()
        )));
    }
    let mut bytes = [0u8; SCALAR_SIZE];
    bytes[SCALAR_SIZE - raw.len()..].copy_from_slice(&raw);
    let scalar: Option<Scalar> = Scalar::from_repr(FieldBytes::from(bytes)).into();
    scalar.ok_or_else(|| Error::Decoding("Scalar is not below the group order".to_string()))
}

/// Reduce a 32-byte digest into a scalar mod p
pub fn scalar_from_digest(digest: [u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(digest))
}

/// SHA-256 over a domain tag and the compressed encodings of `points`, reduced mod p
pub fn hash_points(domain: &[u8], points: &[&ProjectivePoint]) -> Scalar {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    for point in points {
        hasher.update(point_to_bytes(point));
    }
    scalar_from_digest(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_hex_roundtrip() {
        let point = ProjectivePoint::GENERATOR * Scalar::from(42u64);
        let hex = encode_point(&point);
        assert_eq!(hex.len(), POINT_SIZE * 2);
        assert_eq!(decode_point(&hex).unwrap(), point);
    }

    #[test]
    fn test_identity_encoding() {
        let identity = ProjectivePoint::IDENTITY;
        assert_eq!(point_to_bytes(&identity), vec![0u8]);
        assert_eq!(decode_point("00").unwrap(), identity);
    }

    #[test]
    fn test_decode_point_rejects_garbage() {
        assert!(decode_point("02ffff").is_err());
        assert!(decode_point("zz").is_err());
    }

    #[test]
    fn test_scalar_decoding_pads_and_rejects() {
        assert_eq!(decode_scalar("2a").unwrap(), Scalar::from(42u64));
        assert_eq!(decode_scalar("a").unwrap(), Scalar::from(10u64));
        // p itself is not a valid scalar
        let order_hex = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
        assert!(decode_scalar(order_hex).is_err());
        assert!(decode_scalar(&"11".repeat(33)).is_err());
        assert!(matches!(decode_scalar(""), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_require_order() {
        let group = GroupParameters::secp256k1();
        assert!(group.require_order().is_ok());

        let missing = GroupParameters {
            order: None,
            ..GroupParameters::secp256k1()
        };
        assert!(matches!(
            missing.require_order(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_hash_points_domain_separated() {
        let g = ProjectivePoint::GENERATOR;
        assert_ne!(hash_points(b"a", &[&g]), hash_points(b"b", &[&g]));
        assert_eq!(hash_points(b"a", &[&g]), hash_points(b"a", &[&g]));
    }
}
