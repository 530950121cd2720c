#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use napdkg_core::{
    mask::{mask, to_fixed32, unmask, unmask_scalar, MaskedShare},
    ProjectivePoint, Scalar,
};

#[derive(Arbitrary, Debug)]
struct Input {
    commitment_exponent: u64,
    share: Vec<u8>,
    masked_hex: String,
}

fuzz_target!(|input: Input| {
    let commitment = ProjectivePoint::GENERATOR * Scalar::from(input.commitment_exponent);

    // Round trip keeps the rightmost 32 bytes of any share
    let masked = mask(&commitment, &input.share);
    assert_eq!(unmask(&commitment, &masked), to_fixed32(&input.share));

    // Hex decoding of arbitrary text must not panic
    if let Ok(decoded) = MaskedShare::from_hex(&input.masked_hex) {
        assert_eq!(MaskedShare::from_hex(&decoded.to_hex()).unwrap(), decoded);
        if let Some(a) = unmask_scalar(&commitment, &decoded) {
            assert_eq!(mask(&commitment, a.to_bytes().as_slice()), decoded);
        }
    }
});
