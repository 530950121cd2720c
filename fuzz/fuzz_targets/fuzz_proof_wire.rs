#![no_main]

use libfuzzer_sys::fuzz_target;
use napdkg_core::{DlProof, ProjectivePoint, Scalar};

fuzz_target!(|data: &[u8]| {
    let Ok(wire) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(proof) = DlProof::from_wire(wire) {
        assert_eq!(DlProof::from_wire(&proof.to_wire()).unwrap(), proof);

        // A parsed proof must not verify against an unrelated key
        let public = ProjectivePoint::GENERATOR * Scalar::from(0x5eed_u64);
        if proof.verify(&public) {
            panic!("forged proof from fuzz input");
        }
    }
});
