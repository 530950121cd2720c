#![no_main]

use libfuzzer_sys::fuzz_target;
use napdkg_core::{
    wire::from_json, EphemeralKeyRecord, PublicKeyWithProof, ShareVerificationPublish,
    ShareVerificationRecord, SharingOutput, SharingOutputRecord,
};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding must reject or accept, never panic
    if let Ok(record) = from_json::<EphemeralKeyRecord>(json) {
        if let Ok(key) = PublicKeyWithProof::try_from(&record) {
            let _ = key.verify();
            let again = PublicKeyWithProof::try_from(&EphemeralKeyRecord::from(&key)).unwrap();
            assert_eq!(again, key);
        }
    }

    if let Ok(record) = from_json::<SharingOutputRecord>(json) {
        if let Ok(output) = SharingOutput::try_from(&record) {
            assert_eq!(output.commitments.len(), output.masked_shares.len());
            let again = SharingOutput::try_from(&SharingOutputRecord::from(&output)).unwrap();
            assert_eq!(again, output);
        }
    }

    if let Ok(record) = from_json::<ShareVerificationRecord>(json) {
        if let Ok(theta) = ShareVerificationPublish::try_from(&record) {
            let again =
                ShareVerificationPublish::try_from(&ShareVerificationRecord::from(&theta)).unwrap();
            assert_eq!(again, theta);
        }
    }
});
