//! # Digest Engine
//!
//! Change-detection fingerprint for a SecretSync.
//!
//! The digest covers the extracted secret data plus the identity and generation of
//! both the SecretSync and its SecretProviderClass, and the force-synchronization
//! token. Any change to those inputs yields a different digest, which is what makes
//! the orchestrator write the target Secret again.
//!
//! The construction is PBKDF2-HMAC-SHA512 (salted with the SecretSync UID) followed
//! by an HMAC-SHA512 of the derived key keyed with itself. It is slow on purpose so the
//! recorded hash cannot be cheaply brute-forced back to the secret values, but it is
//! not an authenticity check.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha512;
use std::collections::BTreeMap;
use thiserror::Error;
use zeroize::Zeroizing;

/// Version prefix of the emitted digest
pub const DIGEST_PREFIX: &str = "v1:";

/// PBKDF2 iteration count
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of the PBKDF2-derived key in bytes
pub const DERIVED_KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("failed to serialize digest inputs: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to initialize HMAC: {0}")]
    Hmac(String),
}

/// Everything besides the secret data that participates in the digest
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestInputs<'a> {
    pub provider_class_uid: &'a str,
    pub provider_class_generation: i64,
    pub sync_uid: &'a str,
    pub sync_generation: i64,
    pub force_synchronization: &'a str,
}

/// Serialized form; field order is part of the digest
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Fingerprint<'a> {
    data: BTreeMap<&'a str, String>,
    provider_class_uid: &'a str,
    provider_class_generation: i64,
    sync_uid: &'a str,
    sync_generation: i64,
    force_synchronization: &'a str,
}

/// Compute the `v1:`-prefixed hex digest for a sync pass.
///
/// # Errors
///
/// Returns [`DigestError`] if the inputs cannot be serialized.
pub fn compute_digest(
    data: &BTreeMap<String, Vec<u8>>,
    inputs: &DigestInputs<'_>,
) -> Result<String, DigestError> {
    compute_with_rounds(data, inputs, PBKDF2_ITERATIONS)
}

fn compute_with_rounds(
    data: &BTreeMap<String, Vec<u8>>,
    inputs: &DigestInputs<'_>,
    rounds: u32,
) -> Result<String, DigestError> {
    let fingerprint = Fingerprint {
        data: data
            .iter()
            .map(|(k, v)| (k.as_str(), STANDARD.encode(v)))
            .collect(),
        provider_class_uid: inputs.provider_class_uid,
        provider_class_generation: inputs.provider_class_generation,
        sync_uid: inputs.sync_uid,
        sync_generation: inputs.sync_generation,
        force_synchronization: inputs.force_synchronization,
    };
    let serialized = Zeroizing::new(serde_json::to_vec(&fingerprint)?);
    drop(fingerprint);

    let mut derived = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha512>(
        &serialized,
        inputs.sync_uid.as_bytes(),
        rounds,
        derived.as_mut_slice(),
    );

    let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(derived.as_slice())
        .map_err(|e| DigestError::Hmac(e.to_string()))?;
    mac.update(derived.as_slice());
    let tag = mac.finalize().into_bytes();

    Ok(format!("{DIGEST_PREFIX}{}", hex::encode(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low round count keeps the sensitivity tests fast in debug builds
    const TEST_ROUNDS: u32 = 10;

    fn data(pairs: &[(&str, &[u8])]) -> BTreeMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.to_vec()))
            .collect()
    }

    fn inputs() -> DigestInputs<'static> {
        DigestInputs {
            provider_class_uid: "spc-uid",
            provider_class_generation: 1,
            sync_uid: "ss-uid",
            sync_generation: 1,
            force_synchronization: "",
        }
    }

    fn quick(data: &BTreeMap<String, Vec<u8>>, inputs: &DigestInputs<'_>) -> String {
        compute_with_rounds(data, inputs, TEST_ROUNDS).unwrap()
    }

    #[test]
    fn test_digest_is_deterministic() {
        let d = data(&[("pwd", b"hello")]);
        let first = compute_digest(&d, &inputs()).unwrap();
        let second = compute_digest(&d, &inputs()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_digest_format() {
        let digest = compute_digest(&data(&[("pwd", b"hello")]), &inputs()).unwrap();
        let hex_part = digest.strip_prefix(DIGEST_PREFIX).unwrap();
        // HMAC-SHA512 output is 64 bytes
        assert_eq!(hex_part.len(), 128);
        assert!(hex_part.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut a = BTreeMap::new();
        a.insert("b".to_string(), b"2".to_vec());
        a.insert("a".to_string(), b"1".to_vec());
        let mut b = BTreeMap::new();
        b.insert("a".to_string(), b"1".to_vec());
        b.insert("b".to_string(), b"2".to_vec());
        assert_eq!(quick(&a, &inputs()), quick(&b, &inputs()));
    }

    #[test]
    fn test_value_change_changes_digest() {
        let base = quick(&data(&[("pwd", b"hello")]), &inputs());
        assert_ne!(base, quick(&data(&[("pwd", b"hellp")]), &inputs()));
        assert_ne!(base, quick(&data(&[("pwe", b"hello")]), &inputs()));
        assert_ne!(
            base,
            quick(&data(&[("pwd", b"hello"), ("extra", b"")]), &inputs())
        );
    }

    #[test]
    fn test_each_input_changes_digest() {
        let d = data(&[("pwd", b"hello")]);
        let base = quick(&d, &inputs());

        let variants = [
            DigestInputs {
                provider_class_uid: "spc-uid-2",
                ..inputs()
            },
            DigestInputs {
                provider_class_generation: 2,
                ..inputs()
            },
            DigestInputs {
                sync_uid: "ss-uid-2",
                ..inputs()
            },
            DigestInputs {
                sync_generation: 2,
                ..inputs()
            },
            DigestInputs {
                force_synchronization: "now",
                ..inputs()
            },
        ];

        for variant in &variants {
            assert_ne!(
                base,
                quick(&d, variant),
                "digest should change for {variant:?}"
            );
        }
    }

    #[test]
    fn test_fields_do_not_bleed_into_each_other() {
        let d = data(&[]);
        let a = DigestInputs {
            provider_class_uid: "ab",
            sync_uid: "c",
            ..inputs()
        };
        let b = DigestInputs {
            provider_class_uid: "a",
            sync_uid: "bc",
            ..inputs()
        };
        assert_ne!(quick(&d, &a), quick(&d, &b));
    }

    #[test]
    fn test_empty_data_is_allowed() {
        let digest = quick(&data(&[]), &inputs());
        assert!(digest.starts_with(DIGEST_PREFIX));
    }
}
