//! TLS secret value extraction.

use super::{encode_pem, key::normalize_private_key, pem_blocks, pkcs12, CodecError};
use crate::constants::{TLS_CERT_KEY, TLS_PRIVATE_KEY_KEY};

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Extract the part of `data` a TLS secret stores under `key`.
///
/// - `tls.crt`: every CERTIFICATE block, in input order, re-encoded as PEM.
/// - `tls.key`: the private key, normalized to PKCS#1 (RSA) or SEC1 (EC) PEM.
///
/// Input without any PEM blocks is read as a PKCS#12 archive with an empty password.
///
/// # Errors
///
/// Returns [`CodecError::UnsupportedTlsKey`] for any other key, and key or
/// archive errors from normalization.
pub fn get_cert_part(data: &[u8], key: &str) -> Result<Vec<u8>, CodecError> {
    match key {
        TLS_CERT_KEY => certificate_chain(data),
        TLS_PRIVATE_KEY_KEY => private_key(data),
        other => Err(CodecError::UnsupportedTlsKey(other.to_string())),
    }
}

fn certificate_chain(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let blocks = pem_blocks(data);

    let chain: Vec<Vec<u8>> = if blocks.is_empty() {
        pkcs12::certificates(data)?
    } else {
        blocks
            .into_iter()
            .filter(|b| b.tag() == CERTIFICATE_TAG)
            .map(pem::Pem::into_contents)
            .collect()
    };

    if chain.is_empty() {
        return Err(CodecError::NoCertificate);
    }

    Ok(chain
        .into_iter()
        .flat_map(|der| encode_pem(CERTIFICATE_TAG, der))
        .collect())
}

fn private_key(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let blocks = pem_blocks(data);

    let der = if blocks.is_empty() {
        pkcs12::private_keys(data)?
            .into_iter()
            .next()
            .ok_or(CodecError::NoPrivateKey)?
    } else {
        // Any non-certificate block is the key; the last one wins
        blocks
            .into_iter()
            .filter(|b| b.tag() != CERTIFICATE_TAG)
            .last()
            .map(pem::Pem::into_contents)
            .ok_or(CodecError::NoPrivateKey)?
    };

    Ok(normalize_private_key(&der)?.to_pem())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_PKCS1: &str = include_str!("../../tests/fixtures/rsa_pkcs1.pem");
    const RSA_PKCS8: &str = include_str!("../../tests/fixtures/rsa_pkcs8.pem");
    const EC_SEC1: &str = include_str!("../../tests/fixtures/ec_sec1.pem");
    const EC_PKCS8: &str = include_str!("../../tests/fixtures/ec_pkcs8.pem");
    const RSA_CERT: &str = include_str!("../../tests/fixtures/rsa_cert.pem");
    const EC_CERT: &str = include_str!("../../tests/fixtures/ec_cert.pem");
    const ED25519: &str = include_str!("../../tests/fixtures/ed25519_pkcs8.pem");

    fn der_of(pem_text: &str) -> Vec<u8> {
        pem::parse(pem_text).unwrap().into_contents()
    }

    fn build_pkcs12() -> Vec<u8> {
        p12::PFX::new(&der_of(RSA_CERT), &der_of(RSA_PKCS8), None, "", "tls")
            .unwrap()
            .to_der()
    }

    #[test]
    fn test_pkcs1_key_round_trips_byte_for_byte() {
        let out = get_cert_part(RSA_PKCS1.as_bytes(), "tls.key").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), RSA_PKCS1);
    }

    #[test]
    fn test_pkcs8_rsa_key_is_rewritten_as_pkcs1() {
        let out = get_cert_part(RSA_PKCS8.as_bytes(), "tls.key").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), RSA_PKCS1);
    }

    #[test]
    fn test_pkcs8_ec_key_is_rewritten_as_sec1() {
        let out = get_cert_part(EC_PKCS8.as_bytes(), "tls.key").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), EC_SEC1);
    }

    #[test]
    fn test_key_is_found_after_certificates() {
        let bundle = format!("{RSA_CERT}{EC_CERT}{EC_SEC1}");
        let out = get_cert_part(bundle.as_bytes(), "tls.key").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), EC_SEC1);
    }

    #[test]
    fn test_last_key_block_wins() {
        let bundle = format!("{RSA_PKCS1}{EC_SEC1}");
        let out = get_cert_part(bundle.as_bytes(), "tls.key").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), EC_SEC1);
    }

    #[test]
    fn test_chain_keeps_only_certificates_in_order() {
        let bundle = format!("{RSA_CERT}{RSA_PKCS8}{EC_CERT}");
        let out = get_cert_part(bundle.as_bytes(), "tls.crt").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{RSA_CERT}{EC_CERT}"));
    }

    #[test]
    fn test_unsupported_algorithm_is_reported() {
        let err = get_cert_part(ED25519.as_bytes(), "tls.key").unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedKeyAlgorithm(_)));
    }

    #[test]
    fn test_certificates_without_key() {
        let err = get_cert_part(RSA_CERT.as_bytes(), "tls.key").unwrap_err();
        assert!(matches!(err, CodecError::NoPrivateKey));
    }

    #[test]
    fn test_key_without_certificates() {
        let err = get_cert_part(RSA_PKCS1.as_bytes(), "tls.crt").unwrap_err();
        assert!(matches!(err, CodecError::NoCertificate));
    }

    #[test]
    fn test_pkcs12_archive_key() {
        let archive = build_pkcs12();
        let out = get_cert_part(&archive, "tls.key").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), RSA_PKCS1);
    }

    #[test]
    fn test_pkcs12_archive_certificate() {
        let archive = build_pkcs12();
        let out = get_cert_part(&archive, "tls.crt").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), RSA_CERT);
    }

    #[test]
    fn test_non_pem_non_pkcs12_input_fails() {
        let err = get_cert_part(b"\x00\x01\x02 random bytes", "tls.key").unwrap_err();
        assert!(matches!(err, CodecError::Pkcs12(_)));
    }

    #[test]
    fn test_other_keys_are_rejected() {
        let err = get_cert_part(RSA_PKCS1.as_bytes(), "ca.crt").unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedTlsKey(ref k) if k == "ca.crt"));
    }
}
