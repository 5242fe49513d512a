//! Private key normalization.
//!
//! Keys are tried against an ordered chain of parsers. Each parser either
//! produces a canonical key, declines with [`Attempt::Continue`] so the next
//! parser runs, or fails hard (e.g. a PKCS#8 key for an unsupported algorithm).
//!
//! Canonical output is PKCS#1 for RSA and SEC1 (with named-curve parameters)
//! for EC keys.

use super::CodecError;
use der::asn1::ObjectIdentifier;
use der::Encode;
use tracing::debug;

/// rsaEncryption
const RSA_ALGORITHM_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// id-ecPublicKey
const EC_ALGORITHM_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// Private key algorithms the codec can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Rsa,
    Ec,
}

impl KeyKind {
    /// PEM block type of the canonical encoding
    #[must_use]
    pub fn pem_tag(self) -> &'static str {
        match self {
            KeyKind::Rsa => "RSA PRIVATE KEY",
            KeyKind::Ec => "EC PRIVATE KEY",
        }
    }
}

/// A private key in its canonical DER form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalKey {
    pub kind: KeyKind,
    pub der: Vec<u8>,
}

impl CanonicalKey {
    /// Encode as a single PEM block
    #[must_use]
    pub fn to_pem(&self) -> Vec<u8> {
        super::encode_pem(self.kind.pem_tag(), self.der.clone())
    }
}

/// Outcome of one parser in the chain
enum Attempt {
    Parsed(CanonicalKey),
    Continue,
}

type KeyParser = fn(&[u8]) -> Result<Attempt, CodecError>;

/// Parsers in the order they are tried
const KEY_PARSERS: [(&str, KeyParser); 3] = [
    ("pkcs1", parse_pkcs1),
    ("pkcs8", parse_pkcs8),
    ("sec1", parse_sec1),
];

/// Normalize a DER private key to PKCS#1 (RSA) or SEC1 (EC).
///
/// # Errors
///
/// - [`CodecError::UnsupportedKeyAlgorithm`] for PKCS#8 keys that are neither RSA nor EC
/// - [`CodecError::NoPrivateKey`] when no parser recognizes the input
pub fn normalize_private_key(der: &[u8]) -> Result<CanonicalKey, CodecError> {
    for (format, parser) in KEY_PARSERS {
        if let Attempt::Parsed(key) = parser(der)? {
            debug!(format, kind = ?key.kind, "Parsed private key");
            return Ok(key);
        }
    }
    Err(CodecError::NoPrivateKey)
}

fn parse_pkcs1(der: &[u8]) -> Result<Attempt, CodecError> {
    let Ok(key) = pkcs1::RsaPrivateKey::try_from(der) else {
        return Ok(Attempt::Continue);
    };
    Ok(Attempt::Parsed(CanonicalKey {
        kind: KeyKind::Rsa,
        der: key.to_der()?,
    }))
}

fn parse_pkcs8(der: &[u8]) -> Result<Attempt, CodecError> {
    let Ok(info) = pkcs8::PrivateKeyInfo::try_from(der) else {
        return Ok(Attempt::Continue);
    };

    let oid = info.algorithm.oid;
    if oid == RSA_ALGORITHM_OID {
        let key = pkcs1::RsaPrivateKey::try_from(info.private_key)
            .map_err(|e| CodecError::MalformedKey(format!("PKCS#8 RSA payload: {e}")))?;
        return Ok(Attempt::Parsed(CanonicalKey {
            kind: KeyKind::Rsa,
            der: key.to_der()?,
        }));
    }

    if oid == EC_ALGORITHM_OID {
        let curve = info
            .algorithm
            .parameters_oid()
            .map_err(|e| CodecError::MalformedKey(format!("PKCS#8 EC curve: {e}")))?;
        let mut key = sec1::EcPrivateKey::try_from(info.private_key)
            .map_err(|e| CodecError::MalformedKey(format!("PKCS#8 EC payload: {e}")))?;
        // The inner SEC1 structure usually omits the curve; the algorithm identifier carries it.
        key.parameters = Some(sec1::EcParameters::NamedCurve(curve));
        return Ok(Attempt::Parsed(CanonicalKey {
            kind: KeyKind::Ec,
            der: key.to_der()?,
        }));
    }

    Err(CodecError::UnsupportedKeyAlgorithm(oid.to_string()))
}

fn parse_sec1(der: &[u8]) -> Result<Attempt, CodecError> {
    let Ok(key) = sec1::EcPrivateKey::try_from(der) else {
        return Ok(Attempt::Continue);
    };
    // Without a named curve the key cannot be re-emitted unambiguously
    if key.parameters.is_none() {
        return Ok(Attempt::Continue);
    }
    Ok(Attempt::Parsed(CanonicalKey {
        kind: KeyKind::Ec,
        der: key.to_der()?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_der(pem_text: &str) -> Vec<u8> {
        pem::parse(pem_text).unwrap().into_contents()
    }

    #[test]
    fn test_pkcs1_is_kept_as_is() {
        let der = fixture_der(include_str!("../../tests/fixtures/rsa_pkcs1.pem"));
        let key = normalize_private_key(&der).unwrap();
        assert_eq!(key.kind, KeyKind::Rsa);
        assert_eq!(key.der, der);
    }

    #[test]
    fn test_pkcs8_rsa_becomes_pkcs1() {
        let pkcs8 = fixture_der(include_str!("../../tests/fixtures/rsa_pkcs8.pem"));
        let pkcs1 = fixture_der(include_str!("../../tests/fixtures/rsa_pkcs1.pem"));
        let key = normalize_private_key(&pkcs8).unwrap();
        assert_eq!(key.kind, KeyKind::Rsa);
        assert_eq!(key.der, pkcs1, "PKCS#8 RSA key should unwrap to the same PKCS#1 key");
    }

    #[test]
    fn test_sec1_is_kept_as_is() {
        let der = fixture_der(include_str!("../../tests/fixtures/ec_sec1.pem"));
        let key = normalize_private_key(&der).unwrap();
        assert_eq!(key.kind, KeyKind::Ec);
        assert_eq!(key.der, der);
    }

    #[test]
    fn test_pkcs8_ec_becomes_sec1_with_curve() {
        let pkcs8 = fixture_der(include_str!("../../tests/fixtures/ec_pkcs8.pem"));
        let sec1_der = fixture_der(include_str!("../../tests/fixtures/ec_sec1.pem"));
        let key = normalize_private_key(&pkcs8).unwrap();
        assert_eq!(key.kind, KeyKind::Ec);
        assert_eq!(
            key.der, sec1_der,
            "PKCS#8 EC key should re-marshal to SEC1 with the named curve"
        );

        let parsed = sec1::EcPrivateKey::try_from(key.der.as_slice()).unwrap();
        assert!(parsed.parameters.is_some());
    }

    #[test]
    fn test_ed25519_is_unsupported() {
        let der = fixture_der(include_str!("../../tests/fixtures/ed25519_pkcs8.pem"));
        let err = normalize_private_key(&der).unwrap_err();
        assert!(
            matches!(err, CodecError::UnsupportedKeyAlgorithm(ref oid) if oid == "1.3.101.112"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_garbage_is_not_a_key() {
        let err = normalize_private_key(b"definitely not DER").unwrap_err();
        assert!(matches!(err, CodecError::NoPrivateKey));
    }

    #[test]
    fn test_certificate_der_is_not_a_key() {
        let der = fixture_der(include_str!("../../tests/fixtures/rsa_cert.pem"));
        assert!(matches!(
            normalize_private_key(&der),
            Err(CodecError::NoPrivateKey)
        ));
    }

    #[test]
    fn test_pem_tags() {
        assert_eq!(KeyKind::Rsa.pem_tag(), "RSA PRIVATE KEY");
        assert_eq!(KeyKind::Ec.pem_tag(), "EC PRIVATE KEY");
    }
}
