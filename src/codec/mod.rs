//! # Credential/Cert Codec
//!
//! Pure functions that turn provider file contents into Secret data.
//!
//! - `extract_secret_data` maps `sourcePath -> targetKey` entries onto the files
//!   a provider returned.
//! - TLS secrets additionally pass every value through [`get_cert_part`], which
//!   normalizes certificate chains and private keys regardless of whether they
//!   arrived as PEM bundles, PKCS#12 archives, or PKCS#1/PKCS#8/SEC1 keys.

mod cert;
mod key;
mod pkcs12;

pub use cert::get_cert_part;
pub use key::{normalize_private_key, CanonicalKey, KeyKind};

use crate::constants::SECRET_TYPE_TLS;
use crate::crd::SecretObjectData;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while extracting or normalizing secret data
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("data[{index}].{field} cannot be empty")]
    EmptyField { index: usize, field: &'static str },

    #[error("source path '{0}' not found in provider response")]
    SourceNotFound(String),

    #[error("unsupported key '{0}' for a TLS secret: only tls.crt and tls.key are supported")]
    UnsupportedTlsKey(String),

    #[error("unsupported private key algorithm {0}: only RSA and EC keys are supported")]
    UnsupportedKeyAlgorithm(String),

    #[error("malformed private key: {0}")]
    MalformedKey(String),

    #[error("no private key found in input")]
    NoPrivateKey,

    #[error("no certificate found in input")]
    NoCertificate,

    #[error("failed to read PKCS#12 archive: {0}")]
    Pkcs12(String),

    #[error("failed to encode private key: {0}")]
    Encode(#[from] der::Error),
}

/// Build the Secret data map for a SecretSync.
///
/// Entries are applied in order, so a repeated `targetKey` keeps the last value.
/// For `kubernetes.io/tls` secrets each value goes through [`get_cert_part`].
///
/// # Errors
///
/// Returns [`CodecError`] when an entry has an empty field, references a file
/// the provider did not return, or (for TLS) cannot be normalized.
pub fn extract_secret_data<V: AsRef<[u8]>>(
    data: &[SecretObjectData],
    secret_type: &str,
    files: &BTreeMap<String, V>,
) -> Result<BTreeMap<String, Vec<u8>>, CodecError> {
    let is_tls = secret_type == SECRET_TYPE_TLS;
    let mut out = BTreeMap::new();

    for (index, entry) in data.iter().enumerate() {
        let source_path = entry.source_path.trim();
        let target_key = entry.target_key.trim();

        if source_path.is_empty() {
            return Err(CodecError::EmptyField {
                index,
                field: "sourcePath",
            });
        }
        if target_key.is_empty() {
            return Err(CodecError::EmptyField {
                index,
                field: "targetKey",
            });
        }

        let content = files
            .get(source_path)
            .ok_or_else(|| CodecError::SourceNotFound(source_path.to_string()))?
            .as_ref();

        let value = if is_tls {
            get_cert_part(content, target_key)?
        } else {
            content.to_vec()
        };

        out.insert(target_key.to_string(), value);
    }

    Ok(out)
}

/// PEM-encode a DER body with LF line endings and 64-column lines
pub(crate) fn encode_pem(tag: &str, der: Vec<u8>) -> Vec<u8> {
    let block = pem::Pem::new(tag, der);
    pem::encode_config(
        &block,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
    .into_bytes()
}

/// PEM blocks of `data` in order, up to the first block that fails to decode
pub(crate) fn pem_blocks(data: &[u8]) -> Vec<pem::Pem> {
    let mut blocks = Vec::new();
    let mut rest = data;
    while let Some((segment, remaining)) = next_pem_segment(rest) {
        let Ok(block) = pem::parse(segment) else {
            break;
        };
        blocks.push(block);
        rest = remaining;
    }
    blocks
}

/// Split off the next `-----BEGIN ...` through `-----END ...-----` span
fn next_pem_segment(data: &[u8]) -> Option<(&[u8], &[u8])> {
    const BEGIN: &[u8] = b"-----BEGIN ";
    const END: &[u8] = b"-----END ";
    const DASHES: &[u8] = b"-----";

    let body = &data[find(data, BEGIN)?..];
    let end_label = find(body, END)? + END.len();
    let close = end_label + find(&body[end_label..], DASHES)? + DASHES.len();
    Some(body.split_at(close))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
