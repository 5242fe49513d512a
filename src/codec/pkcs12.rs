//! PKCS#12 fallback for inputs that contain no PEM blocks.
//!
//! Archives are opened with the empty password.

use super::CodecError;
use p12::PFX;

const PASSWORD: &str = "";

fn open(data: &[u8]) -> Result<PFX, CodecError> {
    PFX::parse(data).map_err(|e| CodecError::Pkcs12(format!("{e:?}")))
}

/// DER private key bodies (PKCS#8) stored in the archive
pub(super) fn private_keys(data: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    open(data)?
        .key_bags(PASSWORD)
        .map_err(|e| CodecError::Pkcs12(format!("{e:?}")))
}

/// DER X.509 certificates stored in the archive, in archive order
pub(super) fn certificates(data: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    open(data)?
        .cert_x509_bags(PASSWORD)
        .map_err(|e| CodecError::Pkcs12(format!("{e:?}")))
}
