//! # Provider Client
//!
//! The seam to the external secret store plugin. A provider receives the
//! SecretProviderClass parameters (plus the requesting identity) and answers
//! with file contents and object versions.

mod http;

pub use http::HttpProviderClient;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// Files and versions returned by one provider call.
///
/// File bytes are wiped when the result is dropped.
#[derive(Default)]
pub struct ProviderResult {
    pub object_versions: BTreeMap<String, String>,
    pub files: BTreeMap<String, Zeroizing<Vec<u8>>>,
}

impl std::fmt::Debug for ProviderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderResult")
            .field("object_versions", &self.object_versions)
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Fetch secret material from `provider`
    ///
    /// # Arguments
    /// * `provider` - Provider name from the SecretProviderClass
    /// * `parameters` - SecretProviderClass parameters plus identity keys
    /// * `previous_versions` - Object versions from an earlier call, if any
    async fn invoke(
        &self,
        provider: &str,
        parameters: &BTreeMap<String, String>,
        previous_versions: &BTreeMap<String, String>,
    ) -> Result<ProviderResult>;
}
