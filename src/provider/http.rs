//! HTTP/JSON transport for provider calls.
//!
//! Request body:
//! `{"attributes": {..}, "currentObjectVersions": [{"id", "version"}]}`
//!
//! Response body:
//! `{"objectVersions": [{"id", "version"}], "files": [{"path", "contents"}]}`
//! with `contents` base64 encoded.

use super::{ProviderClient, ProviderResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, Instrument};
use zeroize::Zeroizing;

/// Placeholder replaced with the provider name in the endpoint template
pub const PROVIDER_PLACEHOLDER: &str = "{provider}";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct ObjectVersion {
    pub id: String,
    pub version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MountRequest<'a> {
    attributes: &'a BTreeMap<String, String>,
    current_object_versions: Vec<ObjectVersion>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MountResponse {
    #[serde(default)]
    object_versions: Vec<ObjectVersion>,
    #[serde(default)]
    files: Vec<MountFile>,
}

#[derive(Deserialize)]
struct MountFile {
    path: String,
    contents: String,
}

impl Drop for MountFile {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.contents);
    }
}

/// [`ProviderClient`] that POSTs to a per-provider HTTP endpoint
pub struct HttpProviderClient {
    http_client: Client,
    endpoint_template: String,
}

impl std::fmt::Debug for HttpProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProviderClient")
            .field("endpoint_template", &self.endpoint_template)
            .finish_non_exhaustive()
    }
}

impl HttpProviderClient {
    /// Create a client for `endpoint_template`, where `{provider}` is substituted per call
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(endpoint_template: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            endpoint_template: endpoint_template.into(),
        })
    }

    /// Endpoint URL for `provider`
    #[must_use]
    pub fn endpoint_for(&self, provider: &str) -> String {
        self.endpoint_template.replace(PROVIDER_PLACEHOLDER, provider)
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn invoke(
        &self,
        provider: &str,
        parameters: &BTreeMap<String, String>,
        previous_versions: &BTreeMap<String, String>,
    ) -> Result<ProviderResult> {
        let url = self.endpoint_for(provider);
        let span = tracing::info_span!("provider.invoke", provider, url = %url);

        async move {
            let request = MountRequest {
                attributes: parameters,
                current_object_versions: previous_versions
                    .iter()
                    .map(|(id, version)| ObjectVersion {
                        id: id.clone(),
                        version: version.clone(),
                    })
                    .collect(),
            };

            let response = self
                .http_client
                .post(&url)
                .json(&request)
                .send()
                .await
                .with_context(|| format!("Failed to call provider '{provider}'"))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow::anyhow!(
                    "Provider '{provider}' returned {status}: {body}"
                ));
            }

            let body: MountResponse = response
                .json()
                .await
                .with_context(|| format!("Failed to decode response from provider '{provider}'"))?;

            let result = decode_response(body)?;
            debug!(files = result.files.len(), "Provider call succeeded");
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

fn decode_response(body: MountResponse) -> Result<ProviderResult> {
    let mut files = BTreeMap::new();
    for file in &body.files {
        let contents = general_purpose::STANDARD
            .decode(file.contents.as_bytes())
            .with_context(|| format!("Provider returned invalid base64 for '{}'", file.path))?;
        files.insert(file.path.clone(), Zeroizing::new(contents));
    }

    let object_versions = body
        .object_versions
        .iter()
        .map(|v| (v.id.clone(), v.version.clone()))
        .collect();

    Ok(ProviderResult {
        object_versions,
        files,
    })
}
