//! # SecretProviderClass
//!
//! Provider configuration published by the Secrets Store CSI driver. The
//! controller only reads it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SecretProviderClass names a provider plugin and the parameters handed to it
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "SecretProviderClass",
    group = "secrets-store.csi.x-k8s.io",
    version = "v1",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct SecretProviderClassSpec {
    /// Provider plugin identifier (e.g. "vault", "aws", "azure")
    pub provider: String,
    /// Free-form parameters forwarded to the provider
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Secret projections used by the CSI driver; passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_objects: Option<Vec<serde_json::Value>>,
}
