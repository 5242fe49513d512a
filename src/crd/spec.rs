//! # SecretSync Specification
//!
//! The desired-state resource describing which Secret to produce and where its
//! data comes from.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::status::SecretSyncStatus;

/// SecretSync Custom Resource Definition
///
/// Syncs the files a secrets-store provider returns for a `SecretProviderClass`
/// into a Kubernetes Secret of the same name.
///
/// # Example
///
/// ```yaml
/// apiVersion: secret-sync.x-k8s.io/v1alpha1
/// kind: SecretSync
/// metadata:
///   name: db-credentials
///   namespace: default
/// spec:
///   serviceAccountName: app
///   secretProviderClassName: vault-db
///   secretObject:
///     type: Opaque
///     data:
///       - sourcePath: db/password
///         targetKey: password
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "SecretSync",
    group = "secret-sync.x-k8s.io",
    version = "v1alpha1",
    namespaced,
    status = "SecretSyncStatus",
    shortname = "ss",
    printcolumn = r#"{"name":"Hash", "type":"string", "jsonPath":".status.syncHash", "priority": 1}"#,
    printcolumn = r#"{"name":"Last Sync", "type":"date", "jsonPath":".status.lastSuccessfulSyncTime"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SecretSyncSpec {
    /// Service account whose tokens are forwarded to the provider
    pub service_account_name: String,
    /// Name of the SecretProviderClass in the same namespace
    pub secret_provider_class_name: String,
    /// Shape of the Secret to produce
    pub secret_object: SecretObject,
    /// Opaque token; any change forces a resync even when the fetched content is unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_synchronization: Option<String>,
}

/// Target Secret description
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretObject {
    /// Kubernetes Secret type (e.g. "Opaque", "kubernetes.io/tls")
    #[serde(rename = "type")]
    pub type_: String,
    /// Labels copied onto the Secret
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations copied onto the Secret
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Ordered mapping from provider file paths to Secret data keys
    pub data: Vec<SecretObjectData>,
}

/// One `sourcePath -> targetKey` mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretObjectData {
    /// Path of the file in the provider response
    pub source_path: String,
    /// Key in the Secret's data map
    pub target_key: String,
}
