//! # Object Store
//!
//! Cluster-side reads and writes the reconciler needs:
//! - fetch the `SecretProviderClass` a SecretSync references
//! - apply the target `Secret` (server-side apply, forced)
//! - persist `SecretSync` status guarded by `resourceVersion`

use crate::constants::FIELD_MANAGER;
use crate::crd::{SecretProviderClass, SecretSync, SecretSyncStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a SecretProviderClass by namespace and name
    async fn get_provider_class(&self, namespace: &str, name: &str)
        -> Result<SecretProviderClass>;

    /// Create or fully replace the fields this controller owns on a Secret
    async fn apply_secret(&self, secret: &Secret) -> Result<()>;

    /// Write the status subresource of a SecretSync.
    /// Fails if the SecretSync changed since `sync` was read.
    async fn update_status(&self, sync: &SecretSync, status: &SecretSyncStatus) -> Result<()>;
}

/// [`ObjectStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeObjectStore {
    client: Client,
}

impl std::fmt::Debug for KubeObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeObjectStore").finish_non_exhaustive()
    }
}

impl KubeObjectStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn get_provider_class(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SecretProviderClass> {
        let api: Api<SecretProviderClass> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .with_context(|| format!("Failed to get SecretProviderClass {namespace}/{name}"))
    }

    async fn apply_secret(&self, secret: &Secret) -> Result<()> {
        let namespace = secret
            .metadata
            .namespace
            .as_deref()
            .context("Secret has no namespace")?;
        let name = secret.metadata.name.as_deref().context("Secret has no name")?;

        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.patch(
            name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(secret),
        )
        .await
        .with_context(|| format!("Failed to apply Secret {namespace}/{name}"))?;

        debug!(secret = name, namespace, "Applied Secret");
        Ok(())
    }

    async fn update_status(&self, sync: &SecretSync, status: &SecretSyncStatus) -> Result<()> {
        let namespace = sync.namespace().context("SecretSync has no namespace")?;
        let name = sync.name_any();

        let api: Api<SecretSync> = Api::namespaced(self.client.clone(), &namespace);

        // resourceVersion in a merge patch makes the API server reject stale writes
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": sync.resource_version() },
            "status": status,
        });

        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("Failed to update status of SecretSync {namespace}/{name}"))?;

        Ok(())
    }
}
