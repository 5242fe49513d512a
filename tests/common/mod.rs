//! Shared fixtures for orchestrator tests
//!
//! In-memory fakes of the store, provider and token seams, plus builders for the
//! resources a pass reads.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use secret_sync_controller::config::ControllerConfig;
use secret_sync_controller::controller::reconciler::{Reconciler, SyncEngine};
use secret_sync_controller::crd::{
    SecretObject, SecretObjectData, SecretProviderClass, SecretProviderClassSpec, SecretSync,
    SecretSyncSpec, SecretSyncStatus,
};
use secret_sync_controller::provider::{ProviderClient, ProviderResult};
use secret_sync_controller::store::ObjectStore;
use secret_sync_controller::token::{ServiceAccountToken, TokenIssuer};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zeroize::Zeroizing;

pub const NAMESPACE: &str = "default";

#[derive(Debug, Default)]
pub struct FakeStore {
    pub provider_class: Mutex<Option<SecretProviderClass>>,
    pub applied: Mutex<Vec<Secret>>,
    pub statuses: Mutex<Vec<SecretSyncStatus>>,
    pub apply_error: Mutex<Option<String>>,
    pub status_error: Mutex<Option<String>>,
    pub get_calls: AtomicUsize,
}

impl FakeStore {
    pub fn with_provider_class(class: SecretProviderClass) -> Self {
        Self {
            provider_class: Mutex::new(Some(class)),
            ..Self::default()
        }
    }

    pub fn fail_apply(&self, message: &str) {
        *self.apply_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn heal_apply(&self) {
        *self.apply_error.lock().unwrap() = None;
    }

    pub fn applied_count(&self) -> usize {
        self.applied.lock().unwrap().len()
    }

    pub fn last_applied(&self) -> Secret {
        self.applied.lock().unwrap().last().cloned().unwrap()
    }

    pub fn status_count(&self) -> usize {
        self.statuses.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get_provider_class(&self, _namespace: &str, name: &str) -> Result<SecretProviderClass> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.provider_class
            .lock()
            .unwrap()
            .clone()
            .filter(|c| c.metadata.name.as_deref() == Some(name))
            .ok_or_else(|| anyhow!("secretproviderclasses \"{name}\" not found"))
    }

    async fn apply_secret(&self, secret: &Secret) -> Result<()> {
        if let Some(message) = self.apply_error.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }
        self.applied.lock().unwrap().push(secret.clone());
        Ok(())
    }

    async fn update_status(&self, _sync: &SecretSync, status: &SecretSyncStatus) -> Result<()> {
        if let Some(message) = self.status_error.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }
        self.statuses.lock().unwrap().push(status.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FakeProvider {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    pub calls: Mutex<Vec<BTreeMap<String, String>>>,
    pub error: Mutex<Option<String>>,
    pub delay: Option<Duration>,
}

impl FakeProvider {
    pub fn serving(files: &[(&str, &[u8])]) -> Self {
        let provider = Self::default();
        provider.set_files(files);
        provider
    }

    pub fn set_files(&self, files: &[(&str, &[u8])]) {
        *self.files.lock().unwrap() = files
            .iter()
            .map(|(path, contents)| ((*path).to_string(), contents.to_vec()))
            .collect();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_parameters(&self) -> BTreeMap<String, String> {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ProviderClient for FakeProvider {
    async fn invoke(
        &self,
        _provider: &str,
        parameters: &BTreeMap<String, String>,
        _previous_versions: &BTreeMap<String, String>,
    ) -> Result<ProviderResult> {
        self.calls.lock().unwrap().push(parameters.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.error.lock().unwrap().clone() {
            return Err(anyhow!(message));
        }
        let files = self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, contents)| (path.clone(), Zeroizing::new(contents.clone())))
            .collect();
        Ok(ProviderResult {
            object_versions: BTreeMap::new(),
            files,
        })
    }
}

#[derive(Debug, Default)]
pub struct FakeTokens {
    pub error: Option<String>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl TokenIssuer for FakeTokens {
    async fn issue_tokens(
        &self,
        _namespace: &str,
        service_account: &str,
        audiences: &[String],
    ) -> Result<BTreeMap<String, ServiceAccountToken>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.error {
            return Err(anyhow!(message.clone()));
        }
        Ok(audiences
            .iter()
            .map(|audience| {
                (
                    audience.clone(),
                    ServiceAccountToken {
                        token: format!("token-for-{service_account}"),
                        expiration_timestamp: "2030-01-01T00:00:00Z".to_string(),
                    },
                )
            })
            .collect())
    }
}

pub fn controller_config() -> ControllerConfig {
    ControllerConfig {
        pod_name: "secret-sync-controller-0".to_string(),
        pod_uid: "pod-uid-1".to_string(),
        reconcile_deadline_secs: 10,
        ..ControllerConfig::default()
    }
}

pub fn provider_class() -> SecretProviderClass {
    let mut class = SecretProviderClass::new(
        "vault-kv",
        SecretProviderClassSpec {
            provider: "vault".to_string(),
            parameters: BTreeMap::from([("roleName".to_string(), "app".to_string())]),
            secret_objects: None,
        },
    );
    class.metadata.namespace = Some(NAMESPACE.to_string());
    class.metadata.uid = Some("spc-uid-1".to_string());
    class.metadata.generation = Some(1);
    class
}

pub fn secret_sync(secret_type: &str, data: &[(&str, &str)]) -> SecretSync {
    let mut sync = SecretSync::new(
        "sse2esecret",
        SecretSyncSpec {
            service_account_name: "default".to_string(),
            secret_provider_class_name: "vault-kv".to_string(),
            secret_object: SecretObject {
                type_: secret_type.to_string(),
                labels: BTreeMap::new(),
                annotations: BTreeMap::new(),
                data: data
                    .iter()
                    .map(|(source, target)| SecretObjectData {
                        source_path: (*source).to_string(),
                        target_key: (*target).to_string(),
                    })
                    .collect(),
            },
            force_synchronization: None,
        },
    );
    sync.metadata.namespace = Some(NAMESPACE.to_string());
    sync.metadata.uid = Some("ss-uid-1".to_string());
    sync.metadata.generation = Some(1);
    sync
}

/// Engine and the fakes behind it
pub struct Harness {
    pub store: Arc<FakeStore>,
    pub provider: Arc<FakeProvider>,
    pub tokens: Arc<FakeTokens>,
    pub engine: SyncEngine,
}

impl Harness {
    pub fn new(provider: FakeProvider) -> Self {
        Self::with_parts(provider, FakeTokens::default(), controller_config())
    }

    pub fn with_parts(provider: FakeProvider, tokens: FakeTokens, config: ControllerConfig) -> Self {
        let store = Arc::new(FakeStore::with_provider_class(provider_class()));
        let provider = Arc::new(provider);
        let tokens = Arc::new(tokens);
        let engine = SyncEngine::new(
            Arc::clone(&store) as Arc<dyn ObjectStore>,
            Arc::clone(&provider) as Arc<dyn ProviderClient>,
            Arc::clone(&tokens) as Arc<dyn TokenIssuer>,
            &config,
        );
        Self {
            store,
            provider,
            tokens,
            engine,
        }
    }

    pub fn into_reconciler(self, config: ControllerConfig) -> (Arc<FakeStore>, Arc<FakeProvider>, Reconciler) {
        (self.store, self.provider, Reconciler::new(self.engine, config))
    }
}

pub fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(&path).unwrap_or_else(|e| panic!("missing fixture {path}: {e}"))
}
