//! # Sync Orchestrator
//!
//! One reconciliation pass of a SecretSync:
//!
//! 1. Validate the request (no collaborator is called before this passes)
//! 2. Issue service account tokens
//! 3. Fetch the SecretProviderClass
//! 4. Invoke the provider with its parameters plus the requesting identity
//! 5. Extract Secret data from the returned files
//! 6. Compute the change digest
//! 7. Skip the write when nothing changed, otherwise apply the Secret
//! 8. Persist status
//!
//! Any step may fail; the failure is recorded as a condition and status is
//! persisted. A failed Secret write rolls back the optimistic hash, timestamp
//! and condition before the failure is recorded.
//!
//! The whole pass, status write included, is bounded by a single deadline.

use crate::codec::extract_secret_data;
use crate::config::ControllerConfig;
use crate::constants::{
    CSI_POD_NAME, CSI_POD_NAMESPACE, CSI_POD_UID, CSI_SERVICE_ACCOUNT_NAME,
    CSI_SERVICE_ACCOUNT_TOKENS, RESERVED_KEY, SAFE_ERROR_MARKER,
};
use crate::controller::reconciler::conditions::{
    self, ConditionReason, ConditionType,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::reconciler::validation::validate_secret_sync;
use crate::crd::{SecretProviderClass, SecretSync, SecretSyncStatus};
use crate::digest::{compute_digest, DigestInputs};
use crate::observability::metrics;
use crate::provider::ProviderClient;
use crate::store::ObjectStore;
use crate::token::TokenIssuer;
use anyhow::Context;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Result of a pass that reached the status write
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub condition_type: ConditionType,
    pub reason: ConditionReason,
    pub secret_written: bool,
    pub status: SecretSyncStatus,
}

/// A failed step: the reason to record and an optional status message
#[derive(Debug)]
struct Failure {
    reason: ConditionReason,
    message: Option<String>,
}

impl Failure {
    fn new(reason: ConditionReason) -> Self {
        Self {
            reason,
            message: None,
        }
    }

    fn with_message(reason: ConditionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: Some(message.into()),
        }
    }
}

/// Map an error from the API server to a condition.
///
/// Only allowlisted text is surfaced; everything else becomes the generic reason
/// so provider or cluster internals never leak into status.
fn classify_api_error(err: &anyhow::Error) -> Failure {
    let text = format!("{err:#}");
    if text.to_lowercase().contains(SAFE_ERROR_MARKER) {
        Failure::with_message(ConditionReason::ValidatingAdmissionPolicyCheckFailed, text)
    } else {
        Failure::new(ConditionReason::SecretPatchFailedUnknownError)
    }
}

/// Hash and timestamp of a status before the optimistic update
#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusSnapshot {
    sync_hash: Option<String>,
    last_successful_sync_time: Option<String>,
}

impl StatusSnapshot {
    fn take(status: &SecretSyncStatus) -> Self {
        Self {
            sync_hash: status.sync_hash.clone(),
            last_successful_sync_time: status.last_successful_sync_time.clone(),
        }
    }

    fn restore(&self, status: &mut SecretSyncStatus) {
        status.sync_hash.clone_from(&self.sync_hash);
        status
            .last_successful_sync_time
            .clone_from(&self.last_successful_sync_time);
    }
}

/// Optimistic status update around a Secret write.
///
/// `begin` records the new hash, timestamp and success condition. Unless
/// [`commit`](Self::commit) is called, the update is undone on rollback or drop.
struct StatusTransaction<'a> {
    status: &'a mut SecretSyncStatus,
    snapshot: StatusSnapshot,
    condition_type: ConditionType,
    open: bool,
}

impl<'a> StatusTransaction<'a> {
    fn begin(
        status: &'a mut SecretSyncStatus,
        condition_type: ConditionType,
        reason: ConditionReason,
        digest: String,
    ) -> Self {
        let snapshot = StatusSnapshot::take(status);
        status.sync_hash = Some(digest);
        status.last_successful_sync_time = Some(chrono::Utc::now().to_rfc3339());
        conditions::upsert(status, condition_type, reason, None);
        Self {
            status,
            snapshot,
            condition_type,
            open: true,
        }
    }

    fn commit(mut self) {
        self.open = false;
    }

    fn rollback(mut self) {
        self.undo();
    }

    fn undo(&mut self) {
        if self.open {
            self.snapshot.restore(self.status);
            conditions::remove(self.status, self.condition_type);
            self.open = false;
        }
    }
}

impl Drop for StatusTransaction<'_> {
    fn drop(&mut self) {
        self.undo();
    }
}

/// Identity forwarded to providers alongside the SecretProviderClass parameters
#[derive(Debug, Clone, Default)]
pub struct ControllerIdentity {
    pub pod_name: String,
    pub pod_uid: String,
    pub token_audiences: Vec<String>,
}

/// Drives reconciliation passes against the collaborator seams
pub struct SyncEngine {
    store: Arc<dyn ObjectStore>,
    provider: Arc<dyn ProviderClient>,
    tokens: Arc<dyn TokenIssuer>,
    identity: ControllerIdentity,
    deadline: Duration,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("identity", &self.identity)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        provider: Arc<dyn ProviderClient>,
        tokens: Arc<dyn TokenIssuer>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            store,
            provider,
            tokens,
            identity: ControllerIdentity {
                pod_name: config.pod_name.clone(),
                pod_uid: config.pod_uid.clone(),
                token_audiences: config.token_audiences.clone(),
            },
            deadline: config.reconcile_deadline(),
        }
    }

    /// Run one pass for `sync` and persist the resulting status.
    ///
    /// Step failures are not errors here: they are recorded in the returned
    /// [`PassOutcome`]. Errors mean status could not be persisted.
    ///
    /// # Errors
    ///
    /// - [`ReconcilerError::DeadlineExceeded`] if the pass ran out of time; status is not written
    /// - [`ReconcilerError::StatusUpdate`] if status could not be persisted
    /// - [`ReconciliationFailed`](ReconcilerError::ReconciliationFailed) if the SecretSync has no namespace
    pub async fn run_pass(&self, sync: &SecretSync) -> Result<PassOutcome, ReconcilerError> {
        let namespace = sync
            .namespace()
            .context("SecretSync has no namespace")?;
        let deadline = Instant::now() + self.deadline;

        let mut status = sync.status.clone().unwrap_or_default();
        let had_retry_triggering = conditions::has_retry_triggering(&status.conditions);
        let previous_conditions = status.conditions.clone();
        let condition_type = ConditionType::for_status(&status);
        conditions::begin_pass(&mut status, condition_type);

        let steps = self.execute(
            sync,
            &namespace,
            &mut status,
            condition_type,
            had_retry_triggering,
        );
        let result = timeout_at(deadline, steps)
            .await
            .map_err(|_elapsed| ReconcilerError::DeadlineExceeded(self.deadline))?;

        let (reason, secret_written) = match result {
            Ok(success) => {
                conditions::clear_retry_triggering(&mut status);
                success
            }
            Err(failure) => {
                warn!(reason = %failure.reason, "Sync pass failed");
                conditions::upsert(&mut status, condition_type, failure.reason, failure.message);
                (failure.reason, false)
            }
        };
        conditions::carry_transition_times(&mut status, &previous_conditions);

        timeout_at(deadline, self.store.update_status(sync, &status))
            .await
            .map_err(|_elapsed| ReconcilerError::DeadlineExceeded(self.deadline))?
            .map_err(ReconcilerError::StatusUpdate)?;

        Ok(PassOutcome {
            condition_type,
            reason,
            secret_written,
            status,
        })
    }

    /// Steps 1-7; returns the success reason and whether the Secret was written
    async fn execute(
        &self,
        sync: &SecretSync,
        namespace: &str,
        status: &mut SecretSyncStatus,
        condition_type: ConditionType,
        had_retry_triggering: bool,
    ) -> Result<(ConditionReason, bool), Failure> {
        validate_secret_sync(sync).map_err(|f| Failure::with_message(f.reason, f.message))?;

        let spec = &sync.spec;

        let tokens = self
            .tokens
            .issue_tokens(
                namespace,
                &spec.service_account_name,
                &self.identity.token_audiences,
            )
            .await
            .map_err(|e| {
                warn!(error = %e, "Token issuance failed");
                classify_api_error(&e)
            })?;

        let provider_class = self
            .store
            .get_provider_class(namespace, &spec.secret_provider_class_name)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to get SecretProviderClass");
                Failure::new(ConditionReason::ControllerSPCError)
            })?;

        let tokens_json = if self.identity.token_audiences.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&tokens).map_err(|e| {
                warn!(error = %e, "Failed to serialize service account tokens");
                Failure::new(ConditionReason::ControllerInternalError)
            })?)
        };
        let parameters = self.provider_parameters(
            &provider_class,
            namespace,
            &spec.service_account_name,
            tokens_json,
        );

        let provider_name = provider_class.spec.provider.as_str();
        let started = std::time::Instant::now();
        let result = self
            .provider
            .invoke(provider_name, &parameters, &BTreeMap::new())
            .await;
        metrics::observe_provider_call(provider_name, started.elapsed().as_secs_f64());
        let result = result.map_err(|e| {
            warn!(provider = provider_name, error = %e, "Provider call failed");
            metrics::increment_provider_call_errors(provider_name);
            Failure::new(ConditionReason::ProviderError)
        })?;

        let data = extract_secret_data(
            &spec.secret_object.data,
            &spec.secret_object.type_,
            &result.files,
        )
        .map_err(|e| Failure::with_message(ConditionReason::UserInputValidationFailed, e.to_string()))?;
        drop(result);

        let provider_class_uid = provider_class.uid().unwrap_or_default();
        let sync_uid = sync.uid().unwrap_or_default();
        let digest = compute_digest(
            &data,
            &DigestInputs {
                provider_class_uid: &provider_class_uid,
                provider_class_generation: provider_class.metadata.generation.unwrap_or_default(),
                sync_uid: &sync_uid,
                sync_generation: sync.metadata.generation.unwrap_or_default(),
                force_synchronization: spec.force_synchronization.as_deref().unwrap_or_default(),
            },
        )
        .map_err(|e| {
            warn!(error = %e, "Failed to compute digest");
            Failure::new(ConditionReason::ControllerInternalError)
        })?;

        let previous_hash = status.recorded_hash();
        if !had_retry_triggering && previous_hash == Some(digest.as_str()) {
            debug!("Digest unchanged, skipping Secret write");
            conditions::upsert(
                status,
                condition_type,
                ConditionReason::UpdateNoValueChangeSucceeded,
                None,
            );
            return Ok((ConditionReason::UpdateNoValueChangeSucceeded, false));
        }

        let reason = if previous_hash.is_none() {
            ConditionReason::CreateSucceeded
        } else {
            ConditionReason::ValueChangeOrForceUpdateSucceeded
        };

        let secret = build_target_secret(sync, data).map_err(|e| {
            warn!(error = %e, "Failed to build target Secret");
            Failure::new(ConditionReason::ControllerInternalError)
        })?;

        let transaction = StatusTransaction::begin(status, condition_type, reason, digest);
        match self.store.apply_secret(&secret).await {
            Ok(()) => {
                transaction.commit();
                metrics::increment_secret_writes();
                info!(reason = %reason, "Secret written");
                Ok((reason, true))
            }
            Err(e) => {
                transaction.rollback();
                warn!(error = %e, "Failed to apply Secret");
                Err(classify_api_error(&e))
            }
        }
    }

    /// SecretProviderClass parameters overlaid with the requesting identity
    fn provider_parameters(
        &self,
        provider_class: &SecretProviderClass,
        namespace: &str,
        service_account: &str,
        tokens_json: Option<String>,
    ) -> BTreeMap<String, String> {
        let mut parameters = provider_class.spec.parameters.clone();
        parameters.insert(CSI_POD_NAME.to_string(), self.identity.pod_name.clone());
        parameters.insert(CSI_POD_UID.to_string(), self.identity.pod_uid.clone());
        parameters.insert(CSI_POD_NAMESPACE.to_string(), namespace.to_string());
        parameters.insert(
            CSI_SERVICE_ACCOUNT_NAME.to_string(),
            service_account.to_string(),
        );
        if let Some(tokens) = tokens_json {
            parameters.insert(CSI_SERVICE_ACCOUNT_TOKENS.to_string(), tokens);
        }
        parameters
    }
}

/// The Secret a SecretSync produces: same name and namespace, request labels plus
/// the reserved marker, request annotations, and a controller owner reference.
///
/// # Errors
/// Returns an error if the SecretSync has no name or UID to reference
pub fn build_target_secret(
    sync: &SecretSync,
    data: BTreeMap<String, Vec<u8>>,
) -> anyhow::Result<Secret> {
    let owner = sync
        .controller_owner_ref(&())
        .context("SecretSync has no name or uid")?;

    let secret_object = &sync.spec.secret_object;
    let mut labels = secret_object.labels.clone();
    labels.insert(RESERVED_KEY.to_string(), String::new());

    let annotations = (!secret_object.annotations.is_empty())
        .then(|| secret_object.annotations.clone());

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(sync.name_any()),
            namespace: sync.namespace(),
            labels: Some(labels),
            annotations,
            owner_references: Some(vec![owner]),
            ..ObjectMeta::default()
        },
        type_: Some(secret_object.type_.clone()),
        data: Some(
            data.into_iter()
                .map(|(key, value)| (key, ByteString(value)))
                .collect(),
        ),
        ..Secret::default()
    })
}
