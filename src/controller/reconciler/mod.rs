//! # Reconciler
//!
//! Core reconciliation logic for `SecretSync` resources.
//!
//! - `conditions`: condition ledger (types, reasons, transitions)
//! - `validation`: request checks run before any collaborator is called
//! - `sync`: the per-pass orchestrator and its status transaction
//! - `types`: reconciler context, errors and backoff state
//!
//! ## Requeue policy
//!
//! - Success: requeue after the sync interval so provider-side rotation is picked up
//! - Failure caused by the SecretSync itself: condition persisted, requeue after the sync interval
//! - Any other failure: returned as an error so the error policy applies backoff

pub mod conditions;
pub mod sync;
pub mod types;
pub mod validation;

pub use conditions::{ConditionReason, ConditionStatus, ConditionType};
pub use sync::{build_target_secret, PassOutcome, SyncEngine};
pub use types::{resource_key, BackoffState, Reconciler, ReconcilerError};

use crate::crd::SecretSync;
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

/// Reconcile one SecretSync
///
/// # Errors
/// Returns an error for failures that should be retried with backoff
pub async fn reconcile(
    sync: Arc<SecretSync>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = sync.name_any();
    let namespace = sync.namespace().unwrap_or_default();
    let span = info_span!(
        "reconcile",
        secret_sync = %name,
        namespace = %namespace,
        generation = sync.metadata.generation.unwrap_or_default(),
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations();
        info!("Reconciling SecretSync");

        let result = ctx.engine.run_pass(&sync).await;
        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

        let outcome = result?;
        metrics::record_sync_outcome(outcome.reason.as_str());
        let key = resource_key(&namespace, &name);
        let interval = ctx.config.sync_interval();

        if outcome.reason.is_succeeded() {
            ctx.reset_backoff(&key);
            info!(
                reason = %outcome.reason,
                written = outcome.secret_written,
                "Reconciliation succeeded, next sync in {}s",
                interval.as_secs()
            );
            metrics::increment_requeues_total("sync-interval");
            Ok(Action::requeue(interval))
        } else if outcome.reason.is_user_input() {
            warn!(
                reason = %outcome.reason,
                "SecretSync is invalid, retrying in {}s",
                interval.as_secs()
            );
            metrics::increment_requeues_total("sync-interval");
            Ok(Action::requeue(interval))
        } else {
            Err(ReconcilerError::SyncFailed {
                reason: outcome.reason,
            })
        }
    }
    .instrument(span)
    .await
}
