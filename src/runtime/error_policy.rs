//! # Error Policy
//!
//! Backoff for reconciliation errors.
//!
//! Backoff state is tracked per resource so a failing SecretSync never delays
//! the others. It is cleared by the next successful pass.

use crate::controller::reconciler::{resource_key, Reconciler, ReconcilerError};
use crate::crd::SecretSync;
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

/// Handle reconciliation errors with Fibonacci backoff
pub fn handle_reconciliation_error(
    obj: Arc<SecretSync>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::error_span!(
        "reconciliation_error",
        secret_sync = %name,
        namespace = %namespace,
    );
    let _error_guard = error_span.enter();

    error!(error = %error, "Reconciliation error");
    metrics::increment_reconciliation_errors();

    let (backoff, error_count) = ctx.next_backoff(&resource_key(&namespace, &name));

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(backoff).unwrap_or_else(|_| chrono::Duration::minutes(1));
    info!(
        error_count,
        "Retrying with Fibonacci backoff in {}s (at {})",
        backoff.as_secs(),
        next_trigger_time.to_rfc3339()
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(backoff)
}
