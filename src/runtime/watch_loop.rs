//! # Watch Loop
//!
//! Runs the `kube` controller over SecretSync resources. Only generation changes
//! trigger a pass, so the controller's own status writes do not loop back.
//! Secrets the controller owns are watched too, so a deleted or edited target
//! Secret is rewritten.

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::controller::server::ServerState;
use crate::crd::SecretSync;
use crate::runtime::error_policy::handle_reconciliation_error;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube_runtime::{predicates, reflector, watcher, Controller, WatchStreamExt};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller until a shutdown signal is received
///
/// # Errors
/// Currently infallible; the signature leaves room for startup checks
pub async fn run_watch_loop(
    syncs: Api<SecretSync>,
    secrets: Api<Secret>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    // Mark the server not ready on SIGTERM/SIGINT so probes fail during drain
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, initiating graceful shutdown...");
            shutdown_state.is_ready.store(false, Ordering::Relaxed);
        }
    });

    info!("Starting controller watch loop...");
    let (reader, writer) = reflector::store();
    let syncs_by_generation = watcher(syncs, watcher::Config::default().any_semantic())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(predicates::generation);

    Controller::for_stream(syncs_by_generation, reader)
        .owns(secrets, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => debug!(object = %obj.name, "Reconciled"),
                Err(e) => warn!(error = %e, "Controller stream error"),
            }
        })
        .instrument(tracing::info_span!("controller.watch"))
        .await;

    info!("Controller stopped gracefully");
    Ok(())
}
