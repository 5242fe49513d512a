//! # Initialization
//!
//! Controller startup: rustls setup, tracing, metrics, server startup,
//! Kubernetes client and collaborator wiring.

use crate::config::{ControllerConfig, ServerConfig};
use crate::controller::reconciler::{Reconciler, SyncEngine};
use crate::controller::server::{start_server, ServerState};
use crate::crd::SecretSync;
use crate::observability;
use crate::provider::HttpProviderClient;
use crate::store::KubeObjectStore;
use crate::token::KubeTokenIssuer;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub syncs: Api<SecretSync>,
    pub secrets: Api<Secret>,
    pub reconciler: Arc<Reconciler>,
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field(
                "server_ready",
                &self.server_state.is_ready.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// # Errors
/// Returns an error if the crypto provider, metrics, HTTP server, Kubernetes
/// client or provider transport cannot be set up
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything touches rustls
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secret_sync_controller=info".into()),
        )
        .init();

    info!("Starting Secret Sync Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let controller_config = ControllerConfig::from_env();
    let server_config = ServerConfig::from_env();
    if controller_config.token_audiences.is_empty() {
        info!("No token audiences configured, providers will not receive service account tokens");
    }

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });

    let server_state_clone = Arc::clone(&server_state);
    let server_port = server_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let syncs: Api<SecretSync> = Api::all(client.clone());
    let secrets: Api<Secret> = Api::all(client.clone());
    log_existing_resources(&syncs).await;

    let provider = HttpProviderClient::new(
        controller_config.provider_endpoint_template.clone(),
        controller_config.provider_timeout(),
    )?;
    let engine = SyncEngine::new(
        Arc::new(KubeObjectStore::new(client.clone())),
        Arc::new(provider),
        Arc::new(KubeTokenIssuer::new(client.clone())),
        &controller_config,
    );
    let reconciler = Arc::new(Reconciler::new(engine, controller_config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        syncs,
        secrets,
        reconciler,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = server_config.startup_timeout();
    let poll_interval = server_config.poll_interval();
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Confirm the CRD is served and summarize what the first watch will pick up
async fn log_existing_resources(syncs: &Api<SecretSync>) {
    match syncs.list(&ListParams::default()).await {
        Ok(list) => {
            let mut namespaces: Vec<String> = list
                .items
                .iter()
                .filter_map(|s| s.metadata.namespace.clone())
                .collect();
            namespaces.sort();
            namespaces.dedup();
            info!(
                "CRD is queryable, found {} existing SecretSync resources in {} namespaces",
                list.items.len(),
                namespaces.len()
            );
        }
        Err(e) => {
            warn!(
                "Failed to list SecretSync resources, is the CRD installed? {}",
                e
            );
        }
    }
}
