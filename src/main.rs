//! # Secret Sync Controller
//!
//! Keeps Kubernetes Secrets in sync with an external secret store.
//!
//! For every `SecretSync` the controller asks the provider named by the referenced
//! `SecretProviderClass` for its files, maps them onto Secret keys (normalizing TLS
//! material), and writes the Secret only when the content digest changes.
//! Outcomes are recorded as `Create`/`Update` conditions on the SecretSync.
//!
//! Metrics and probes are served on `METRICS_PORT` (`/metrics`, `/healthz`, `/readyz`).

use anyhow::Result;
use secret_sync_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(init.syncs, init.secrets, init.reconciler, init.server_state).await
}
