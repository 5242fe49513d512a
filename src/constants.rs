//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Field manager used for server-side apply of target secrets and status patches
pub const FIELD_MANAGER: &str = "secret-sync-controller";

/// Reserved label/annotation key owned by the controller.
/// The controller stamps it on every Secret it writes; requests may not set it.
pub const RESERVED_KEY: &str = "secrets-store.sync.x-k8s.io";

/// Secret type that routes data entries through certificate/key normalization
pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";

/// Target key holding the certificate chain of a TLS secret
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Target key holding the private key of a TLS secret
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Provider parameter keys carrying the requesting identity
pub const CSI_POD_NAME: &str = "csi.storage.k8s.io/pod.name";
pub const CSI_POD_UID: &str = "csi.storage.k8s.io/pod.uid";
pub const CSI_POD_NAMESPACE: &str = "csi.storage.k8s.io/pod.namespace";
pub const CSI_SERVICE_ACCOUNT_NAME: &str = "csi.storage.k8s.io/serviceAccount.name";
pub const CSI_SERVICE_ACCOUNT_TOKENS: &str = "csi.storage.k8s.io/serviceAccount.tokens";

/// Error text containing this marker (case-insensitive) may be shown in status verbatim
pub const SAFE_ERROR_MARKER: &str = "validatingadmissionpolicy";

/// Upper bound on the number of status conditions kept on a SecretSync
pub const MAX_CONDITIONS: usize = 16;

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default provider endpoint; `{provider}` is replaced with the SecretProviderClass provider
pub const DEFAULT_PROVIDER_ENDPOINT_TEMPLATE: &str =
    "http://{provider}-provider.secrets-store-providers.svc:8080/v1/mount";

/// Default timeout for a single provider call (seconds)
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;

/// Default deadline for one reconciliation pass (seconds)
pub const DEFAULT_RECONCILE_DEADLINE_SECS: u64 = 60;

/// Default requeue interval after a successful pass (seconds)
/// Drives rotation pick-up when nothing else changes
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 120;

/// Default Fibonacci backoff floor for failed passes (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Default Fibonacci backoff ceiling for failed passes (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;
