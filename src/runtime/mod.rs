//! # Runtime
//!
//! Controller runtime: startup, the watch loop and the error policy.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server, Kubernetes client and collaborators
//! - `watch_loop`: `kube` controller over `SecretSync`, owning the Secrets it writes
//! - `error_policy`: per-resource Fibonacci backoff for failed passes

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
