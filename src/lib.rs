//! # Secret Sync Controller Library
//!
//! Core functionality of the Secret Sync Controller.
//!
//! - `codec`: secret data extraction and TLS certificate/key normalization
//! - `digest`: change-detection digest
//! - `controller`: reconciler, backoff and the metrics/probe server
//! - `store`, `provider`, `token`: collaborators the reconciler calls
//! - `runtime`: startup and the watch loop

pub mod codec;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod digest;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod store;
pub mod token;

pub use crd::{SecretProviderClass, SecretSync, SecretSyncSpec, SecretSyncStatus};
