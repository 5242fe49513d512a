//! # Custom Resource Definitions
//!
//! CRD types consumed by the Secret Sync Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `SecretSync` specification (the desired state)
//! - `status.rs` - Status types owned by the controller
//! - `provider_class.rs` - `SecretProviderClass`, read-only provider configuration

mod provider_class;
mod spec;
mod status;

// Re-export all public types
pub use provider_class::{SecretProviderClass, SecretProviderClassSpec};
pub use spec::{SecretObject, SecretObjectData, SecretSync, SecretSyncSpec};
pub use status::{Condition, SecretSyncStatus};
