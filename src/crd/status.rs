//! # Status Types
//!
//! Observed state of a SecretSync. Owned by the reconciler; mutated through the
//! condition ledger and the sync-hash/timestamp fields only.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Status of the SecretSync resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretSyncStatus {
    /// Digest of the last content written to the Secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_hash: Option<String>,
    /// Time (RFC 3339) of the last successful write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_sync_time: Option<String>,
    /// At most one condition per type, ordered by type
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl SecretSyncStatus {
    /// Previously recorded digest, treating an empty string as absent
    #[must_use]
    pub fn recorded_hash(&self) -> Option<&str> {
        self.sync_hash.as_deref().filter(|h| !h.is_empty())
    }
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition ("Create" or "Update")
    pub r#type: String,
    /// Status of condition (True, False, Unknown)
    pub status: String,
    /// Last time the status value changed
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}
