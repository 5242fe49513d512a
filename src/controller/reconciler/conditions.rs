//! # Condition Ledger
//!
//! Status-condition bookkeeping for SecretSync passes.
//!
//! Two condition types exist, `Create` and `Update`; a pass works under exactly one
//! of them. Reasons form a closed vocabulary, each mapped to a fixed status and
//! message, and classified as either retry-triggering or succeeded.

use crate::constants::MAX_CONDITIONS;
use crate::crd::{Condition, SecretSyncStatus};

/// Condition type of a pass: first write vs. subsequent writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    Create,
    Update,
}

impl ConditionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionType::Create => "Create",
            ConditionType::Update => "Update",
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            ConditionType::Create => ConditionType::Update,
            ConditionType::Update => ConditionType::Create,
        }
    }

    /// `Create` until a digest has been recorded, `Update` afterwards
    #[must_use]
    pub fn for_status(status: &SecretSyncStatus) -> Self {
        if status.recorded_hash().is_some() {
            ConditionType::Update
        } else {
            ConditionType::Create
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

/// Every reason a SecretSync condition can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionReason {
    CreateSucceeded,
    UpdateNoValueChangeSucceeded,
    ValueChangeOrForceUpdateSucceeded,
    ProviderError,
    InvalidClusterSecretLabelError,
    InvalidClusterSecretAnnotationError,
    ValidatingAdmissionPolicyCheckFailed,
    ControllerSPCError,
    UserInputValidationFailed,
    ControllerInternalError,
    SecretPatchFailedUnknownError,
    Unknown,
}

impl ConditionReason {
    pub const ALL: [ConditionReason; 12] = [
        ConditionReason::CreateSucceeded,
        ConditionReason::UpdateNoValueChangeSucceeded,
        ConditionReason::ValueChangeOrForceUpdateSucceeded,
        ConditionReason::ProviderError,
        ConditionReason::InvalidClusterSecretLabelError,
        ConditionReason::InvalidClusterSecretAnnotationError,
        ConditionReason::ValidatingAdmissionPolicyCheckFailed,
        ConditionReason::ControllerSPCError,
        ConditionReason::UserInputValidationFailed,
        ConditionReason::ControllerInternalError,
        ConditionReason::SecretPatchFailedUnknownError,
        ConditionReason::Unknown,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConditionReason::CreateSucceeded => "CreateSucceeded",
            ConditionReason::UpdateNoValueChangeSucceeded => "UpdateNoValueChangeSucceeded",
            ConditionReason::ValueChangeOrForceUpdateSucceeded => {
                "ValueChangeOrForceUpdateSucceeded"
            }
            ConditionReason::ProviderError => "ProviderError",
            ConditionReason::InvalidClusterSecretLabelError => "InvalidClusterSecretLabelError",
            ConditionReason::InvalidClusterSecretAnnotationError => {
                "InvalidClusterSecretAnnotationError"
            }
            ConditionReason::ValidatingAdmissionPolicyCheckFailed => {
                "ValidatingAdmissionPolicyCheckFailed"
            }
            ConditionReason::ControllerSPCError => "ControllerSPCError",
            ConditionReason::UserInputValidationFailed => "UserInputValidationFailed",
            ConditionReason::ControllerInternalError => "ControllerInternalError",
            ConditionReason::SecretPatchFailedUnknownError => "SecretPatchFailedUnknownError",
            ConditionReason::Unknown => "Unknown",
        }
    }

    /// Parse a persisted reason string
    #[must_use]
    pub fn parse(reason: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == reason)
    }

    #[must_use]
    pub fn status(self) -> ConditionStatus {
        match self {
            ConditionReason::CreateSucceeded
            | ConditionReason::UpdateNoValueChangeSucceeded
            | ConditionReason::ValueChangeOrForceUpdateSucceeded => ConditionStatus::True,
            ConditionReason::ProviderError
            | ConditionReason::InvalidClusterSecretLabelError
            | ConditionReason::InvalidClusterSecretAnnotationError
            | ConditionReason::ValidatingAdmissionPolicyCheckFailed
            | ConditionReason::ControllerSPCError
            | ConditionReason::UserInputValidationFailed => ConditionStatus::False,
            ConditionReason::ControllerInternalError
            | ConditionReason::SecretPatchFailedUnknownError
            | ConditionReason::Unknown => ConditionStatus::Unknown,
        }
    }

    /// Default message recorded with the reason
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ConditionReason::CreateSucceeded => "Secret created successfully.",
            ConditionReason::UpdateNoValueChangeSucceeded => {
                "Secret is up to date, no value change detected."
            }
            ConditionReason::ValueChangeOrForceUpdateSucceeded => {
                "Secret updated after a value change or forced synchronization."
            }
            ConditionReason::ProviderError => {
                "Failed to fetch secrets from the external secret store provider."
            }
            ConditionReason::InvalidClusterSecretLabelError => {
                "Secret labels may not set the reserved key secrets-store.sync.x-k8s.io."
            }
            ConditionReason::InvalidClusterSecretAnnotationError => {
                "Secret annotations may not set the reserved key secrets-store.sync.x-k8s.io."
            }
            ConditionReason::ValidatingAdmissionPolicyCheckFailed => {
                "Request was denied by a ValidatingAdmissionPolicy."
            }
            ConditionReason::ControllerSPCError => {
                "Failed to get the SecretProviderClass referenced by the SecretSync."
            }
            ConditionReason::UserInputValidationFailed => {
                "The SecretSync specification is invalid."
            }
            ConditionReason::ControllerInternalError => {
                "The controller hit an internal error, the pass will be retried."
            }
            ConditionReason::SecretPatchFailedUnknownError => {
                "Failed to write the Secret for an unknown reason."
            }
            ConditionReason::Unknown => "Synchronization in progress.",
        }
    }

    /// Reasons that make the next pass write even when the digest is unchanged
    #[must_use]
    pub fn is_retry_triggering(self) -> bool {
        matches!(
            self,
            ConditionReason::ProviderError
                | ConditionReason::InvalidClusterSecretLabelError
                | ConditionReason::InvalidClusterSecretAnnotationError
                | ConditionReason::ValidatingAdmissionPolicyCheckFailed
                | ConditionReason::ControllerSPCError
                | ConditionReason::UserInputValidationFailed
                | ConditionReason::ControllerInternalError
                | ConditionReason::SecretPatchFailedUnknownError
                | ConditionReason::Unknown
        )
    }

    #[must_use]
    pub fn is_succeeded(self) -> bool {
        matches!(
            self,
            ConditionReason::CreateSucceeded
                | ConditionReason::UpdateNoValueChangeSucceeded
                | ConditionReason::ValueChangeOrForceUpdateSucceeded
        )
    }

    /// Failures caused by the SecretSync itself; these wait for the normal cadence
    #[must_use]
    pub fn is_user_input(self) -> bool {
        matches!(
            self,
            ConditionReason::UserInputValidationFailed
                | ConditionReason::InvalidClusterSecretLabelError
                | ConditionReason::InvalidClusterSecretAnnotationError
        )
    }
}

impl std::fmt::Display for ConditionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start a pass: drop the other type's condition and mark this type `Unknown`
pub fn begin_pass(status: &mut SecretSyncStatus, pass_type: ConditionType) {
    remove(status, pass_type.opposite());
    upsert(status, pass_type, ConditionReason::Unknown, None);
}

/// Insert or replace the condition of `condition_type`.
///
/// `message` overrides the reason's default message. The previous
/// `lastTransitionTime` is kept when the status value does not change.
pub fn upsert(
    status: &mut SecretSyncStatus,
    condition_type: ConditionType,
    reason: ConditionReason,
    message: Option<String>,
) {
    let new_status = reason.status().as_str();
    let message = message.unwrap_or_else(|| reason.message().to_string());

    if let Some(existing) = status
        .conditions
        .iter_mut()
        .find(|c| c.r#type == condition_type.as_str())
    {
        if existing.status != new_status {
            existing.status = new_status.to_string();
            existing.last_transition_time = Some(now());
        } else if existing.last_transition_time.is_none() {
            existing.last_transition_time = Some(now());
        }
        existing.reason = Some(reason.as_str().to_string());
        existing.message = Some(message);
    } else {
        status.conditions.push(Condition {
            r#type: condition_type.as_str().to_string(),
            status: new_status.to_string(),
            last_transition_time: Some(now()),
            reason: Some(reason.as_str().to_string()),
            message: Some(message),
        });
    }

    status.conditions.sort_by(|a, b| a.r#type.cmp(&b.r#type));
    status.conditions.truncate(MAX_CONDITIONS);
}

/// Restore `lastTransitionTime` from `previous` for every condition whose
/// status value ended the pass where it started. The transient `Unknown` set by
/// [`begin_pass`] does not count as a transition.
pub fn carry_transition_times(status: &mut SecretSyncStatus, previous: &[Condition]) {
    for condition in &mut status.conditions {
        let Some(before) = previous.iter().find(|c| c.r#type == condition.r#type) else {
            continue;
        };
        if before.status == condition.status && before.last_transition_time.is_some() {
            condition
                .last_transition_time
                .clone_from(&before.last_transition_time);
        }
    }
}

pub fn remove(status: &mut SecretSyncStatus, condition_type: ConditionType) {
    status
        .conditions
        .retain(|c| c.r#type != condition_type.as_str());
}

/// Reason recorded under `condition_type`, if it is part of the vocabulary
#[must_use]
pub fn reason_of(conditions: &[Condition], condition_type: ConditionType) -> Option<ConditionReason> {
    conditions
        .iter()
        .find(|c| c.r#type == condition_type.as_str())
        .and_then(|c| c.reason.as_deref())
        .and_then(ConditionReason::parse)
}

fn is_retry_triggering(condition: &Condition) -> bool {
    condition
        .reason
        .as_deref()
        .and_then(ConditionReason::parse)
        .is_some_and(ConditionReason::is_retry_triggering)
}

#[must_use]
pub fn has_retry_triggering(conditions: &[Condition]) -> bool {
    conditions.iter().any(is_retry_triggering)
}

pub fn clear_retry_triggering(status: &mut SecretSyncStatus) {
    status.conditions.retain(|c| !is_retry_triggering(c));
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
