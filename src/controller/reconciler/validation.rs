//! # Validation
//!
//! Checks a SecretSync before any collaborator is called. Failures carry the
//! condition reason they are recorded under.

use crate::constants::RESERVED_KEY;
use crate::controller::reconciler::conditions::ConditionReason;
use crate::crd::SecretSync;
use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;

/// A rejected SecretSync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason: ConditionReason,
    pub message: String,
}

impl ValidationFailure {
    fn user_input(message: impl Into<String>) -> Self {
        Self {
            reason: ConditionReason::UserInputValidationFailed,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

/// Validate a SecretSync.
///
/// Order matters: basic shape first, then the reserved label, then the reserved
/// annotation, then the names of referenced objects.
pub fn validate_secret_sync(sync: &SecretSync) -> Result<(), ValidationFailure> {
    let name = sync.metadata.name.as_deref().unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ValidationFailure::user_input("metadata.name cannot be empty"));
    }

    let spec = &sync.spec;
    if spec.secret_object.type_.trim().is_empty() {
        return Err(ValidationFailure::user_input(
            "secretObject.type cannot be empty",
        ));
    }
    if spec.secret_object.data.is_empty() {
        return Err(ValidationFailure::user_input(
            "secretObject.data must contain at least one entry",
        ));
    }

    if sets_reserved_key(&spec.secret_object.labels) {
        return Err(ValidationFailure {
            reason: ConditionReason::InvalidClusterSecretLabelError,
            message: format!("secretObject.labels may not set the reserved key {RESERVED_KEY}"),
        });
    }
    if sets_reserved_key(&spec.secret_object.annotations) {
        return Err(ValidationFailure {
            reason: ConditionReason::InvalidClusterSecretAnnotationError,
            message: format!(
                "secretObject.annotations may not set the reserved key {RESERVED_KEY}"
            ),
        });
    }

    validate_kubernetes_name(&spec.secret_provider_class_name, "secretProviderClassName")
        .map_err(|e| ValidationFailure::user_input(e.to_string()))?;
    validate_kubernetes_name(&spec.service_account_name, "serviceAccountName")
        .map_err(|e| ValidationFailure::user_input(e.to_string()))?;

    Ok(())
}

/// True when the map carries the reserved key with a non-empty value
#[must_use]
pub fn sets_reserved_key(map: &BTreeMap<String, String>) -> bool {
    map.get(RESERVED_KEY).is_some_and(|v| !v.is_empty())
}

/// Validate Kubernetes resource name (RFC 1123 subdomain)
/// Format: lowercase alphanumeric, hyphens, dots
/// Length: 1-253 characters
/// Cannot start or end with hyphen or dot
pub fn validate_kubernetes_name(name: &str, field_name: &str) -> Result<()> {
    let name_trimmed = name.trim();

    if name_trimmed.is_empty() {
        return Err(anyhow::anyhow!("{field_name} cannot be empty"));
    }

    if name_trimmed.len() > 253 {
        return Err(anyhow::anyhow!(
            "{field_name} '{name_trimmed}' exceeds maximum length of 253 characters (got {})",
            name_trimmed.len()
        ));
    }

    let name_regex =
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
            .map_err(|e| anyhow::anyhow!("Failed to compile regex: {e}"))?;

    if !name_regex.is_match(name_trimmed) {
        return Err(anyhow::anyhow!(
            "{field_name} '{name_trimmed}' must be a valid Kubernetes name (lowercase alphanumeric, hyphens, dots; cannot start/end with hyphen or dot)"
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{SecretObject, SecretObjectData, SecretSyncSpec};

    fn sync() -> SecretSync {
        let mut sync = SecretSync::new(
            "sse2esecret",
            SecretSyncSpec {
                service_account_name: "default".to_string(),
                secret_provider_class_name: "vault-kv".to_string(),
                secret_object: SecretObject {
                    type_: "Opaque".to_string(),
                    labels: BTreeMap::new(),
                    annotations: BTreeMap::new(),
                    data: vec![SecretObjectData {
                        source_path: "foo".to_string(),
                        target_key: "pwd".to_string(),
                    }],
                },
                force_synchronization: None,
            },
        );
        sync.metadata.namespace = Some("default".to_string());
        sync
    }

    #[test]
    fn test_valid_sync_passes() {
        assert_eq!(validate_secret_sync(&sync()), Ok(()));
    }

    #[test]
    fn test_empty_type_is_user_input_error() {
        let mut s = sync();
        s.spec.secret_object.type_ = " ".to_string();
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(failure.reason, ConditionReason::UserInputValidationFailed);
        assert!(failure.message.contains("type"));
    }

    #[test]
    fn test_empty_data_is_user_input_error() {
        let mut s = sync();
        s.spec.secret_object.data.clear();
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(failure.reason, ConditionReason::UserInputValidationFailed);
    }

    #[test]
    fn test_missing_name_is_user_input_error() {
        let mut s = sync();
        s.metadata.name = None;
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(failure.reason, ConditionReason::UserInputValidationFailed);
    }

    #[test]
    fn test_invalid_provider_class_name() {
        let mut s = sync();
        s.spec.secret_provider_class_name = "Not_Valid".to_string();
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(failure.reason, ConditionReason::UserInputValidationFailed);
        assert!(failure.message.contains("secretProviderClassName"));
    }

    #[test]
    fn test_reserved_label_is_rejected() {
        let mut s = sync();
        s.spec
            .secret_object
            .labels
            .insert(RESERVED_KEY.to_string(), "x".to_string());
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(failure.reason, ConditionReason::InvalidClusterSecretLabelError);
    }

    #[test]
    fn test_reserved_annotation_is_rejected() {
        let mut s = sync();
        s.spec
            .secret_object
            .annotations
            .insert(RESERVED_KEY.to_string(), "x".to_string());
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(
            failure.reason,
            ConditionReason::InvalidClusterSecretAnnotationError
        );
    }

    #[test]
    fn test_label_checked_before_annotation() {
        let mut s = sync();
        s.spec
            .secret_object
            .labels
            .insert(RESERVED_KEY.to_string(), "x".to_string());
        s.spec
            .secret_object
            .annotations
            .insert(RESERVED_KEY.to_string(), "x".to_string());
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(failure.reason, ConditionReason::InvalidClusterSecretLabelError);
    }

    #[test]
    fn test_reserved_key_checked_before_referenced_names() {
        let mut s = sync();
        s.spec
            .secret_object
            .labels
            .insert(RESERVED_KEY.to_string(), "x".to_string());
        s.spec.service_account_name = "My_SA".to_string();
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(failure.reason, ConditionReason::InvalidClusterSecretLabelError);

        s.spec.secret_object.labels.clear();
        s.spec
            .secret_object
            .annotations
            .insert(RESERVED_KEY.to_string(), "x".to_string());
        s.spec.secret_provider_class_name = "Not_Valid".to_string();
        let failure = validate_secret_sync(&s).unwrap_err();
        assert_eq!(
            failure.reason,
            ConditionReason::InvalidClusterSecretAnnotationError
        );
    }

    #[test]
    fn test_empty_reserved_value_is_allowed() {
        let mut s = sync();
        s.spec
            .secret_object
            .labels
            .insert(RESERVED_KEY.to_string(), String::new());
        assert_eq!(validate_secret_sync(&s), Ok(()));
    }

    #[test]
    fn test_validate_kubernetes_name() {
        assert!(validate_kubernetes_name("my-spc.v1", "field").is_ok());
        assert!(validate_kubernetes_name("", "field").is_err());
        assert!(validate_kubernetes_name("-leading", "field").is_err());
        assert!(validate_kubernetes_name("UPPER", "field").is_err());
        assert!(validate_kubernetes_name(&"a".repeat(254), "field").is_err());
    }
}
