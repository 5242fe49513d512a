//! # Token Issuer
//!
//! Issues short-lived service account tokens handed to providers so they can
//! authenticate as the workload identity named by a SecretSync.

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenRequest, TokenRequestSpec};
use k8s_openapi::api::core::v1::ServiceAccount;
use kube::api::{Api, PostParams};
use kube::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A token bound to one audience
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountToken {
    pub token: String,
    pub expiration_timestamp: String,
}

impl std::fmt::Debug for ServiceAccountToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountToken")
            .field("token", &"***")
            .field("expiration_timestamp", &self.expiration_timestamp)
            .finish()
    }
}

#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issue one token per audience. An empty audience list yields an empty map.
    async fn issue_tokens(
        &self,
        namespace: &str,
        service_account: &str,
        audiences: &[String],
    ) -> Result<BTreeMap<String, ServiceAccountToken>>;
}

/// [`TokenIssuer`] using the ServiceAccount `token` subresource
#[derive(Clone)]
pub struct KubeTokenIssuer {
    client: Client,
}

impl std::fmt::Debug for KubeTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeTokenIssuer").finish_non_exhaustive()
    }
}

impl KubeTokenIssuer {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenIssuer for KubeTokenIssuer {
    async fn issue_tokens(
        &self,
        namespace: &str,
        service_account: &str,
        audiences: &[String],
    ) -> Result<BTreeMap<String, ServiceAccountToken>> {
        let mut tokens = BTreeMap::new();
        if audiences.is_empty() {
            return Ok(tokens);
        }

        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        for audience in audiences {
            let request = TokenRequest {
                spec: TokenRequestSpec {
                    audiences: vec![audience.clone()],
                    ..TokenRequestSpec::default()
                },
                ..TokenRequest::default()
            };

            let response = api
                .create_token_request(service_account, &PostParams::default(), &request)
                .await
                .with_context(|| {
                    format!(
                        "Failed to request token for {namespace}/{service_account} (audience {audience})"
                    )
                })?;

            let status = response
                .status
                .context("TokenRequest response has no status")?;

            tokens.insert(
                audience.clone(),
                ServiceAccountToken {
                    token: status.token,
                    expiration_timestamp: status.expiration_timestamp.0.to_string(),
                },
            );
        }

        debug!(
            namespace,
            service_account,
            audiences = tokens.len(),
            "Issued service account tokens"
        );
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_wire_shape() {
        let token = ServiceAccountToken {
            token: "abc".to_string(),
            expiration_timestamp: "2030-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token"], "abc");
        assert_eq!(json["expirationTimestamp"], "2030-01-01T00:00:00Z");
    }

    #[test]
    fn test_debug_hides_token() {
        let token = ServiceAccountToken {
            token: "super-secret".to_string(),
            expiration_timestamp: "2030-01-01T00:00:00Z".to_string(),
        };
        assert!(!format!("{token:?}").contains("super-secret"));
    }
}
