//! GoTrue-style HTTP identity provider.
//!
//! Talks to the hosted auth backend's admin API with a service-role key.
//! Every call carries a bounded timeout; a timeout is reported as
//! [`IdentityError::Unavailable`] and handled by the caller like any other
//! step failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::{IdentityError, IdentityProvider, IdentityUpdate, NewIdentity};
use crate::config::AppConfig;

/// HTTP client for the identity admin API.
pub struct GoTrueIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Debug, Deserialize)]
struct AdminUserResponse {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct AdminErrorResponse {
    #[serde(default, alias = "msg", alias = "message")]
    error_description: String,
}

impl GoTrueIdentityProvider {
    /// Build a provider from configuration. Fails when the base URL or
    /// service key is missing.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let base_url = config
            .identity_base_url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("MARKET_IDENTITY_BASE_URL is not set"))?;
        let service_key = config
            .identity_service_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("MARKET_IDENTITY_SERVICE_KEY is not set"))?;

        Ok(Self::new(
            base_url,
            service_key,
            Duration::from_millis(config.identity_timeout_ms),
        ))
    }

    pub fn new(base_url: String, service_key: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    fn admin_users_url(&self) -> String {
        format!("{}/admin/users", self.base_url)
    }

    fn admin_user_url(&self, id: Uuid) -> String {
        format!("{}/admin/users/{}", self.base_url, id)
    }

    async fn error_details(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response
            .json::<AdminErrorResponse>()
            .await
            .map(|e| e.error_description)
            .unwrap_or_default();
        format!("identity admin API returned {}: {}", status, body)
    }
}

fn transport_error(err: reqwest::Error) -> IdentityError {
    IdentityError::Unavailable {
        details: if err.is_timeout() {
            "identity admin API timed out".to_string()
        } else {
            format!("identity admin API unreachable: {}", err)
        },
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentityProvider {
    async fn create(&self, identity: NewIdentity) -> Result<Uuid, IdentityError> {
        let response = self
            .client
            .post(self.admin_users_url())
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({
                "email": identity.email,
                "password": identity.password,
                "email_confirm": true,
                "user_metadata": identity.metadata,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let user: AdminUserResponse =
                    response.json().await.map_err(|err| IdentityError::Unavailable {
                        details: format!("malformed identity admin response: {}", err),
                    })?;
                Ok(user.id)
            }
            // GoTrue reports an existing email as 422; some deployments use 409.
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
                Err(IdentityError::Duplicate)
            }
            _ => Err(IdentityError::Unavailable {
                details: Self::error_details(response).await,
            }),
        }
    }

    async fn delete(&self, identity_id: Uuid) -> Result<(), IdentityError> {
        let response = self
            .client
            .delete(self.admin_user_url(identity_id))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Idempotent: the identity is already gone.
            StatusCode::NOT_FOUND => Ok(()),
            _ => Err(IdentityError::Unavailable {
                details: Self::error_details(response).await,
            }),
        }
    }

    async fn update(&self, identity_id: Uuid, update: IdentityUpdate) -> Result<(), IdentityError> {
        let response = self
            .client
            .put(self.admin_user_url(identity_id))
            .bearer_auth(&self.service_key)
            .json(&update)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(IdentityError::Unavailable {
                details: Self::error_details(response).await,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> GoTrueIdentityProvider {
        GoTrueIdentityProvider::new(
            server.uri(),
            "service-key".to_string(),
            Duration::from_secs(2),
        )
    }

    fn new_identity() -> NewIdentity {
        NewIdentity {
            email: "vendor@example.com".to_string(),
            password: "hunter2hunter2".to_string(),
            metadata: json!({ "role_at_signup": "registered" }),
        }
    }

    #[tokio::test]
    async fn create_returns_upstream_id() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/admin/users"))
            .and(bearer_token("service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
            .expect(1)
            .mount(&server)
            .await;

        let created = provider(&server).create(new_identity()).await.unwrap();
        assert_eq!(created, id);
    }

    #[tokio::test]
    async fn create_maps_422_to_duplicate() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/users"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({ "msg": "A user with this email address has already been registered" })),
            )
            .mount(&server)
            .await;

        let result = provider(&server).create(new_identity()).await;
        assert_eq!(result, Err(IdentityError::Duplicate));
    }

    #[tokio::test]
    async fn create_maps_5xx_to_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/users"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = provider(&server).create(new_identity()).await;
        assert!(matches!(result, Err(IdentityError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn delete_is_idempotent_on_404() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("DELETE"))
            .and(path(format!("/admin/users/{}", id)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(provider(&server).delete(id).await.is_ok());
    }

    #[tokio::test]
    async fn delete_succeeds_on_204() {
        let server = MockServer::start().await;
        let id = Uuid::new_v4();

        Mock::given(method("DELETE"))
            .and(path(format!("/admin/users/{}", id)))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        assert!(provider(&server).delete(id).await.is_ok());
    }

    #[tokio::test]
    async fn slow_backend_times_out_as_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/admin/users"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": Uuid::new_v4() }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let provider = GoTrueIdentityProvider::new(
            server.uri(),
            "service-key".to_string(),
            Duration::from_millis(100),
        );

        let result = provider.create(new_identity()).await;
        assert!(matches!(result, Err(IdentityError::Unavailable { .. })));
    }
}
