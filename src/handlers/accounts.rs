//! # Vendor Account Handlers
//!
//! HTTP surface of the provisioning saga: a single endpoint that creates the
//! external identity, links the user record, and stores a pending vendor
//! application, or rolls all of it back.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::provisioning::{ProvisionRequest, ProvisioningSaga};
use crate::repositories::BusinessInfo;
use crate::server::AppState;

/// Business details for a vendor application
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BusinessPayload {
    pub business_name: String,
    pub business_description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub website: Option<String>,
    /// Free-form verification data (registration numbers, documents, ...)
    pub verification_data: Option<serde_json::Value>,
}

impl From<BusinessPayload> for BusinessInfo {
    fn from(payload: BusinessPayload) -> Self {
        BusinessInfo {
            business_name: payload.business_name,
            business_description: payload.business_description,
            contact_email: payload.contact_email,
            contact_phone: payload.contact_phone,
            address: payload.address,
            website: payload.website,
            verification_data: payload.verification_data,
        }
    }
}

/// Request body for vendor account provisioning
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProvisionAccountRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: Option<String>,
    /// Requested category slugs (property, food, store, project)
    pub categories: Vec<String>,
    pub business: BusinessPayload,
}

/// Response for a successfully provisioned vendor account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProvisionAccountResponse {
    #[schema(value_type = String)]
    pub identity_id: Uuid,
    #[schema(value_type = String)]
    pub user_id: Uuid,
    #[schema(value_type = String)]
    pub application_id: Uuid,
    /// Review status of the stored application (always "pending" here)
    pub status: String,
}

/// Provisions a vendor account: identity, user record, pending application
#[utoipa::path(
    post,
    path = "/api/v1/vendor-accounts",
    request_body = ProvisionAccountRequest,
    responses(
        (status = 201, description = "Account provisioned, application pending review", body = ProvisionAccountResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
        (status = 502, description = "Identity provider unavailable", body = ApiError),
        (status = 503, description = "Datastore unavailable", body = ApiError)
    ),
    tag = "accounts"
)]
pub async fn provision_account(
    State(state): State<AppState>,
    Json(body): Json<ProvisionAccountRequest>,
) -> Result<(StatusCode, Json<ProvisionAccountResponse>), ApiError> {
    let saga = ProvisioningSaga::new(
        state.db.clone(),
        state.identity.clone(),
        state.notifier.clone(),
    );

    let outcome = saga
        .execute(ProvisionRequest {
            email: body.email,
            password: body.password,
            display_name: body.display_name,
            phone: body.phone,
            categories: body.categories,
            business: body.business.into(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ProvisionAccountResponse {
            identity_id: outcome.identity_id,
            user_id: outcome.user.id,
            application_id: outcome.application.id,
            status: "pending".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::create_app;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn send(state: AppState, payload: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = create_app(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/vendor-accounts")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    fn payload() -> serde_json::Value {
        serde_json::json!({
            "email": "vendor@example.test",
            "password": "hunter2hunter2",
            "display_name": "Vendor",
            "categories": ["food"],
            "business": {
                "business_name": "Tidal Goods",
                "business_description": "Coastal provisions",
                "contact_email": "owner@tidalgoods.test",
                "contact_phone": "+15550123",
                "address": "1 Harbor Way"
            }
        })
    }

    #[tokio::test]
    async fn provision_returns_created() {
        let state = AppState::for_tests_with_db().await;

        let (status, body) = send(state, payload()).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert!(body["identity_id"].is_string());
        assert!(body["application_id"].is_string());
    }

    #[tokio::test]
    async fn invalid_categories_return_400() {
        let state = AppState::for_tests_with_db().await;

        let mut bad = payload();
        bad["categories"] = serde_json::json!([]);

        let (status, body) = send(state, bad).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_CATEGORIES");
    }

    #[tokio::test]
    async fn duplicate_email_returns_409() {
        let state = AppState::for_tests_with_db().await;

        let (first, _) = send(state.clone(), payload()).await;
        assert_eq!(first, StatusCode::CREATED);

        let (second, body) = send(state, payload()).await;
        assert_eq!(second, StatusCode::CONFLICT);
        assert_eq!(body["code"], "DUPLICATE_IDENTITY");
    }

    #[tokio::test]
    async fn malformed_contact_email_returns_400_and_compensates() {
        let state = AppState::for_tests_with_db().await;

        let mut bad = payload();
        bad["business"]["contact_email"] = serde_json::json!("not-an-email");

        let (status, body) = send(state.clone(), bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_EMAIL");

        // The saga unwound, so the email is free to use again.
        let (retry, _) = send(state, payload()).await;
        assert_eq!(retry, StatusCode::CREATED);
    }
}
