//! # Application Review Handlers
//!
//! Admin-only endpoint that decides a pending vendor application. The route
//! sits behind the bearer-auth middleware; the handler itself only carries
//! the decision into the approval orchestrator.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::approval::{ApprovalOrchestrator, Decision};
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::models::vendor_application::ApplicationStatus;
use crate::server::AppState;

/// Review decision payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl From<ReviewDecision> for Decision {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approve => Decision::Approve,
            ReviewDecision::Reject => Decision::Reject,
        }
    }
}

/// Request body for reviewing an application
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewApplicationRequest {
    pub decision: ReviewDecision,
    /// Identity of the reviewing admin, recorded on the application
    #[schema(value_type = String)]
    pub reviewer_id: Uuid,
    pub admin_notes: Option<String>,
}

/// Response for a reviewed application
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewApplicationResponse {
    #[schema(value_type = String)]
    pub application_id: Uuid,
    pub status: ApplicationStatus,
    /// False when this call replayed a decision already applied
    pub transitioned: bool,
}

/// Reviews a pending vendor application (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/applications/{id}/review",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Application ID")
    ),
    request_body = ReviewApplicationRequest,
    responses(
        (status = 200, description = "Application reviewed", body = ReviewApplicationResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "Application not found", body = ApiError),
        (status = 409, description = "Application already decided differently", body = ApiError)
    ),
    tag = "admin"
)]
pub async fn review_application(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(application_id): Path<Uuid>,
    Json(body): Json<ReviewApplicationRequest>,
) -> Result<Json<ReviewApplicationResponse>, ApiError> {
    let orchestrator = ApprovalOrchestrator::new(state.db.clone(), state.notifier.clone());

    let outcome = orchestrator
        .review(
            application_id,
            body.decision.into(),
            body.reviewer_id,
            body.admin_notes,
        )
        .await?;

    Ok(Json(ReviewApplicationResponse {
        application_id,
        status: outcome.application.status,
        transitioned: outcome.transitioned,
    }))
}
