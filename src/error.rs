//! # Error Handling
//!
//! Domain error taxonomy for the provisioning saga and approval cascade,
//! plus the unified problem+json response format with trace ID propagation.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::telemetry;

/// Errors surfaced by the core orchestrators and repositories.
///
/// Retry guidance per variant: validation errors are safe to retry after
/// fixing input; conflicts are not retryable as-is; unavailability is
/// retryable with backoff; invalid-state means the caller holds a stale view
/// and should refresh. Compensation failures are deliberately absent here;
/// they are logged with context and never replace the primary error.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Bad input, no side effect. `code` is the machine-readable kind
    /// (e.g. `INVALID_CATEGORIES`, `MISSING_FIELDS`, `INVALID_EMAIL`).
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
        details: serde_json::Value,
    },

    /// An identity with this email already exists upstream.
    #[error("identity already registered for this email")]
    DuplicateIdentity,

    /// The identity is already linked to a user record.
    #[error("identity is already linked to a user record")]
    AlreadyLinked,

    /// Neither linkage shape of the users table matched the live schema.
    #[error("users table is incompatible with both linkage shapes: {0}")]
    SchemaIncompatible(String),

    /// The identity provider could not be reached or failed internally.
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The relational store could not be reached or failed internally.
    #[error("data store unavailable: {0}")]
    StoreUnavailable(String),

    /// No application with this ID exists.
    #[error("application {0} not found")]
    ApplicationNotFound(Uuid),

    /// The application was already reviewed with a different outcome; the
    /// caller's view is stale.
    #[error("application {id} is already {status}")]
    InvalidState { id: Uuid, status: String },
}

impl DomainError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn validation_with_details(
        code: &'static str,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            details,
        }
    }

    /// Machine-readable kind carried in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { code, .. } => code,
            DomainError::DuplicateIdentity => "DUPLICATE_IDENTITY",
            DomainError::AlreadyLinked => "CONFLICT",
            DomainError::SchemaIncompatible(_) => "SCHEMA_INCOMPATIBLE",
            DomainError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            DomainError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            DomainError::ApplicationNotFound(_) => "NOT_FOUND",
            DomainError::InvalidState { .. } => "INVALID_STATE",
        }
    }
}

/// Classify a database error as a unique-constraint violation.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_UNIQUE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error.code().is_some_and(|code| {
        code.as_ref() == PG_UNIQUE || SQLITE_UNIQUE_CODES.contains(&code.as_ref())
    })
}

/// Classify a database error as an undefined-column schema mismatch, the
/// signature that drives the legacy linkage fallback. Distinct from data
/// conflicts: Postgres reports SQLSTATE 42703, SQLite only a message.
pub fn is_undefined_column(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNDEFINED_COLUMN: &str = "42703";

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error
        .code()
        .is_some_and(|code| code.as_ref() == PG_UNDEFINED_COLUMN)
    {
        return true;
    }

    let message = db_error.message().to_lowercase();
    message.contains("no such column") || message.contains("has no column named")
}

/// Map a database error onto the domain taxonomy for a given concern.
/// Conflicts are classified by the caller (the meaning of a unique violation
/// depends on which insert hit it); everything else is store trouble.
pub fn store_error(error: sea_orm::DbErr) -> DomainError {
    tracing::error!(?error, "database operation failed");
    DomainError::StoreUnavailable(error.to_string())
}

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(String::into_boxed_str)
            .or_else(|| {
                // Fallback correlation ID for basic client-server log correlation.
                Some(format!("corr-{}", &Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        let code = error.code();
        match error {
            DomainError::Validation {
                message, details, ..
            } => {
                let api = ApiError::new(StatusCode::BAD_REQUEST, code, message.as_str());
                if details.is_null() {
                    api
                } else {
                    api.with_details(details)
                }
            }
            DomainError::DuplicateIdentity | DomainError::AlreadyLinked => {
                ApiError::new(StatusCode::CONFLICT, code, error.to_string().as_str())
            }
            DomainError::SchemaIncompatible(_) => {
                // Operator action needed; details stay in the logs.
                tracing::error!(%error, "linkage schema mismatch");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    "User storage schema is incompatible; contact the operator",
                )
            }
            DomainError::ProviderUnavailable(_) => {
                ApiError::new(StatusCode::BAD_GATEWAY, code, error.to_string().as_str())
                    .with_retry_after(30)
            }
            DomainError::StoreUnavailable(_) => {
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    code,
                    error.to_string().as_str(),
                )
                .with_retry_after(30)
            }
            DomainError::ApplicationNotFound(id) => {
                ApiError::new(StatusCode::NOT_FOUND, code, "Application not found")
                    .with_details(json!({ "application_id": id.to_string() }))
            }
            DomainError::InvalidState { id, status } => ApiError::new(
                StatusCode::CONFLICT,
                code,
                "Application was already reviewed; refresh and re-decide",
            )
            .with_details(json!({ "application_id": id.to_string(), "status": status })),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message.as_str())
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn api_error_carries_code_and_message() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Bad request");

        assert_eq!(error.code, Box::from("VALIDATION_FAILED"));
        assert_eq!(error.message, Box::from("Bad request"));
        assert!(error.details.is_none());
        assert!(error.retry_after.is_none());
        assert!(error.trace_id.is_some());
    }

    #[test]
    fn problem_json_content_type() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "Bad request");
        let response = error.into_response();

        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
    }

    #[test]
    fn validation_maps_to_400_with_details() {
        let error = DomainError::validation_with_details(
            "INVALID_CATEGORIES",
            "Category set must not be empty",
            json!({ "field": "categories" }),
        );
        let api: ApiError = error.into();

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, Box::from("INVALID_CATEGORIES"));
        assert_eq!(api.details, Some(Box::new(json!({ "field": "categories" }))));
    }

    #[test]
    fn duplicate_identity_maps_to_conflict() {
        let api: ApiError = DomainError::DuplicateIdentity.into();
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, Box::from("DUPLICATE_IDENTITY"));
    }

    #[test]
    fn invalid_state_maps_to_conflict_with_status_details() {
        let id = Uuid::new_v4();
        let api: ApiError = DomainError::InvalidState {
            id,
            status: "approved".to_string(),
        }
        .into();

        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, Box::from("INVALID_STATE"));
        let details = api.details.unwrap();
        assert_eq!(details["status"], "approved");
        assert_eq!(details["application_id"], id.to_string());
    }

    #[test]
    fn provider_unavailable_suggests_retry() {
        let api: ApiError = DomainError::ProviderUnavailable("connect timeout".into()).into();
        assert_eq!(api.status, StatusCode::BAD_GATEWAY);
        assert_eq!(api.retry_after, Some(30));

        let response = api.into_response();
        assert_eq!(response.headers().get("retry-after").unwrap(), "30");
    }

    #[test]
    fn not_found_carries_application_id() {
        let id = Uuid::new_v4();
        let api: ApiError = DomainError::ApplicationNotFound(id).into();
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(
            api.details.unwrap()["application_id"],
            id.to_string()
        );
    }

    #[test]
    fn schema_incompatible_hides_internals() {
        let api: ApiError = DomainError::SchemaIncompatible("both inserts failed".into()).into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, Box::from("SCHEMA_INCOMPATIBLE"));
        assert!(!api.message.contains("insert"));
    }

    #[test]
    fn non_sqlx_errors_are_not_classified() {
        let err = sea_orm::DbErr::RecordNotFound("users".to_string());
        assert!(!is_unique_violation(&err));
        assert!(!is_undefined_column(&err));
    }
}
