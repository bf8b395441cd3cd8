//! # Server Configuration
//!
//! This module contains the server setup and configuration for the
//! marketplace accounts API.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    middleware::Next,
    response::Response,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers;
use crate::identity::IdentityProvider;
use crate::notify::Notifier;
use crate::telemetry::{TraceContext, with_trace_context};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub identity: Arc<dyn IdentityProvider>,
    pub notifier: Arc<dyn Notifier>,
}

#[cfg(test)]
impl AppState {
    /// State with a disconnected database, for middleware-only tests.
    pub fn for_tests(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            db: DatabaseConnection::default(),
            identity: Arc::new(crate::identity::memory::InMemoryIdentityProvider::new()),
            notifier: Arc::new(crate::notify::default::LogNotifier),
        }
    }

    /// State backed by a migrated in-memory database.
    pub async fn for_tests_with_db() -> Self {
        use migration::{Migrator, MigratorTrait};

        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        Self {
            config: Arc::new(AppConfig {
                admin_tokens: vec!["test-admin-token".to_string()],
                ..Default::default()
            }),
            db,
            identity: Arc::new(crate::identity::memory::InMemoryIdentityProvider::new()),
            notifier: Arc::new(crate::notify::default::LogNotifier),
        }
    }
}

/// Assigns each request a correlation ID, available to error responses
/// through the task-local trace context.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let trace_id = format!("req-{}", Uuid::new_v4().simple());
    let context = TraceContext {
        trace_id: trace_id.clone(),
    };

    let mut request = request;
    request.extensions_mut().insert(context.clone());

    with_trace_context(context, next.run(request)).await
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/v1/applications/{id}/review",
            post(handlers::review::review_application),
        )
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/vendor-accounts",
            post(handlers::accounts::provision_account),
        )
        .merge(admin_routes)
        .layer(axum::middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: Arc<AppConfig>,
    db: DatabaseConnection,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let state = AppState {
        config: Arc::clone(&config),
        db,
        identity,
        notifier,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::accounts::provision_account,
        crate::handlers::review::review_application,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::accounts::BusinessPayload,
            crate::handlers::accounts::ProvisionAccountRequest,
            crate::handlers::accounts::ProvisionAccountResponse,
            crate::handlers::review::ReviewDecision,
            crate::handlers::review::ReviewApplicationRequest,
            crate::handlers::review::ReviewApplicationResponse,
        )
    ),
    info(
        title = "Marketplace Accounts API",
        description = "Vendor account provisioning and application review",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
