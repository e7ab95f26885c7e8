//! # Permission Control HTTP Server
//!
//! REST surface over the permission engine.
//!
//! ## Endpoints
//!
//! - `GET  /api/v1/health` - Service health
//! - `GET  /api/v1/permission-check?resourceId=..&userId=..&action=..`
//! - `GET  /api/v1/resource/policy?resourceId=..` - Fetch a policy document
//! - `POST /api/v1/resource/policy` - Create or replace a policy document
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `DATABASE_URL` - PostgreSQL connection string; without it the server
//!   runs on an in-memory store seeded with demo data
//! - `RUST_LOG` - Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use permctl_authz::{
    AuthzError, Builder, CheckOutcome, Document, MemoryStore, Permission, PermissionEngine,
    PlanType, PolicyInput, Project, ProjectMembership, ResourcePolicyDocument, Role, Store, Team,
    TeamMembership, User, Visibility,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    engine: Arc<PermissionEngine>,
    start_time: std::time::Instant,
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

/// Wraps engine errors for the HTTP boundary.
struct AppError(AuthzError);

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self.0 {
            AuthzError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.0.to_string())
            }
            AuthzError::NotFound { .. } => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.0.to_string())
            }
            // Store and internal failures stay opaque to the caller.
            AuthzError::Store(_) | AuthzError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred".to_string(),
            ),
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

/// Response when a policy is created or replaced
#[derive(Debug, Serialize)]
struct PolicyCreatedResponse {
    message: &'static str,
    #[serde(rename = "resourceId")]
    resource_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckParams {
    resource_id: String,
    user_id: String,
    action: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyParams {
    resource_id: String,
}

/// GET /api/v1/health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: permctl_authz::VERSION,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// GET /api/v1/permission-check
async fn check_permission(
    State(state): State<AppState>,
    Query(params): Query<CheckParams>,
) -> Result<Json<CheckOutcome>, AppError> {
    let action: Permission = params.action.parse()?;
    let outcome = state
        .engine
        .check(&params.resource_id, &params.user_id, action)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/resource/policy
async fn get_resource_policy(
    State(state): State<AppState>,
    Query(params): Query<PolicyParams>,
) -> Result<Json<ResourcePolicyDocument>, AppError> {
    let document = state.engine.get_resource_policy(&params.resource_id).await?;
    Ok(Json(document))
}

/// POST /api/v1/resource/policy
async fn create_resource_policy(
    State(state): State<AppState>,
    Json(input): Json<PolicyInput>,
) -> Result<(StatusCode, Json<PolicyCreatedResponse>), AppError> {
    // Caller identity is not authenticated here; simple-form documents
    // record "unknown" as the creator.
    let document = state.engine.put_resource_policy(input, None).await?;

    Ok((
        StatusCode::CREATED,
        Json(PolicyCreatedResponse {
            message: "Policy created successfully",
            resource_id: document.resource.resource_id,
        }),
    ))
}

/// Create the HTTP router with all endpoints
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/api/v1/health", get(health_check))
        .route("/api/v1/permission-check", get(check_permission))
        .route(
            "/api/v1/resource/policy",
            get(get_resource_policy).post(create_resource_policy),
        )
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
        .with_state(state)
}

/// Seed the in-memory store with a demo data set: one team and project,
/// a handful of users, and the canned default policies merged into one
/// document per resource.
async fn seed_demo_data(store: &MemoryStore) {
    store
        .insert_team(Team {
            id: "team1".to_string(),
            name: "Demo Team".to_string(),
            plan: PlanType::Pro,
        })
        .await;
    store
        .insert_project(Project {
            id: "proj1".to_string(),
            name: "Demo Project".to_string(),
            team_id: "team1".to_string(),
            visibility: Visibility::Private,
        })
        .await;

    for (id, name) in [
        ("creator1", "Casey Creator"),
        ("admin1", "Alex Admin"),
        ("viewer1", "Vic Viewer"),
    ] {
        store
            .insert_user(User {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                name: name.to_string(),
            })
            .await;
    }

    store
        .insert_team_membership(TeamMembership {
            user_id: "admin1".to_string(),
            team_id: "team1".to_string(),
            role: Role::Admin,
        })
        .await;
    store
        .insert_project_membership(ProjectMembership {
            user_id: "viewer1".to_string(),
            project_id: "proj1".to_string(),
            role: Role::Viewer,
        })
        .await;

    store
        .insert_document(Document {
            id: "doc1".to_string(),
            title: "Getting started".to_string(),
            project_id: "proj1".to_string(),
            creator_id: "creator1".to_string(),
            deleted_at: None,
            public_link_enabled: true,
        })
        .await;

    let builder = Builder::new();
    let urn = "urn:resource:team1:proj1:doc1";
    let defaults = [
        builder.create_creator_policy(urn, "creator1"),
        builder.create_team_admin_policy(urn, "creator1"),
        builder.create_public_view_policy(urn, "creator1"),
    ];
    let mut merged = None;
    for document in defaults {
        merged = Some(builder.merge_policies(merged, document));
    }
    if let Some(document) = merged {
        if let Err(e) = store.save_resource_policy(&document).await {
            tracing::error!(error = %e, "failed to seed demo policies");
        }
    }

    info!("in-memory store seeded with demo data (resource {urn})");
}

/// Pick the store backend from the environment.
async fn build_store() -> anyhow::Result<Arc<dyn Store>> {
    #[cfg(feature = "postgres")]
    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        info!("connecting to PostgreSQL store");
        let store = permctl_authz::PostgresStore::connect(&database_url).await?;
        store.run_migrations().await?;
        return Ok(Arc::new(store));
    }

    info!("DATABASE_URL not set; using in-memory store with demo data");
    let store = MemoryStore::new();
    seed_demo_data(&store).await;
    Ok(Arc::new(store))
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Permission Control Server v{}",
        permctl_authz::VERSION
    );

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let store = build_store().await?;
    let state = AppState {
        engine: Arc::new(PermissionEngine::new(store)),
        start_time: std::time::Instant::now(),
    };

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}
