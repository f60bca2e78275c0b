use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method},
    response::Json,
    routing::get,
    serve, Router,
};
use bomgraph_database::{initialize_database, PgBomStore, PostgresPool};
use bomgraph_engine::BomEngine;
use bomgraph_utils::{init_logging, AppConfig};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

mod error;
mod handlers;
mod metrics;
mod middleware;
mod routes;


use metrics::ApiMetrics;
use middleware::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|_| {
        eprintln!("Failed to load configuration, using defaults");
        AppConfig::default()
    });

    // Initialize logging
    init_logging(&config.logging)?;
    info!("Starting BOM Graph API");

    // Initialize database
    let postgres_pool = initialize_database(&config.database).await?;
    info!("Database connection established");

    let store = PgBomStore::new(postgres_pool.clone());
    let engine = BomEngine::new(Arc::new(store), config.engine.clone());
    let state = AppState::new(engine, config.clone(), Some(postgres_pool))?;

    // Build application router
    let app = create_app(state, &config);

    // Start server
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("BOM Graph API listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}

fn create_app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))

        // API routes
        .nest("/api/v1", routes::create_api_routes())

        // Middleware stack
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                )
                .layer(DefaultBodyLimit::max(config.server.max_request_size))
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(axum::middleware::from_fn(error_handling_middleware))
        )

        // Application state
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BomEngine>,
    pub metrics: Arc<ApiMetrics>,
    pub config: AppConfig,
    /// Absent when the engine runs over a non-PostgreSQL store.
    pub postgres_pool: Option<PostgresPool>,
}

impl AppState {
    pub fn new(engine: BomEngine, config: AppConfig, postgres_pool: Option<PostgresPool>) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(engine),
            metrics: Arc::new(ApiMetrics::new()?),
            config,
            postgres_pool,
        })
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "bomgraph-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
