use axum::{extract::State, response::Json};
use bomgraph_database::postgres_health_check;
use serde_json::{json, Value};

use crate::AppState;

pub async fn detailed_health_check(State(state): State<AppState>) -> Json<Value> {
    let mut health_status = json!({
        "status": "healthy",
        "service": "bomgraph-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {}
    });

    // Check PostgreSQL
    let store_status = match &state.postgres_pool {
        Some(pool) => match postgres_health_check(pool).await {
            Ok(_) => json!({"status": "healthy", "message": "Connected"}),
            Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
        },
        None => json!({"status": "healthy", "message": "In-memory store"}),
    };
    let store_healthy = store_status["status"] == "healthy";
    health_status["checks"]["store"] = store_status;

    health_status["checks"]["engine"] = json!({
        "status": "healthy",
        "max_explosion_depth": state.engine.config().max_explosion_depth,
    });

    if !store_healthy {
        health_status["status"] = json!("degraded");
    }

    Json(health_status)
}
