//! 存活与就绪探针

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::state::AppState;

/// 存活探针
///
/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "orders-api" }))
}

/// 就绪探针：存储不可用时返回 503
///
/// GET /ready
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = state.orders.storage_ready().await;
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "service": "orders-api",
            "checks": { "database": if db_ok { "ok" } else { "fail" } }
        })),
    )
}
