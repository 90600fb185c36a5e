//! 路由配置模块

use axum::{
    Router,
    http::HeaderName,
    middleware,
    routing::{get, post, put},
};
use orders_shared::digest::RESPONSE_DIGEST_HEADER;
use orders_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};

use crate::{handlers, state::AppState};

/// 订单路由
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(handlers::order::create_order))
        .route("/orders", get(handlers::order::list_orders))
        .route("/orders/{id}", get(handlers::order::get_order))
        .route("/orders/{id}/status", put(handlers::order::update_status))
}

/// 构建完整应用路由（含探针与可观测性中间件）
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(order_routes())
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .layer(cors_layer())
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// 浏览器端需要能读到事件摘要头
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(RESPONSE_DIGEST_HEADER)])
}
