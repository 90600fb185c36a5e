//! 订单 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use orders_shared::digest::RESPONSE_DIGEST_HEADER;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{CreateOrderRequest, ListOrdersQuery, OrderListResponse, UpdateStatusRequest},
    error::{ApiError, Result},
    models::Order,
    service::MutationOutcome,
    state::AppState,
};

/// 解析 JSON 请求体，格式错误统一映射为 400
fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()))
}

/// 在响应头中回传已发布事件的摘要
fn digest_headers(outcome: &MutationOutcome) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&outcome.digest)
        .map_err(|e| ApiError::Internal(format!("摘要无法写入响应头: {e}")))?;
    headers.insert(RESPONSE_DIGEST_HEADER, value);
    Ok(headers)
}

/// 创建订单
///
/// POST /orders
pub async fn create_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = parse_body(payload)?;
    req.validate()?;

    let outcome = state.orders.create_order(&req.customer, &req.items).await?;
    let headers = digest_headers(&outcome)?;

    info!(order_id = %outcome.order.id, "订单已创建");
    Ok((StatusCode::CREATED, headers, Json(outcome.order)))
}

/// 订单列表
///
/// GET /orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>> {
    let filter = query.into_filter();
    let items = state.orders.list_orders(&filter).await?;
    Ok(Json(OrderListResponse::new(items, filter.limit, filter.offset)))
}

/// 订单详情
///
/// GET /orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let order = state.orders.get_order(&id).await?;
    Ok(Json(order))
}

/// 更新订单状态
///
/// PUT /orders/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let req = parse_body(payload)?;
    req.validate()?;

    let outcome = state.orders.update_status(&id, &req.status).await?;
    let headers = digest_headers(&outcome)?;

    info!(order_id = %id, status = %outcome.order.status, "订单状态已更新");
    Ok((StatusCode::OK, headers, Json(outcome.order)))
}
