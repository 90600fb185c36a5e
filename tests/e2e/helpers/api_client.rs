//! REST API 客户端
//!
//! 封装对 orders-api 的 HTTP 调用，同时保留状态码和事件摘要头。

use anyhow::Result;
use orders_shared::digest::RESPONSE_DIGEST_HEADER;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;

/// 一次调用的结果
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// 变更接口返回的事件摘要
    pub digest: Option<String>,
    pub body: Value,
}

impl ApiResponse {
    /// 响应体中的订单 ID
    pub fn order_id(&self) -> Option<&str> {
        self.body["id"].as_str()
    }

    pub fn error_code(&self) -> Option<&str> {
        self.body["code"].as_str()
    }
}

/// API 客户端
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========== 订单 API ==========

    /// 创建订单
    pub async fn create_order(&self, customer: &str, items: &[&str]) -> Result<ApiResponse> {
        self.post("/orders", &json!({ "customer": customer, "items": items }))
            .await
    }

    /// 更新订单状态
    pub async fn update_status(&self, id: &str, status: &str) -> Result<ApiResponse> {
        self.put(
            &format!("/orders/{id}/status"),
            &json!({ "status": status }),
        )
        .await
    }

    /// 获取单个订单
    pub async fn get_order(&self, id: &str) -> Result<ApiResponse> {
        self.get(&format!("/orders/{id}")).await
    }

    /// 获取订单列表
    pub async fn list_orders(&self, query: &[(&str, &str)]) -> Result<ApiResponse> {
        let resp = self
            .client
            .get(self.url("/orders"))
            .query(query)
            .send()
            .await?;
        Self::capture(resp).await
    }

    /// 健康检查
    pub async fn health(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Ok(resp.status().is_success())
    }

    // ========== 基础方法 ==========

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<ApiResponse> {
        let resp = self.client.get(self.url(path)).send().await?;
        Self::capture(resp).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        Self::capture(resp).await
    }

    async fn put<T: Serialize>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        let resp = self.client.put(self.url(path)).json(body).send().await?;
        Self::capture(resp).await
    }

    async fn capture(resp: Response) -> Result<ApiResponse> {
        let status = resp.status();
        let digest = resp
            .headers()
            .get(RESPONSE_DIGEST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ApiResponse {
            status,
            digest,
            body,
        })
    }
}
