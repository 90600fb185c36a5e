//! 未知订单测试套件
//!
//! 更新不存在的订单返回 404，且不发布任何事件。

#[cfg(test)]
mod tests {
    use crate::setup::TestEnvironment;
    use orders_shared::events::EventKind;
    use reqwest::StatusCode;

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_update_unknown_order_is_not_found() {
        let mut env = TestEnvironment::setup().await.unwrap();
        let id = uuid::Uuid::now_v7().to_string();

        let resp = env.api.update_status(&id, "PACKED").await.unwrap();
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.error_code(), Some("ORDER_NOT_FOUND"));
        assert!(resp.digest.is_none());

        env.events
            .ensure_absent(EventKind::OrderStatusUpdated, &id, env.config.event_timeout)
            .await
            .unwrap();
        assert!(!env.db.order_exists(&id).await.unwrap());

        let fetched = env.api.get_order(&id).await.unwrap();
        assert_eq!(fetched.status, StatusCode::NOT_FOUND);
        env.teardown().await;
    }
}
