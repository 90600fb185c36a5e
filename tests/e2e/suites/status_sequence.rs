//! 状态更新测试套件
//!
//! 同一订单的连续更新各自产生事件，并按发送顺序被观察到。

#[cfg(test)]
mod tests {
    use crate::helpers::{assert_event_fields, assert_record_digest};
    use crate::setup::TestEnvironment;
    use crate::suites::unique_customer;
    use orders_shared::events::EventKind;
    use reqwest::StatusCode;

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_consecutive_updates_observed_in_order() {
        let mut env = TestEnvironment::setup().await.unwrap();
        let created = env
            .api
            .create_order(&unique_customer("initech"), &["sku1"])
            .await
            .unwrap();
        assert_eq!(created.status, StatusCode::CREATED);
        let id = created.order_id().unwrap().to_string();

        let packed = env.api.update_status(&id, "PACKED").await.unwrap();
        assert_eq!(packed.status, StatusCode::OK);
        let shipped = env.api.update_status(&id, "SHIPPED").await.unwrap();
        assert_eq!(shipped.status, StatusCode::OK);
        assert_eq!(shipped.body["status"], "SHIPPED");

        let timeout = env.config.event_timeout;
        let first = env
            .events
            .await_event(EventKind::OrderStatusUpdated, &id, None, timeout)
            .await
            .unwrap();
        let second = env
            .events
            .await_event(EventKind::OrderStatusUpdated, &id, None, timeout)
            .await
            .unwrap();

        assert_event_fields(&first, &id, "PACKED");
        assert_record_digest(&first, packed.digest.as_deref().unwrap());
        assert_event_fields(&second, &id, "SHIPPED");
        assert_record_digest(&second, shipped.digest.as_deref().unwrap());
        assert_eq!(first.partition, second.partition);
        assert!(first.offset < second.offset);

        // 每次更新恰好一条事件
        env.events
            .ensure_absent(EventKind::OrderStatusUpdated, &id, std::time::Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(env.db.order_status(&id).await.unwrap().as_deref(), Some("SHIPPED"));
        env.teardown().await;
    }
}
