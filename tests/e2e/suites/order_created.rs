//! 创建订单测试套件
//!
//! 创建订单后，事件流上应出现摘要与响应头一致的 OrderCreated 事件。

#[cfg(test)]
mod tests {
    use crate::helpers::{assert_event_fields, assert_record_digest};
    use crate::setup::TestEnvironment;
    use crate::suites::unique_customer;
    use orders_shared::events::EventKind;
    use reqwest::StatusCode;

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_create_order_publishes_matching_event() {
        let mut env = TestEnvironment::setup().await.unwrap();
        let customer = unique_customer("acme");

        let resp = env
            .api
            .create_order(&customer, &["sku1", "sku2"])
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
        assert_eq!(resp.body["status"], "OPEN");
        assert_eq!(resp.body["items"], serde_json::json!(["sku1", "sku2"]));

        let id = resp.order_id().expect("响应缺少订单 ID").to_string();
        let digest = resp.digest.clone().expect("响应缺少事件摘要头");

        let record = env
            .events
            .await_event(
                EventKind::OrderCreated,
                &id,
                Some(&digest),
                env.config.event_timeout,
            )
            .await
            .unwrap();
        assert_record_digest(&record, &digest);
        assert_event_fields(&record, &id, "OPEN");
        assert_eq!(record.key.as_deref(), Some(id.as_str()));

        let decoded = record.decoded.as_ref().unwrap();
        assert_eq!(decoded["customer"], customer);
        assert_eq!(decoded["items"], serde_json::json!(["sku1", "sku2"]));

        env.teardown().await;
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_created_order_round_trip() {
        let env = TestEnvironment::setup().await.unwrap();
        let customer = unique_customer("globex");

        let created = env
            .api
            .create_order(&customer, &["sku3", "sku1", "sku2"])
            .await
            .unwrap();
        let id = created.order_id().unwrap().to_string();

        let fetched = env.api.get_order(&id).await.unwrap();
        assert_eq!(fetched.status, StatusCode::OK);
        assert_eq!(fetched.body["status"], "OPEN");
        assert_eq!(
            fetched.body["items"],
            serde_json::json!(["sku3", "sku1", "sku2"])
        );
        assert_eq!(fetched.body["createdAt"], fetched.body["updatedAt"]);

        let listed = env
            .api
            .list_orders(&[("customer", customer.as_str())])
            .await
            .unwrap();
        assert_eq!(listed.status, StatusCode::OK);
        assert_eq!(listed.body["count"], 1);
        assert_eq!(listed.body["items"][0]["id"], id.as_str());

        assert!(env.db.order_exists(&id).await.unwrap());
        env.teardown().await;
    }

    #[tokio::test]
    #[ignore = "需要运行服务"]
    async fn test_invalid_create_has_no_side_effects() {
        let mut env = TestEnvironment::setup().await.unwrap();
        // 超过 customer 长度上限，前缀保证在并行用例之间唯一
        let customer = format!("{}-{}", unique_customer("oversize"), "x".repeat(256));

        let resp = env.api.create_order(&customer, &["sku1"]).await.unwrap();
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_code(), Some("VALIDATION_ERROR"));
        assert!(resp.digest.is_none());

        // 事件流与其他用例共享，只检查本用例的 customer 没有出现
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        let leaked: Vec<_> = env
            .events
            .drain_records()
            .into_iter()
            .filter(|r| {
                r.decoded
                    .as_ref()
                    .and_then(|v| v.get("customer"))
                    .and_then(|c| c.as_str())
                    == Some(customer.as_str())
            })
            .map(|r| r.offset)
            .collect();
        assert!(leaked.is_empty(), "校验失败的请求产生了事件: offsets={leaked:?}");
        env.teardown().await;
    }
}
