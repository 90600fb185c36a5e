//! 断言工具
//!
//! 摘要在测试侧独立计算，不复用被测代码的实现。

use event_verifier::ConsumedRecord;
use sha2::{Digest, Sha256};

/// 对原始字节计算 SHA-256 十六进制摘要
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// 断言事件负载的摘要与响应头一致，且与消息头一致
pub fn assert_record_digest(record: &ConsumedRecord, response_digest: &str) {
    let observed = sha256_hex(&record.raw);
    assert_eq!(observed, response_digest, "事件负载摘要与响应头不一致");
    assert_eq!(
        record.digest_header(),
        Some(response_digest),
        "消息头中的摘要与响应头不一致"
    );
}

/// 断言事件负载的字段
pub fn assert_event_fields(record: &ConsumedRecord, id: &str, status: &str) {
    let decoded = record.decoded.as_ref().expect("事件负载应为 JSON");
    assert_eq!(decoded["id"], id);
    assert_eq!(decoded["status"], status);
    assert!(decoded["ts"].is_string(), "事件负载缺少 ts");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
