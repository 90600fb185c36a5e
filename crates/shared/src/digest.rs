//! 事件负载摘要
//!
//! 对实际写入 Kafka 的字节计算 SHA-256，以小写十六进制作为传输头的值。
//! 生产端必须只序列化一次并复用同一份字节做摘要和发送，
//! 否则 map 键顺序等非规范化差异会导致消费端校验失败。

use sha2::{Digest, Sha256};

/// 携带负载摘要的 Kafka 头名称
///
/// 校验端按此名称读取，不要在调用处重复拼写。
pub const DIGEST_HEADER: &str = "x-sha256";

/// 携带事件类型的 Kafka 头名称
pub const EVENT_KIND_HEADER: &str = "x-event";

/// HTTP 响应中回传摘要的头名称
pub const RESPONSE_DIGEST_HEADER: &str = "x-event-sha256";

/// 计算负载字节的 SHA-256 摘要（64 位小写十六进制）
pub fn compute(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

/// 校验负载字节是否与期望摘要一致
///
/// 期望值来自带外渠道（HTTP 响应头），比较时忽略大小写和首尾空白。
pub fn verify(payload: &[u8], expected: &str) -> bool {
    compute(payload).eq_ignore_ascii_case(expected.trim())
}
