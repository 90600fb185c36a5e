//! 测试辅助工具模块
//!
//! 提供 API 客户端、摘要断言和数据库验证。

mod api_client;
mod assertions;
mod db_verifier;

pub use api_client::*;
pub use assertions::*;
pub use db_verifier::*;
