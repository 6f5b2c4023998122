//! HURU Circle 服务端
//!
//! 把成长、社区、通知三个域的路由合并为一个 axum 应用，
//! 并提供测试数据播种。二进制入口在 `main.rs`。

pub mod app;
pub mod cli;
pub mod seed;

pub use app::{AppStates, build_app};
