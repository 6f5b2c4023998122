//! 成长与奖励服务
//!
//! 积分账户的唯一持有者：所有余额变动（活动加分、兑换扣分、驳回退款）
//! 都经由本服务的账本路径完成，写入使用版本号乐观并发，防止同一
//! 用户的并发兑换双花。
//!
//! # 模块
//!
//! - `accounts`: 积分账户、等级状态、签到连击、徽章
//! - `catalog`: 奖品目录（管理员维护）
//! - `redemptions`: 兑换流程与审批队列
//! - `challenges`: 挑战（加入 / 完成加分）
//! - `events`: 社区活动（报名 / 出席加分）

pub mod accounts;
pub mod catalog;
pub mod challenges;
pub mod events;
pub mod models;
pub mod redemptions;
pub mod state;

use std::sync::Arc;

use axum::Router;

pub use state::ProgressState;

/// 构建成长服务的完整路由
pub fn routes() -> Router<Arc<ProgressState>> {
    Router::new()
        .merge(accounts::account_routes())
        .merge(catalog::catalog_routes())
        .merge(redemptions::redemption_routes())
        .merge(challenges::challenge_routes())
        .merge(events::event_routes())
}
