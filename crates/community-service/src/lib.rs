//! 社区服务
//!
//! 社交信息流与祷告墙、内容审核工作流、导师私聊、私密日记与
//! 心情打卡、捐赠记录。全部状态在内存中，重启即重置。
//!
//! # 模块
//!
//! - `posts`: 帖子（祷告 / 讨论 / 挑战 / 肯定语）+ 点赞 / 举报 / 评论 + 审核队列
//! - `chat`: 导师与青少年之间的私聊
//! - `journal`: 私密日记、心情打卡（触发鼓励通知）、紧急求助
//! - `donations`: 捐赠记录与汇总
//! - `stats`: 管理端运营统计

pub mod chat;
pub mod donations;
pub mod journal;
pub mod models;
pub mod posts;
pub mod state;
pub mod stats;

use std::sync::Arc;

use axum::Router;

pub use state::CommunityState;

/// 构建社区服务的完整路由
pub fn routes() -> Router<Arc<CommunityState>> {
    Router::new()
        .merge(posts::post_routes())
        .merge(chat::chat_routes())
        .merge(journal::journal_routes())
        .merge(donations::donation_routes())
        .merge(stats::stats_routes())
}
