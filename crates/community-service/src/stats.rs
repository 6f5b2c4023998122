//! 管理端运营统计
//!
//! 审核队列深度、被举报内容数与近 24 小时互动量的快照，
//! 供管理端总览页渲染。

use axum::{Json, Router, extract::State, routing::get};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::ModerationStatus;
use crate::state::CommunityState;

/// 运营统计快照
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_posts: usize,
    /// 待审帖子数
    pub moderation_queue: usize,
    /// 被举报过的内容数（帖子 + 私聊消息）
    pub flagged_content: usize,
    pub posts_last_24h: usize,
    pub comments_last_24h: usize,
    pub moods_last_24h: usize,
    pub total_donations_ksh: u64,
}

impl CommunityState {
    /// 汇总运营统计
    pub fn admin_stats(&self) -> AdminStats {
        let cutoff = Utc::now() - Duration::hours(24);

        let flagged_posts = self.posts.count_by(|post| post.flag_count > 0);
        let flagged_messages = self.messages.count_by(|message| message.is_flagged);

        let comments_last_24h = self
            .posts
            .list()
            .iter()
            .flat_map(|post| post.comments.iter())
            .filter(|comment| comment.timestamp >= cutoff)
            .count();

        AdminStats {
            total_posts: self.posts.count(),
            moderation_queue: self
                .posts
                .count_by(|post| post.moderation_status == ModerationStatus::Pending),
            flagged_content: flagged_posts + flagged_messages,
            posts_last_24h: self.posts.count_by(|post| post.timestamp >= cutoff),
            comments_last_24h,
            moods_last_24h: self.moods.count_by(|mood| mood.timestamp >= cutoff),
            total_donations_ksh: self.donation_total(),
        }
    }
}

/// 构建统计路由
pub fn stats_routes() -> Router<Arc<CommunityState>> {
    Router::new().route("/admin/stats", get(admin_stats))
}

/// 运营统计（管理员）
#[tracing::instrument(skip(state))]
async fn admin_stats(State(state): State<Arc<CommunityState>>) -> Json<AdminStats> {
    Json(state.admin_stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mood, PaymentMethod, PostKind};
    use huru_shared::events::EventBus;

    #[test]
    fn test_admin_stats_counts() {
        let (bus, _rx) = EventBus::channel(64);
        let state = CommunityState::with_defaults(bus);

        let approved = state
            .create_post(
                "USR-1".to_string(),
                "JohnD".to_string(),
                "post a".to_string(),
                PostKind::Discussion,
                vec![],
            )
            .unwrap();
        state.moderate_post(&approved.id, true).unwrap();
        state.flag_post(&approved.id).unwrap();

        state
            .create_post(
                "USR-2".to_string(),
                "SarahW".to_string(),
                "post b".to_string(),
                PostKind::Prayer,
                vec![],
            )
            .unwrap();

        state
            .comment_on_post(
                &approved.id,
                "USR-2".to_string(),
                "SarahW".to_string(),
                "nice".to_string(),
            )
            .unwrap();
        state
            .log_mood("USR-1".to_string(), Mood::Good, None, vec![])
            .unwrap();
        state
            .record_donation(None, 800, None, true, PaymentMethod::Mpesa, None)
            .unwrap();

        let stats = state.admin_stats();
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.moderation_queue, 1);
        assert_eq!(stats.flagged_content, 1);
        assert_eq!(stats.posts_last_24h, 2);
        assert_eq!(stats.comments_last_24h, 1);
        assert_eq!(stats.moods_last_24h, 1);
        assert_eq!(stats.total_donations_ksh, 800);
    }
}
