//! 投递渠道与站内信箱
//!
//! `NotificationChannel` 是渠道抽象；当前唯一实现是站内信箱，
//! 把通知写入内存存储供客户端拉取。真实推送（APNs/FCM）是
//! 外部系统，不在本系统范围内。

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use huru_shared::error::{HuruError, Result};
use huru_shared::events::NotificationKind;
use huru_shared::store::MemoryStore;

use crate::NotificationState;

// ---------------------------------------------------------------------------
// NotificationRecord
// ---------------------------------------------------------------------------

/// 已渲染的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub sent_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        user_id: impl Into<String>,
        kind: NotificationKind,
        title: String,
        body: String,
    ) -> Self {
        Self {
            id: format!("NTF-{}", Uuid::now_v7()),
            user_id: user_id.into(),
            kind,
            title,
            body,
            is_read: false,
            sent_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationChannel — 渠道抽象
// ---------------------------------------------------------------------------

/// 投递渠道
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// 投递一条已渲染的通知
    async fn deliver(&self, record: &NotificationRecord) -> std::result::Result<(), String>;
}

/// 站内信箱渠道
///
/// 克隆共享同一底层存储，查询接口与投递路径看到同一份数据。
#[derive(Clone)]
pub struct InAppChannel {
    records: MemoryStore<NotificationRecord>,
}

impl InAppChannel {
    pub fn new() -> Self {
        Self {
            records: MemoryStore::new(),
        }
    }

    /// 用户的通知列表，最新在前
    pub fn user_notifications(&self, user_id: &str) -> Vec<NotificationRecord> {
        let mut records = self.records.list_by(|record| record.user_id == user_id);
        records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        records
    }

    /// 未读数量
    pub fn unread_count(&self, user_id: &str) -> usize {
        self.records
            .count_by(|record| record.user_id == user_id && !record.is_read)
    }

    /// 标记已读
    pub fn mark_read(&self, notification_id: &str) -> Result<NotificationRecord> {
        self.records
            .update(notification_id, |record| record.is_read = true)
            .ok_or_else(|| HuruError::not_found("Notification", notification_id))
    }
}

impl Default for InAppChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationChannel for InAppChannel {
    fn name(&self) -> &'static str {
        "in_app"
    }

    async fn deliver(&self, record: &NotificationRecord) -> std::result::Result<(), String> {
        self.records.insert(&record.id, record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NotificationSender — 多渠道分发
// ---------------------------------------------------------------------------

/// 多渠道分发器
///
/// 逐渠道投递；单渠道失败记录告警并继续，全部失败才算投递失败。
pub struct NotificationSender {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationSender {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    /// 投递到所有渠道，返回成功渠道数
    pub async fn deliver(&self, record: &NotificationRecord) -> std::result::Result<usize, String> {
        let mut delivered = 0;
        for channel in &self.channels {
            match channel.deliver(record).await {
                Ok(()) => delivered += 1,
                Err(error) => {
                    tracing::warn!(
                        channel = channel.name(),
                        notification_id = %record.id,
                        error = %error,
                        "渠道投递失败"
                    );
                }
            }
        }

        if delivered == 0 && !self.channels.is_empty() {
            return Err(format!("所有渠道投递失败: {}", record.id));
        }
        Ok(delivered)
    }
}

// ============================================================================
// 站内信箱查询路由
// ============================================================================

/// 通知列表响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationRecord>,
    pub total: usize,
    pub unread: usize,
}

/// 单条通知响应
#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub notification: NotificationRecord,
}

/// 构建站内信箱路由
pub fn inbox_routes() -> Router<Arc<NotificationState>> {
    Router::new()
        .route("/users/{user_id}/notifications", get(list_notifications))
        .route("/notifications/{notification_id}/read", post(mark_read))
}

/// 用户通知列表
#[tracing::instrument(skip(state))]
async fn list_notifications(
    State(state): State<Arc<NotificationState>>,
    Path(user_id): Path<String>,
) -> Json<NotificationListResponse> {
    let notifications = state.inbox.user_notifications(&user_id);
    let total = notifications.len();
    let unread = state.inbox.unread_count(&user_id);
    Json(NotificationListResponse {
        notifications,
        total,
        unread,
    })
}

/// 标记已读
#[tracing::instrument(skip(state))]
async fn mark_read(
    State(state): State<Arc<NotificationState>>,
    Path(notification_id): Path<String>,
) -> Result<Json<NotificationResponse>> {
    let notification = state.inbox.mark_read(&notification_id)?;
    Ok(Json(NotificationResponse { notification }))
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: &str) -> NotificationRecord {
        NotificationRecord::new(
            user_id,
            NotificationKind::Encouragement,
            "Encouragement 💝".to_string(),
            "Keep going!".to_string(),
        )
    }

    #[tokio::test]
    async fn test_in_app_channel_stores_and_queries() {
        let inbox = InAppChannel::new();

        inbox.deliver(&record("USR-1")).await.unwrap();
        inbox.deliver(&record("USR-1")).await.unwrap();
        inbox.deliver(&record("USR-2")).await.unwrap();

        let notifications = inbox.user_notifications("USR-1");
        assert_eq!(notifications.len(), 2);
        assert_eq!(inbox.unread_count("USR-1"), 2);

        inbox.mark_read(&notifications[0].id).unwrap();
        assert_eq!(inbox.unread_count("USR-1"), 1);
    }

    #[tokio::test]
    async fn test_clone_shares_storage() {
        let inbox = InAppChannel::new();
        let clone = inbox.clone();

        inbox.deliver(&record("USR-1")).await.unwrap();
        assert_eq!(clone.user_notifications("USR-1").len(), 1);
    }

    #[tokio::test]
    async fn test_sender_continues_on_channel_failure() {
        let mut failing = MockNotificationChannel::new();
        failing.expect_name().return_const("push");
        failing
            .expect_deliver()
            .returning(|_| Err("connection refused".to_string()));

        let inbox = InAppChannel::new();
        let sender = NotificationSender::new(vec![
            Arc::new(failing) as Arc<dyn NotificationChannel>,
            Arc::new(inbox.clone()),
        ]);

        // 推送渠道失败不影响站内信箱
        let delivered = sender.deliver(&record("USR-1")).await.unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(inbox.user_notifications("USR-1").len(), 1);
    }

    #[tokio::test]
    async fn test_sender_fails_when_all_channels_fail() {
        let mut failing = MockNotificationChannel::new();
        failing.expect_name().return_const("push");
        failing
            .expect_deliver()
            .returning(|_| Err("unavailable".to_string()));

        let sender = NotificationSender::new(vec![Arc::new(failing) as Arc<dyn NotificationChannel>]);
        assert!(sender.deliver(&record("USR-1")).await.is_err());
    }

    #[test]
    fn test_mark_read_unknown_id() {
        let inbox = InAppChannel::new();
        assert!(inbox.mark_read("NTF-missing").is_err());
    }
}
