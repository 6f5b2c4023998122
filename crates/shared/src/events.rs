//! 事件模型与进程内事件总线
//!
//! 各业务服务产生的通知事件统一包装为 [`EventPayload`]，经由
//! [`EventBus`]（tokio mpsc 通道）送达通知 worker。系统全部状态
//! 均在内存中，事件管道同样不出进程。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// NotificationKind — 通知类型
// ---------------------------------------------------------------------------

/// 通知类型枚举
///
/// 每种类型归属一个偏好开关类别，worker 投递前按用户偏好过滤。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// 每日肯定语（早间定时推送）
    DailyAffirmation,
    /// 每日经文（晚间定时推送）
    DailyVerse,
    /// 自定义提醒
    Reminder,
    /// 基于心情打卡的鼓励消息
    Encouragement,
    /// 等级提升
    LevelUp,
    /// 兑换结果（提交 / 批准 / 驳回 / 发放）
    RedemptionUpdate,
    /// 挑战动态（加入 / 完成）
    ChallengeUpdate,
    /// 紧急求助回执
    EmergencyAlert,
}

/// 偏好开关类别
///
/// 与用户偏好中的四个开关一一对应；`Always` 类通知不受开关控制。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceClass {
    Affirmations,
    Reminders,
    Challenges,
    Encouragement,
    /// 事务性或安全相关通知，始终投递
    Always,
}

impl NotificationKind {
    /// 该通知类型受哪个偏好开关控制
    pub fn preference_class(&self) -> PreferenceClass {
        match self {
            Self::DailyAffirmation | Self::DailyVerse => PreferenceClass::Affirmations,
            Self::Reminder => PreferenceClass::Reminders,
            Self::ChallengeUpdate => PreferenceClass::Challenges,
            Self::Encouragement | Self::LevelUp => PreferenceClass::Encouragement,
            // 兑换结果与紧急回执属于事务性通知，不允许关闭
            Self::RedemptionUpdate | Self::EmergencyAlert => PreferenceClass::Always,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 与 serde 的 SCREAMING_SNAKE_CASE 保持一致，便于日志与记录统一引用
        let s = match self {
            Self::DailyAffirmation => "DAILY_AFFIRMATION",
            Self::DailyVerse => "DAILY_VERSE",
            Self::Reminder => "REMINDER",
            Self::Encouragement => "ENCOURAGEMENT",
            Self::LevelUp => "LEVEL_UP",
            Self::RedemptionUpdate => "REDEMPTION_UPDATE",
            Self::ChallengeUpdate => "CHALLENGE_UPDATE",
            Self::EmergencyAlert => "EMERGENCY_ALERT",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// EventPayload — 通用事件信封
// ---------------------------------------------------------------------------

/// 通用事件信封
///
/// `event_id` 使用 UUID v7，时间有序，按 id 排序即时间顺序；
/// `data` 以 JSON 承载不同事件类型的业务字段，避免为每种事件
/// 定义独立消息结构。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub event_id: String,
    pub kind: NotificationKind,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
    /// 事件来源服务
    pub source: String,
}

impl EventPayload {
    /// 构建新事件，自动生成 event_id 并记录当前时间
    pub fn new(
        kind: NotificationKind,
        user_id: impl Into<String>,
        data: serde_json::Value,
        source: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            kind,
            user_id: user_id.into(),
            timestamp: Utc::now(),
            data,
            source: source.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus — 进程内事件总线
// ---------------------------------------------------------------------------

/// 进程内事件总线（发送端）
///
/// 有界通道。通知属于尽力而为的旁路输出：通道满或 worker 已退出时
/// 丢弃事件并记录告警，绝不反压或阻塞业务写路径。
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::Sender<EventPayload>,
}

impl EventBus {
    /// 创建总线，返回发送端与 worker 消费的接收端
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EventPayload>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// 发布事件
    pub fn publish(&self, event: EventPayload) {
        let kind = event.kind;
        let user_id = event.user_id.clone();
        match self.tx.try_send(event) {
            Ok(()) => {
                tracing::debug!(kind = %kind, user_id = %user_id, "事件已发布");
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(kind = %kind, user_id = %user_id, "事件通道已满，事件被丢弃");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(kind = %kind, user_id = %user_id, "通知 worker 已退出，事件被丢弃");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_payload_new() {
        let event = EventPayload::new(
            NotificationKind::LevelUp,
            "USR-001",
            json!({ "tier": "Builder" }),
            "progress-service",
        );

        assert_eq!(event.user_id, "USR-001");
        assert_eq!(event.kind, NotificationKind::LevelUp);
        assert_eq!(event.source, "progress-service");
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_event_ids_are_time_ordered() {
        let a = EventPayload::new(NotificationKind::Reminder, "u", json!({}), "test");
        let b = EventPayload::new(NotificationKind::Reminder, "u", json!({}), "test");
        // UUID v7 带时间戳前缀，后创建的 id 字典序更大
        assert!(a.event_id < b.event_id);
    }

    #[test]
    fn test_preference_class_mapping() {
        assert_eq!(
            NotificationKind::DailyAffirmation.preference_class(),
            PreferenceClass::Affirmations
        );
        assert_eq!(
            NotificationKind::DailyVerse.preference_class(),
            PreferenceClass::Affirmations
        );
        assert_eq!(
            NotificationKind::ChallengeUpdate.preference_class(),
            PreferenceClass::Challenges
        );
        assert_eq!(
            NotificationKind::LevelUp.preference_class(),
            PreferenceClass::Encouragement
        );
        assert_eq!(
            NotificationKind::RedemptionUpdate.preference_class(),
            PreferenceClass::Always
        );
        assert_eq!(
            NotificationKind::EmergencyAlert.preference_class(),
            PreferenceClass::Always
        );
    }

    #[tokio::test]
    async fn test_bus_publish_and_receive() {
        let (bus, mut rx) = EventBus::channel(16);

        bus.publish(EventPayload::new(
            NotificationKind::Encouragement,
            "USR-002",
            json!({ "mood": "struggling" }),
            "community-service",
        ));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.user_id, "USR-002");
        assert_eq!(received.kind, NotificationKind::Encouragement);
    }

    #[tokio::test]
    async fn test_bus_full_drops_without_blocking() {
        let (bus, _rx) = EventBus::channel(1);

        // 第二条事件在通道满时被丢弃，publish 不应阻塞或 panic
        bus.publish(EventPayload::new(
            NotificationKind::Reminder,
            "u",
            json!({}),
            "test",
        ));
        bus.publish(EventPayload::new(
            NotificationKind::Reminder,
            "u",
            json!({}),
            "test",
        ));
    }

    #[tokio::test]
    async fn test_bus_closed_receiver_is_safe() {
        let (bus, rx) = EventBus::channel(4);
        drop(rx);

        // 接收端已关闭时发布仅记录告警
        bus.publish(EventPayload::new(
            NotificationKind::Reminder,
            "u",
            json!({}),
            "test",
        ));
    }
}
