//! 通知 worker
//!
//! 消费进程内事件总线上的通知事件：按用户偏好过滤、渲染模板、
//! 经投递渠道写入站内信箱。另含 cron 驱动的每日定时推送
//! （早间肯定语、晚间经文）。
//!
//! # 模块
//!
//! - `preferences`: 每用户的通知偏好开关
//! - `templates`: 通知类型 → 标题 / 正文渲染
//! - `sender`: 投递渠道抽象与站内信箱
//! - `consumer`: 事件消费循环
//! - `scheduler`: 每日定时推送

pub mod consumer;
pub mod preferences;
pub mod scheduler;
pub mod sender;
pub mod templates;

use std::sync::Arc;

use axum::Router;

use huru_shared::events::NotificationKind;
use huru_shared::store::MemoryStore;

use preferences::NotificationPreferences;
use sender::{InAppChannel, NotificationSender};

/// 通知域共享状态
pub struct NotificationState {
    pub preferences: MemoryStore<NotificationPreferences>,
    /// 站内信箱渠道，同时是查询接口的数据源
    pub inbox: InAppChannel,
    pub sender: NotificationSender,
}

impl NotificationState {
    pub fn new() -> Self {
        let inbox = InAppChannel::new();
        let sender = NotificationSender::new(vec![
            Arc::new(inbox.clone()) as Arc<dyn sender::NotificationChannel>,
        ]);
        Self {
            preferences: MemoryStore::new(),
            inbox,
            sender,
        }
    }

    /// 用户是否接收该类型的通知
    ///
    /// 未设置过偏好的用户按默认值（全部开启）处理。
    pub fn allows(&self, user_id: &str, kind: NotificationKind) -> bool {
        self.preferences
            .get(user_id)
            .unwrap_or_else(|| NotificationPreferences::default_for(user_id))
            .allows(kind)
    }
}

impl Default for NotificationState {
    fn default() -> Self {
        Self::new()
    }
}

/// 构建通知服务路由（偏好管理 + 站内信箱查询）
pub fn routes() -> Router<Arc<NotificationState>> {
    Router::new()
        .merge(preferences::preference_routes())
        .merge(sender::inbox_routes())
}
