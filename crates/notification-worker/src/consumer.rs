//! 事件消费循环
//!
//! 从进程内事件总线接收通知事件：按偏好过滤 → 渲染模板 → 投递。
//! 单条事件处理失败只记录日志，不中断循环。

use std::sync::Arc;

use tokio::sync::mpsc;

use huru_shared::events::EventPayload;

use crate::NotificationState;
use crate::sender::NotificationRecord;
use crate::templates::TemplateEngine;

/// 通知 worker
pub struct NotificationWorker {
    state: Arc<NotificationState>,
}

impl NotificationWorker {
    pub fn new(state: Arc<NotificationState>) -> Self {
        Self { state }
    }

    /// 消费循环，通道关闭后返回
    pub async fn run(self, mut rx: mpsc::Receiver<EventPayload>) {
        tracing::info!("通知 worker 已启动");
        while let Some(event) = rx.recv().await {
            if let Err(error) = self.handle_event(&event).await {
                tracing::warn!(
                    event_id = %event.event_id,
                    kind = %event.kind,
                    error = %error,
                    "事件处理失败"
                );
            }
        }
        tracing::info!("事件通道已关闭，通知 worker 退出");
    }

    /// 处理单条事件
    ///
    /// 被偏好拦截的事件返回 Ok(None)，不算失败。
    pub async fn handle_event(
        &self,
        event: &EventPayload,
    ) -> std::result::Result<Option<NotificationRecord>, String> {
        if !self.state.allows(&event.user_id, event.kind) {
            tracing::debug!(
                user_id = %event.user_id,
                kind = %event.kind,
                "用户已关闭该类通知，跳过投递"
            );
            return Ok(None);
        }

        let title = TemplateEngine::render_title(event.kind, &event.data);
        let body = TemplateEngine::render_body(event.kind, &event.data);
        let record = NotificationRecord::new(&event.user_id, event.kind, title, body);

        self.state.sender.deliver(&record).await?;
        tracing::info!(
            notification_id = %record.id,
            user_id = %record.user_id,
            kind = %record.kind,
            "通知已投递"
        );
        Ok(Some(record))
    }
}
