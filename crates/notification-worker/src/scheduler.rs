//! 每日定时推送
//!
//! cron 表达式驱动：早间肯定语、晚间经文。触发时向所有已知用户
//! 广播（以偏好存储为用户名册，开关关闭的用户被跳过）。
//! 轮播内容按日期选取，见 `templates`。

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;

use huru_shared::config::SchedulerConfig;
use huru_shared::events::NotificationKind;

use crate::NotificationState;
use crate::sender::NotificationRecord;
use crate::templates::TemplateEngine;

/// 每日推送调度器
pub struct DailyScheduler {
    state: Arc<NotificationState>,
    affirmation: Schedule,
    verse: Schedule,
}

impl DailyScheduler {
    /// 解析 cron 表达式并构建调度器
    ///
    /// 表达式非法属于配置错误，在启动阶段暴露。
    pub fn new(
        state: Arc<NotificationState>,
        config: &SchedulerConfig,
    ) -> Result<Self, cron::error::Error> {
        Ok(Self {
            state,
            affirmation: Schedule::from_str(&config.affirmation_cron)?,
            verse: Schedule::from_str(&config.verse_cron)?,
        })
    }

    /// 调度循环：睡到最近的触发点，广播，再计算下一个
    pub async fn run(self) {
        tracing::info!("每日推送调度器已启动");
        loop {
            let now = Utc::now();
            let next_affirmation = self.affirmation.after(&now).next();
            let next_verse = self.verse.after(&now).next();

            let (kind, fire_at) = match (next_affirmation, next_verse) {
                (Some(a), Some(v)) if a <= v => (NotificationKind::DailyAffirmation, a),
                (Some(_), Some(v)) => (NotificationKind::DailyVerse, v),
                (Some(a), None) => (NotificationKind::DailyAffirmation, a),
                (None, Some(v)) => (NotificationKind::DailyVerse, v),
                (None, None) => {
                    tracing::warn!("cron 表达式没有未来触发点，调度器退出");
                    return;
                }
            };

            let wait = (fire_at - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tracing::debug!(kind = %kind, fire_at = %fire_at, "等待下一次定时推送");
            tokio::time::sleep(wait).await;

            let delivered = self.broadcast(kind).await;
            tracing::info!(kind = %kind, delivered, "定时推送完成");
        }
    }

    /// 向所有允许该类通知的用户广播，返回投递人数
    pub async fn broadcast(&self, kind: NotificationKind) -> usize {
        let data = serde_json::json!({});
        let title = TemplateEngine::render_title(kind, &data);
        let body = TemplateEngine::render_body(kind, &data);

        let mut delivered = 0;
        for preferences in self.state.preferences.list() {
            if !preferences.allows(kind) {
                continue;
            }
            let record = NotificationRecord::new(
                &preferences.user_id,
                kind,
                title.clone(),
                body.clone(),
            );
            match self.state.sender.deliver(&record).await {
                Ok(_) => delivered += 1,
                Err(error) => {
                    tracing::warn!(user_id = %preferences.user_id, error = %error, "广播投递失败");
                }
            }
        }
        delivered
    }
}
