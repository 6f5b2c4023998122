//! 应用组装
//!
//! 三个域各自持有独立状态，合并进同一个 Router。
//! 健康检查端点独立于业务服务，便于运维监控。

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use community_service::CommunityState;
use huru_shared::config::AppConfig;
use huru_shared::events::{EventBus, EventPayload};
use notification_worker::NotificationState;
use progress_service::ProgressState;

/// 全部域状态
pub struct AppStates {
    pub progress: Arc<ProgressState>,
    pub community: Arc<CommunityState>,
    pub notifications: Arc<NotificationState>,
}

impl AppStates {
    /// 由配置构建全部状态，返回事件总线接收端供通知 worker 消费
    pub fn from_config(
        config: &AppConfig,
    ) -> anyhow::Result<(Self, tokio::sync::mpsc::Receiver<EventPayload>)> {
        let (bus, rx) = EventBus::channel(1024);

        let progress = ProgressState::from_config(&config.gamification, bus.clone())?;
        let community = CommunityState::from_config(&config.moderation, bus);
        let notifications = NotificationState::new();

        Ok((
            Self {
                progress: Arc::new(progress),
                community: Arc::new(community),
                notifications: Arc::new(notifications),
            },
            rx,
        ))
    }
}

/// 组装完整应用
pub fn build_app(states: &AppStates) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .merge(progress_service::routes().with_state(Arc::clone(&states.progress)))
        .merge(community_service::routes().with_state(Arc::clone(&states.community)))
        .merge(notification_worker::routes().with_state(Arc::clone(&states.notifications)))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查响应
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// 就绪检查响应
#[derive(Serialize)]
struct ReadinessResponse {
    status: &'static str,
    services: Vec<&'static str>,
}

/// 健康检查端点
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// 就绪检查端点
async fn readiness_check() -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready",
        services: vec!["progress", "community", "notifications"],
    })
}
