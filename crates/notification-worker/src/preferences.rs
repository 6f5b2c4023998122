//! 通知偏好
//!
//! 每用户四个开关，与通知类型的偏好类别对应。事务性通知
//! （兑换结果、紧急回执）不受开关控制。

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use huru_shared::events::{NotificationKind, PreferenceClass};

use crate::NotificationState;

/// 通知偏好
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub user_id: String,
    pub daily_affirmations: bool,
    pub reminders: bool,
    pub challenges: bool,
    pub encouragement: bool,
}

impl NotificationPreferences {
    /// 新用户默认全部开启
    pub fn default_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            daily_affirmations: true,
            reminders: true,
            challenges: true,
            encouragement: true,
        }
    }

    /// 该类型的通知是否允许投递
    pub fn allows(&self, kind: NotificationKind) -> bool {
        match kind.preference_class() {
            PreferenceClass::Affirmations => self.daily_affirmations,
            PreferenceClass::Reminders => self.reminders,
            PreferenceClass::Challenges => self.challenges,
            PreferenceClass::Encouragement => self.encouragement,
            PreferenceClass::Always => true,
        }
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 更新偏好请求，只更新提供的字段
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    pub daily_affirmations: Option<bool>,
    pub reminders: Option<bool>,
    pub challenges: Option<bool>,
    pub encouragement: Option<bool>,
}

/// 偏好响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PreferencesResponse {
    pub preferences: NotificationPreferences,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建偏好路由
pub fn preference_routes() -> Router<Arc<NotificationState>> {
    Router::new()
        .route(
            "/users/{user_id}/preferences/notifications",
            get(get_preferences),
        )
        .route(
            "/users/{user_id}/preferences/notifications",
            put(update_preferences),
        )
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 查询偏好，未设置过的用户返回默认值
#[tracing::instrument(skip(state))]
async fn get_preferences(
    State(state): State<Arc<NotificationState>>,
    Path(user_id): Path<String>,
) -> Json<PreferencesResponse> {
    let preferences = state
        .preferences
        .get(&user_id)
        .unwrap_or_else(|| NotificationPreferences::default_for(&user_id));
    Json(PreferencesResponse { preferences })
}

/// 更新偏好
#[tracing::instrument(skip(state, req))]
async fn update_preferences(
    State(state): State<Arc<NotificationState>>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Json<PreferencesResponse> {
    let mut preferences = state
        .preferences
        .get(&user_id)
        .unwrap_or_else(|| NotificationPreferences::default_for(&user_id));

    if let Some(value) = req.daily_affirmations {
        preferences.daily_affirmations = value;
    }
    if let Some(value) = req.reminders {
        preferences.reminders = value;
    }
    if let Some(value) = req.challenges {
        preferences.challenges = value;
    }
    if let Some(value) = req.encouragement {
        preferences.encouragement = value;
    }

    state.preferences.insert(&user_id, preferences.clone());
    tracing::info!(user_id = %user_id, "通知偏好已更新");
    Json(PreferencesResponse { preferences })
}

// ============================================================================
// 单元测试
// ============================================================================
