//! 私密日记与身心状态
//!
//! 日记默认私密，仅作者可见。心情打卡在入库的同时发布鼓励
//! 通知事件；紧急求助发布 EmergencyAlert 事件（由通知 worker
//! 生成回执，真实的联系人通知是外部系统的职责）。

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use huru_shared::error::{HuruError, Result};
use huru_shared::events::{EventPayload, NotificationKind};

use crate::models::{JournalEntry, Mood, MoodEntry};
use crate::state::CommunityState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl CommunityState {
    /// 写日记
    pub fn create_journal(
        &self,
        user_id: String,
        title: String,
        content: String,
        mood: Option<Mood>,
        is_private: bool,
        tags: Vec<String>,
    ) -> Result<JournalEntry> {
        let now = Utc::now();
        let entry = JournalEntry {
            id: format!("JRN-{}", Uuid::new_v4()),
            user_id,
            title,
            content,
            mood,
            is_private,
            created_at: now,
            updated_at: now,
            tags,
        };
        self.journals.insert(&entry.id, entry.clone());
        tracing::info!(journal_id = %entry.id, "日记已保存");
        Ok(entry)
    }

    /// 用户的日记列表，最新在前
    pub fn user_journals(&self, user_id: &str) -> Vec<JournalEntry> {
        let mut entries = self.journals.list_by(|entry| entry.user_id == user_id);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }

    /// 修改日记，仅作者本人
    pub fn update_journal(
        &self,
        journal_id: &str,
        user_id: &str,
        title: Option<String>,
        content: Option<String>,
        mood: Option<Mood>,
    ) -> Result<JournalEntry> {
        let entry = self
            .journals
            .get(journal_id)
            .ok_or_else(|| HuruError::not_found("JournalEntry", journal_id))?;
        if entry.user_id != user_id {
            return Err(HuruError::Forbidden {
                operation: "修改他人日记".to_string(),
            });
        }

        self.journals
            .update(journal_id, |entry| {
                if let Some(title) = title.clone() {
                    entry.title = title;
                }
                if let Some(content) = content.clone() {
                    entry.content = content;
                }
                if mood.is_some() {
                    entry.mood = mood;
                }
                entry.updated_at = Utc::now();
            })
            .ok_or_else(|| HuruError::not_found("JournalEntry", journal_id))
    }

    /// 删除日记，仅作者本人
    pub fn delete_journal(&self, journal_id: &str, user_id: &str) -> Result<()> {
        let entry = self
            .journals
            .get(journal_id)
            .ok_or_else(|| HuruError::not_found("JournalEntry", journal_id))?;
        if entry.user_id != user_id {
            return Err(HuruError::Forbidden {
                operation: "删除他人日记".to_string(),
            });
        }
        self.journals.remove(journal_id);
        tracing::info!(journal_id = %journal_id, "日记已删除");
        Ok(())
    }

    /// 心情打卡
    ///
    /// 入库并发布鼓励事件，worker 按心情渲染文案后投递。
    pub fn log_mood(
        &self,
        user_id: String,
        mood: Mood,
        notes: Option<String>,
        triggers: Vec<String>,
    ) -> Result<MoodEntry> {
        let entry = MoodEntry {
            id: format!("MOOD-{}", Uuid::new_v4()),
            user_id: user_id.clone(),
            mood,
            notes,
            triggers,
            timestamp: Utc::now(),
        };
        self.moods.insert(&entry.id, entry.clone());

        tracing::info!(user_id = %user_id, mood = mood.as_str(), "心情已打卡");
        self.bus.publish(EventPayload::new(
            NotificationKind::Encouragement,
            user_id,
            json!({ "mood": mood.as_str() }),
            "community-service",
        ));
        Ok(entry)
    }

    /// 用户的心情历史，最新在前
    pub fn user_moods(&self, user_id: &str) -> Vec<MoodEntry> {
        let mut entries = self.moods.list_by(|entry| entry.user_id == user_id);
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    /// 紧急求助
    ///
    /// 发布 EmergencyAlert 事件；联系人的实际触达由外部系统承担，
    /// 这里只保证用户收到「已通知」回执。
    pub fn trigger_emergency(&self, user_id: &str) {
        tracing::warn!(user_id = %user_id, "触发紧急求助");
        self.bus.publish(EventPayload::new(
            NotificationKind::EmergencyAlert,
            user_id,
            json!({}),
            "community-service",
        ));
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 写日记请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJournalRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    #[validate(length(min = 1, max = 10000))]
    pub content: String,
    pub mood: Option<Mood>,
    /// 默认私密
    #[serde(default = "default_private")]
    pub is_private: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_private() -> bool {
    true
}

/// 修改日记请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJournalRequest {
    pub user_id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<Mood>,
}

/// 删除日记请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteJournalRequest {
    pub user_id: String,
}

/// 心情打卡请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMoodRequest {
    pub mood: Mood,
    pub notes: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
}

/// 日记响应
#[derive(Debug, Serialize, Deserialize)]
pub struct JournalResponse {
    pub journal: JournalEntry,
}

/// 日记列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct JournalListResponse {
    pub journals: Vec<JournalEntry>,
    pub total: usize,
}

/// 心情响应
#[derive(Debug, Serialize, Deserialize)]
pub struct MoodResponse {
    pub mood: MoodEntry,
}

/// 心情历史响应
#[derive(Debug, Serialize, Deserialize)]
pub struct MoodListResponse {
    pub moods: Vec<MoodEntry>,
    pub total: usize,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建日记与身心状态路由
pub fn journal_routes() -> Router<Arc<CommunityState>> {
    Router::new()
        .route("/users/{user_id}/journals", post(create_journal))
        .route("/users/{user_id}/journals", get(list_journals))
        .route("/journals/{journal_id}", put(update_journal))
        .route("/journals/{journal_id}", delete(delete_journal))
        .route("/users/{user_id}/moods", post(log_mood))
        .route("/users/{user_id}/moods", get(list_moods))
        .route("/users/{user_id}/emergency", post(trigger_emergency))
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 写日记
#[tracing::instrument(skip(state, req))]
async fn create_journal(
    State(state): State<Arc<CommunityState>>,
    Path(user_id): Path<String>,
    Json(req): Json<CreateJournalRequest>,
) -> Result<(StatusCode, Json<JournalResponse>)> {
    req.validate()?;
    let journal = state.create_journal(
        user_id,
        req.title,
        req.content,
        req.mood,
        req.is_private,
        req.tags,
    )?;
    Ok((StatusCode::CREATED, Json(JournalResponse { journal })))
}

/// 日记列表
#[tracing::instrument(skip(state))]
async fn list_journals(
    State(state): State<Arc<CommunityState>>,
    Path(user_id): Path<String>,
) -> Json<JournalListResponse> {
    let journals = state.user_journals(&user_id);
    let total = journals.len();
    Json(JournalListResponse { journals, total })
}

/// 修改日记
#[tracing::instrument(skip(state, req))]
async fn update_journal(
    State(state): State<Arc<CommunityState>>,
    Path(journal_id): Path<String>,
    Json(req): Json<UpdateJournalRequest>,
) -> Result<Json<JournalResponse>> {
    let journal =
        state.update_journal(&journal_id, &req.user_id, req.title, req.content, req.mood)?;
    Ok(Json(JournalResponse { journal }))
}

/// 删除日记
#[tracing::instrument(skip(state, req))]
async fn delete_journal(
    State(state): State<Arc<CommunityState>>,
    Path(journal_id): Path<String>,
    Json(req): Json<DeleteJournalRequest>,
) -> Result<StatusCode> {
    state.delete_journal(&journal_id, &req.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// 心情打卡
#[tracing::instrument(skip(state, req))]
async fn log_mood(
    State(state): State<Arc<CommunityState>>,
    Path(user_id): Path<String>,
    Json(req): Json<LogMoodRequest>,
) -> Result<(StatusCode, Json<MoodResponse>)> {
    let mood = state.log_mood(user_id, req.mood, req.notes, req.triggers)?;
    Ok((StatusCode::CREATED, Json(MoodResponse { mood })))
}

/// 心情历史
#[tracing::instrument(skip(state))]
async fn list_moods(
    State(state): State<Arc<CommunityState>>,
    Path(user_id): Path<String>,
) -> Json<MoodListResponse> {
    let moods = state.user_moods(&user_id);
    let total = moods.len();
    Json(MoodListResponse { moods, total })
}

/// 紧急求助
#[tracing::instrument(skip(state))]
async fn trigger_emergency(
    State(state): State<Arc<CommunityState>>,
    Path(user_id): Path<String>,
) -> StatusCode {
    state.trigger_emergency(&user_id);
    StatusCode::ACCEPTED
}

// ============================================================================
// 单元测试
// ============================================================================
