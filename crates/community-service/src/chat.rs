//! 导师私聊
//!
//! 青少年与导师一对一消息。会话按双方 ID 查询，已读标记由
//! 接收方触发；被举报的消息供管理员复核。

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use huru_shared::error::{HuruError, Result};

use crate::models::ChatMessage;
use crate::state::CommunityState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl CommunityState {
    /// 发送消息
    pub fn send_message(
        &self,
        sender_id: String,
        receiver_id: String,
        content: String,
    ) -> Result<ChatMessage> {
        if sender_id == receiver_id {
            return Err(HuruError::InvalidArgument {
                field: "receiver_id".to_string(),
                message: "不能给自己发消息".to_string(),
            });
        }

        let message = ChatMessage {
            id: format!("MSG-{}", Uuid::new_v4()),
            sender_id,
            receiver_id,
            content,
            timestamp: Utc::now(),
            is_read: false,
            is_flagged: false,
        };
        self.messages.insert(&message.id, message.clone());
        tracing::info!(
            message_id = %message.id,
            sender = %message.sender_id,
            receiver = %message.receiver_id,
            "消息已发送"
        );
        Ok(message)
    }

    /// 会话记录，按时间正序
    pub fn conversation(&self, a: &str, b: &str) -> Vec<ChatMessage> {
        let mut messages = self.messages.list_by(|message| message.belongs_to(a, b));
        messages.sort_by(|x, y| x.timestamp.cmp(&y.timestamp));
        messages
    }

    /// 接收方把会话中发给自己的消息全部标记已读，返回标记条数
    pub fn mark_conversation_read(&self, reader_id: &str, peer_id: &str) -> usize {
        let unread = self.messages.list_by(|message| {
            message.receiver_id == reader_id && message.sender_id == peer_id && !message.is_read
        });
        for message in &unread {
            self.messages.update(&message.id, |m| m.is_read = true);
        }
        unread.len()
    }

    /// 举报消息
    pub fn flag_message(&self, message_id: &str) -> Result<ChatMessage> {
        self.messages
            .update(message_id, |message| message.is_flagged = true)
            .ok_or_else(|| HuruError::not_found("ChatMessage", message_id))
    }

    /// 被举报的消息列表（管理员）
    pub fn flagged_messages(&self) -> Vec<ChatMessage> {
        let mut messages = self.messages.list_by(|message| message.is_flagged);
        messages.sort_by(|x, y| x.timestamp.cmp(&y.timestamp));
        messages
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 发送消息请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: String,
    pub receiver_id: String,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

/// 标记已读请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub reader_id: String,
    pub peer_id: String,
}

/// 消息响应
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: ChatMessage,
}

/// 会话响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub messages: Vec<ChatMessage>,
    pub total: usize,
}

/// 标记已读响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub marked: usize,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建私聊路由
pub fn chat_routes() -> Router<Arc<CommunityState>> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/read", post(mark_read))
        .route("/messages/{message_id}/flag", post(flag_message))
        .route("/conversations/{user_a}/{user_b}", get(conversation))
        .route("/admin/messages/flagged", get(flagged_messages))
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 发送消息
#[tracing::instrument(skip(state, req))]
async fn send_message(
    State(state): State<Arc<CommunityState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    req.validate()?;
    let message = state.send_message(req.sender_id, req.receiver_id, req.content)?;
    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

/// 会话记录
#[tracing::instrument(skip(state))]
async fn conversation(
    State(state): State<Arc<CommunityState>>,
    Path((user_a, user_b)): Path<(String, String)>,
) -> Json<ConversationResponse> {
    let messages = state.conversation(&user_a, &user_b);
    let total = messages.len();
    Json(ConversationResponse { messages, total })
}

/// 标记已读
#[tracing::instrument(skip(state, req))]
async fn mark_read(
    State(state): State<Arc<CommunityState>>,
    Json(req): Json<MarkReadRequest>,
) -> Json<MarkReadResponse> {
    let marked = state.mark_conversation_read(&req.reader_id, &req.peer_id);
    Json(MarkReadResponse { marked })
}

/// 举报消息
#[tracing::instrument(skip(state))]
async fn flag_message(
    State(state): State<Arc<CommunityState>>,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let message = state.flag_message(&message_id)?;
    Ok(Json(MessageResponse { message }))
}

/// 被举报消息列表（管理员）
#[tracing::instrument(skip(state))]
async fn flagged_messages(State(state): State<Arc<CommunityState>>) -> Json<ConversationResponse> {
    let messages = state.flagged_messages();
    let total = messages.len();
    Json(ConversationResponse { messages, total })
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use huru_shared::events::EventBus;

    fn test_state() -> Arc<CommunityState> {
        let (bus, _rx) = EventBus::channel(64);
        Arc::new(CommunityState::with_defaults(bus))
    }

    #[test]
    fn test_send_and_list_conversation() {
        let state = test_state();

        state
            .send_message(
                "teen-1".to_string(),
                "mentor-1".to_string(),
                "I had a rough week".to_string(),
            )
            .unwrap();
        state
            .send_message(
                "mentor-1".to_string(),
                "teen-1".to_string(),
                "I'm here for you, tell me more".to_string(),
            )
            .unwrap();
        // 无关会话不应串线
        state
            .send_message(
                "teen-2".to_string(),
                "mentor-1".to_string(),
                "hello".to_string(),
            )
            .unwrap();

        let conversation = state.conversation("teen-1", "mentor-1");
        assert_eq!(conversation.len(), 2);
        // 按时间正序
        assert!(conversation[0].timestamp <= conversation[1].timestamp);
    }

    #[test]
    fn test_cannot_message_self() {
        let state = test_state();
        let err = state
            .send_message("teen-1".to_string(), "teen-1".to_string(), "hi".to_string())
            .unwrap_err();
        assert!(matches!(err, HuruError::InvalidArgument { .. }));
    }

    #[test]
    fn test_mark_read_only_own_incoming() {
        let state = test_state();
        state
            .send_message("teen-1".to_string(), "mentor-1".to_string(), "a".to_string())
            .unwrap();
        state
            .send_message("teen-1".to_string(), "mentor-1".to_string(), "b".to_string())
            .unwrap();
        state
            .send_message("mentor-1".to_string(), "teen-1".to_string(), "c".to_string())
            .unwrap();

        // 导师读取：只标记发给导师的两条
        let marked = state.mark_conversation_read("mentor-1", "teen-1");
        assert_eq!(marked, 2);

        let conversation = state.conversation("teen-1", "mentor-1");
        let unread: Vec<_> = conversation.iter().filter(|m| !m.is_read).collect();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].receiver_id, "teen-1");

        // 重复标记不再有新增
        assert_eq!(state.mark_conversation_read("mentor-1", "teen-1"), 0);
    }

    #[test]
    fn test_flag_message_surfaces_to_admin() {
        let state = test_state();
        let message = state
            .send_message(
                "teen-1".to_string(),
                "mentor-1".to_string(),
                "something inappropriate".to_string(),
            )
            .unwrap();

        state.flag_message(&message.id).unwrap();
        let flagged = state.flagged_messages();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, message.id);
    }
}
