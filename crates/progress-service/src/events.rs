//! 社区活动服务
//!
//! 工作坊、线上讲座、聚会、祷告会等。报名受名额限制，
//! 出席发放活动积分，每人每场只发一次。

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use huru_shared::error::{HuruError, Result};

use crate::models::{CommunityEvent, EventKind, PointsAccount};
use crate::state::ProgressState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl ProgressState {
    /// 获取活动
    pub fn get_event(&self, event_id: &str) -> Result<CommunityEvent> {
        self.events
            .get(event_id)
            .ok_or_else(|| HuruError::not_found("CommunityEvent", event_id))
    }

    /// 创建活动
    #[allow(clippy::too_many_arguments)]
    pub fn create_event(
        &self,
        title: String,
        description: String,
        kind: EventKind,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        location: Option<String>,
        is_virtual: bool,
        max_participants: Option<u32>,
        points: u64,
        created_by: String,
    ) -> Result<CommunityEvent> {
        if end_date <= start_date {
            return Err(HuruError::InvalidArgument {
                field: "end_date".to_string(),
                message: "必须晚于开始时间".to_string(),
            });
        }

        let event = CommunityEvent {
            id: format!("EVT-{}", Uuid::new_v4()),
            title,
            description,
            kind,
            start_date,
            end_date,
            location,
            is_virtual,
            max_participants,
            participants: Vec::new(),
            attended: Vec::new(),
            created_by,
            is_active: true,
            points,
        };
        self.events.insert(&event.id, event.clone());
        tracing::info!(event_id = %event.id, "活动已创建");
        Ok(event)
    }

    /// 报名活动
    ///
    /// 名额检查在条目锁内完成，并发报名不会超员。
    pub fn register_for_event(&self, event_id: &str, user_id: &str) -> Result<CommunityEvent> {
        self.get_account(user_id)?;

        let mut registered = false;
        let mut full = false;
        let updated = self.events.update(event_id, |event| {
            if !event.is_active || event.has_registered(user_id) {
                return;
            }
            if !event.has_capacity() {
                full = true;
                return;
            }
            event.participants.push(user_id.to_string());
            registered = true;
        });

        let event = updated.ok_or_else(|| HuruError::not_found("CommunityEvent", event_id))?;
        if registered {
            tracing::info!(event_id = %event_id, user_id = %user_id, "活动报名成功");
            return Ok(event);
        }
        if full {
            return Err(HuruError::CapacityExceeded {
                resource: format!("CommunityEvent {event_id}"),
            });
        }
        if !event.is_active {
            return Err(HuruError::conflict("活动已结束"));
        }
        Err(HuruError::conflict("已报名该活动"))
    }

    /// 取消报名
    pub fn cancel_registration(&self, event_id: &str, user_id: &str) -> Result<CommunityEvent> {
        let mut cancelled = false;
        let updated = self.events.update(event_id, |event| {
            let before = event.participants.len();
            event.participants.retain(|p| p != user_id);
            cancelled = event.participants.len() != before;
        });

        let event = updated.ok_or_else(|| HuruError::not_found("CommunityEvent", event_id))?;
        if !cancelled {
            return Err(HuruError::conflict("未报名该活动"));
        }
        tracing::info!(event_id = %event_id, user_id = %user_id, "已取消报名");
        Ok(event)
    }

    /// 签到出席并领取积分
    pub fn attend_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<(CommunityEvent, PointsAccount)> {
        let mut attended = false;
        let mut not_registered = false;
        let updated = self.events.update(event_id, |event| {
            if !event.has_registered(user_id) {
                not_registered = true;
            } else if !event.has_attended(user_id) {
                event.attended.push(user_id.to_string());
                attended = true;
            }
        });

        let event = updated.ok_or_else(|| HuruError::not_found("CommunityEvent", event_id))?;
        if not_registered {
            return Err(HuruError::conflict("未报名该活动"));
        }
        if !attended {
            return Err(HuruError::conflict("已签到，积分不重复发放"));
        }

        let account = self.award_points(
            user_id,
            event.points,
            &format!("event attended: {}", event.title),
        )?;
        Ok((event, account))
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 活动列表查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsQuery {
    #[serde(default)]
    pub active_only: bool,
    pub kind: Option<EventKind>,
}

/// 创建活动请求（管理员 / 导师）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    pub description: String,
    pub kind: EventKind,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub points: u64,
    pub created_by: String,
}

/// 报名 / 出席请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventActionRequest {
    pub user_id: String,
}

/// 活动响应
#[derive(Debug, Serialize, Deserialize)]
pub struct EventResponse {
    pub event: CommunityEvent,
}

/// 活动列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct EventListResponse {
    pub events: Vec<CommunityEvent>,
    pub total: usize,
}

/// 出席响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendResponse {
    pub event: CommunityEvent,
    pub awarded_points: u64,
    pub new_balance: u64,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建活动路由
pub fn event_routes() -> Router<Arc<ProgressState>> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events", post(create_event))
        .route("/events/{event_id}", get(get_event))
        .route("/events/{event_id}/register", post(register))
        .route("/events/{event_id}/register", axum::routing::delete(cancel))
        .route("/events/{event_id}/attend", post(attend))
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 活动列表
#[tracing::instrument(skip(state))]
async fn list_events(
    State(state): State<Arc<ProgressState>>,
    Query(query): Query<ListEventsQuery>,
) -> Json<EventListResponse> {
    let mut events = state.events.list_by(|event| {
        if query.active_only && !event.is_active {
            return false;
        }
        query.kind.is_none_or(|k| event.kind == k)
    });
    events.sort_by(|a, b| a.start_date.cmp(&b.start_date));

    let total = events.len();
    Json(EventListResponse { events, total })
}

/// 活动详情
#[tracing::instrument(skip(state))]
async fn get_event(
    State(state): State<Arc<ProgressState>>,
    Path(event_id): Path<String>,
) -> Result<Json<EventResponse>> {
    let event = state.get_event(&event_id)?;
    Ok(Json(EventResponse { event }))
}

/// 创建活动
#[tracing::instrument(skip(state, req))]
async fn create_event(
    State(state): State<Arc<ProgressState>>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventResponse>)> {
    req.validate()?;
    let event = state.create_event(
        req.title,
        req.description,
        req.kind,
        req.start_date,
        req.end_date,
        req.location,
        req.is_virtual,
        req.max_participants,
        req.points,
        req.created_by,
    )?;
    Ok((StatusCode::CREATED, Json(EventResponse { event })))
}

/// 报名
#[tracing::instrument(skip(state, req))]
async fn register(
    State(state): State<Arc<ProgressState>>,
    Path(event_id): Path<String>,
    Json(req): Json<EventActionRequest>,
) -> Result<Json<EventResponse>> {
    let event = state.register_for_event(&event_id, &req.user_id)?;
    Ok(Json(EventResponse { event }))
}

/// 取消报名
#[tracing::instrument(skip(state, req))]
async fn cancel(
    State(state): State<Arc<ProgressState>>,
    Path(event_id): Path<String>,
    Json(req): Json<EventActionRequest>,
) -> Result<Json<EventResponse>> {
    let event = state.cancel_registration(&event_id, &req.user_id)?;
    Ok(Json(EventResponse { event }))
}

/// 出席签到
#[tracing::instrument(skip(state, req))]
async fn attend(
    State(state): State<Arc<ProgressState>>,
    Path(event_id): Path<String>,
    Json(req): Json<EventActionRequest>,
) -> Result<Json<AttendResponse>> {
    let (event, account) = state.attend_event(&event_id, &req.user_id)?;
    Ok(Json(AttendResponse {
        awarded_points: event.points,
        new_balance: account.points,
        event,
    }))
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use huru_shared::events::EventBus;

    fn test_state() -> Arc<ProgressState> {
        let (bus, _rx) = EventBus::channel(64);
        let state = ProgressState::with_defaults(bus);
        for id in ["USR-1", "USR-2", "USR-3"] {
            state
                .create_account(Some(id.to_string()), format!("user {id}"))
                .unwrap();
        }
        Arc::new(state)
    }

    fn seed_event(state: &ProgressState, max: Option<u32>, points: u64) -> CommunityEvent {
        let now = Utc::now();
        state
            .create_event(
                "Mental Health Workshop".to_string(),
                "Coping strategies for exam stress".to_string(),
                EventKind::Workshop,
                now + Duration::days(1),
                now + Duration::days(1) + Duration::hours(2),
                Some("Nairobi Community Center".to_string()),
                false,
                max,
                points,
                "mentor-1".to_string(),
            )
            .unwrap()
    }

    #[test]
    fn test_create_event_validates_dates() {
        let state = test_state();
        let now = Utc::now();
        let err = state
            .create_event(
                "Bad".to_string(),
                String::new(),
                EventKind::Webinar,
                now,
                now - Duration::hours(1),
                None,
                true,
                None,
                0,
                "admin".to_string(),
            )
            .unwrap_err();
        assert!(matches!(err, HuruError::InvalidArgument { .. }));
    }

    #[test]
    fn test_register_capacity_enforced() {
        let state = test_state();
        let event = seed_event(&state, Some(2), 50);

        state.register_for_event(&event.id, "USR-1").unwrap();
        state.register_for_event(&event.id, "USR-2").unwrap();

        let err = state.register_for_event(&event.id, "USR-3").unwrap_err();
        assert!(matches!(err, HuruError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_register_twice_conflicts() {
        let state = test_state();
        let event = seed_event(&state, None, 50);

        state.register_for_event(&event.id, "USR-1").unwrap();
        let err = state.register_for_event(&event.id, "USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
    }

    #[test]
    fn test_cancel_frees_capacity() {
        let state = test_state();
        let event = seed_event(&state, Some(1), 50);

        state.register_for_event(&event.id, "USR-1").unwrap();
        assert!(matches!(
            state.register_for_event(&event.id, "USR-2").unwrap_err(),
            HuruError::CapacityExceeded { .. }
        ));

        state.cancel_registration(&event.id, "USR-1").unwrap();
        state.register_for_event(&event.id, "USR-2").unwrap();
    }

    #[test]
    fn test_attend_awards_once() {
        let state = test_state();
        let event = seed_event(&state, None, 75);

        state.register_for_event(&event.id, "USR-1").unwrap();
        let (_, account) = state.attend_event(&event.id, "USR-1").unwrap();
        assert_eq!(account.points, 75);

        let err = state.attend_event(&event.id, "USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
        assert_eq!(state.get_account("USR-1").unwrap().points, 75);
    }

    #[test]
    fn test_attend_requires_registration() {
        let state = test_state();
        let event = seed_event(&state, None, 75);

        let err = state.attend_event(&event.id, "USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
    }
}
