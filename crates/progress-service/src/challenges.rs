//! 挑战服务
//!
//! 挑战是积分的主要来源之一：加入后完成即发放挑战积分，
//! 每人每个挑战只发一次。

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use huru_shared::error::{HuruError, Result};
use huru_shared::events::{EventPayload, NotificationKind};

use crate::models::{Challenge, ChallengeKind, PointsAccount};
use crate::state::ProgressState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl ProgressState {
    /// 获取挑战
    pub fn get_challenge(&self, challenge_id: &str) -> Result<Challenge> {
        self.challenges
            .get(challenge_id)
            .ok_or_else(|| HuruError::not_found("Challenge", challenge_id))
    }

    /// 创建挑战
    pub fn create_challenge(
        &self,
        title: String,
        description: String,
        kind: ChallengeKind,
        duration_days: u32,
        points: u64,
        created_by: String,
    ) -> Result<Challenge> {
        let now = Utc::now();
        let challenge = Challenge {
            id: format!("CHL-{}", Uuid::new_v4()),
            title,
            description,
            kind,
            duration_days,
            points,
            participants: Vec::new(),
            completions: Vec::new(),
            created_by,
            start_date: now,
            end_date: now + Duration::days(i64::from(duration_days)),
            is_active: true,
        };
        self.challenges.insert(&challenge.id, challenge.clone());
        tracing::info!(challenge_id = %challenge.id, "挑战已创建");
        Ok(challenge)
    }

    /// 加入挑战
    pub fn join_challenge(&self, challenge_id: &str, user_id: &str) -> Result<Challenge> {
        // 账户必须存在，否则完成时无法发分
        self.get_account(user_id)?;

        let mut joined = false;
        let updated = self.challenges.update(challenge_id, |challenge| {
            if challenge.is_active && !challenge.has_joined(user_id) {
                challenge.participants.push(user_id.to_string());
                joined = true;
            }
        });

        let challenge = updated.ok_or_else(|| HuruError::not_found("Challenge", challenge_id))?;
        if !joined {
            if !challenge.is_active {
                return Err(HuruError::conflict("挑战已结束"));
            }
            return Err(HuruError::conflict("已加入该挑战"));
        }

        tracing::info!(challenge_id = %challenge_id, user_id = %user_id, "加入挑战");
        self.bus.publish(EventPayload::new(
            NotificationKind::ChallengeUpdate,
            user_id,
            json!({
                "action": "joined",
                "challengeTitle": challenge.title,
                "points": challenge.points,
            }),
            "progress-service",
        ));
        Ok(challenge)
    }

    /// 完成挑战并领取积分
    ///
    /// 必须是参与者且未领取过；发分走账本路径，可能触发升级事件。
    pub fn complete_challenge(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<(Challenge, PointsAccount)> {
        let mut completed = false;
        let mut not_joined = false;
        let updated = self.challenges.update(challenge_id, |challenge| {
            if !challenge.has_joined(user_id) {
                not_joined = true;
            } else if !challenge.has_completed(user_id) {
                challenge.completions.push(user_id.to_string());
                completed = true;
            }
        });

        let challenge = updated.ok_or_else(|| HuruError::not_found("Challenge", challenge_id))?;
        if not_joined {
            return Err(HuruError::conflict("未加入该挑战"));
        }
        if !completed {
            return Err(HuruError::conflict("挑战已完成，积分不重复发放"));
        }

        let account = self.award_points(
            user_id,
            challenge.points,
            &format!("challenge completed: {}", challenge.title),
        )?;

        self.bus.publish(EventPayload::new(
            NotificationKind::ChallengeUpdate,
            user_id,
            json!({
                "action": "completed",
                "challengeTitle": challenge.title,
                "points": challenge.points,
            }),
            "progress-service",
        ));
        Ok((challenge, account))
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 挑战列表查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChallengesQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// 创建挑战请求（管理员 / 导师）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChallengeRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    pub description: String,
    pub kind: ChallengeKind,
    #[validate(range(min = 1, max = 365))]
    pub duration_days: u32,
    pub points: u64,
    pub created_by: String,
}

/// 加入 / 完成挑战请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeActionRequest {
    pub user_id: String,
}

/// 挑战响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: Challenge,
}

/// 挑战列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeListResponse {
    pub challenges: Vec<Challenge>,
    pub total: usize,
}

/// 完成挑战响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteChallengeResponse {
    pub challenge: Challenge,
    pub awarded_points: u64,
    pub new_balance: u64,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建挑战路由
pub fn challenge_routes() -> Router<Arc<ProgressState>> {
    Router::new()
        .route("/challenges", get(list_challenges))
        .route("/challenges", post(create_challenge))
        .route("/challenges/{challenge_id}", get(get_challenge))
        .route("/challenges/{challenge_id}/join", post(join_challenge))
        .route(
            "/challenges/{challenge_id}/complete",
            post(complete_challenge),
        )
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 挑战列表
#[tracing::instrument(skip(state))]
async fn list_challenges(
    State(state): State<Arc<ProgressState>>,
    Query(query): Query<ListChallengesQuery>,
) -> Json<ChallengeListResponse> {
    let mut challenges = state
        .challenges
        .list_by(|challenge| !query.active_only || challenge.is_active);
    challenges.sort_by(|a, b| a.start_date.cmp(&b.start_date));

    let total = challenges.len();
    Json(ChallengeListResponse { challenges, total })
}

/// 挑战详情
#[tracing::instrument(skip(state))]
async fn get_challenge(
    State(state): State<Arc<ProgressState>>,
    Path(challenge_id): Path<String>,
) -> Result<Json<ChallengeResponse>> {
    let challenge = state.get_challenge(&challenge_id)?;
    Ok(Json(ChallengeResponse { challenge }))
}

/// 创建挑战
#[tracing::instrument(skip(state, req))]
async fn create_challenge(
    State(state): State<Arc<ProgressState>>,
    Json(req): Json<CreateChallengeRequest>,
) -> Result<(StatusCode, Json<ChallengeResponse>)> {
    req.validate()?;
    let challenge = state.create_challenge(
        req.title,
        req.description,
        req.kind,
        req.duration_days,
        req.points,
        req.created_by,
    )?;
    Ok((StatusCode::CREATED, Json(ChallengeResponse { challenge })))
}

/// 加入挑战
#[tracing::instrument(skip(state, req))]
async fn join_challenge(
    State(state): State<Arc<ProgressState>>,
    Path(challenge_id): Path<String>,
    Json(req): Json<ChallengeActionRequest>,
) -> Result<Json<ChallengeResponse>> {
    let challenge = state.join_challenge(&challenge_id, &req.user_id)?;
    Ok(Json(ChallengeResponse { challenge }))
}

/// 完成挑战
#[tracing::instrument(skip(state, req))]
async fn complete_challenge(
    State(state): State<Arc<ProgressState>>,
    Path(challenge_id): Path<String>,
    Json(req): Json<ChallengeActionRequest>,
) -> Result<Json<CompleteChallengeResponse>> {
    let (challenge, account) = state.complete_challenge(&challenge_id, &req.user_id)?;
    Ok(Json(CompleteChallengeResponse {
        awarded_points: challenge.points,
        new_balance: account.points,
        challenge,
    }))
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use huru_shared::events::EventBus;

    fn test_state() -> Arc<ProgressState> {
        let (bus, _rx) = EventBus::channel(64);
        let state = ProgressState::with_defaults(bus);
        state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();
        Arc::new(state)
    }

    fn seed_challenge(state: &ProgressState, points: u64) -> Challenge {
        state
            .create_challenge(
                "7-Day Reading Journey".to_string(),
                "Read for 20 minutes every day".to_string(),
                ChallengeKind::Reading,
                7,
                points,
                "mentor-1".to_string(),
            )
            .unwrap()
    }

    #[test]
    fn test_join_then_complete_awards_once() {
        let state = test_state();
        let challenge = seed_challenge(&state, 100);

        state.join_challenge(&challenge.id, "USR-1").unwrap();
        let (updated, account) = state.complete_challenge(&challenge.id, "USR-1").unwrap();

        assert!(updated.has_completed("USR-1"));
        assert_eq!(account.points, 100);

        // 重复领取被拒绝，余额不变
        let err = state.complete_challenge(&challenge.id, "USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
        assert_eq!(state.get_account("USR-1").unwrap().points, 100);
    }

    #[test]
    fn test_join_twice_conflicts() {
        let state = test_state();
        let challenge = seed_challenge(&state, 50);

        state.join_challenge(&challenge.id, "USR-1").unwrap();
        let err = state.join_challenge(&challenge.id, "USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
    }

    #[test]
    fn test_join_inactive_challenge() {
        let state = test_state();
        let challenge = seed_challenge(&state, 50);
        state
            .challenges
            .update(&challenge.id, |c| c.is_active = false);

        let err = state.join_challenge(&challenge.id, "USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
    }

    #[test]
    fn test_complete_without_join() {
        let state = test_state();
        let challenge = seed_challenge(&state, 50);

        let err = state.complete_challenge(&challenge.id, "USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
    }

    #[test]
    fn test_join_requires_account() {
        let state = test_state();
        let challenge = seed_challenge(&state, 50);

        let err = state.join_challenge(&challenge.id, "ghost").unwrap_err();
        assert!(matches!(err, HuruError::NotFound { .. }));
    }

    #[test]
    fn test_completion_can_level_up() {
        let state = test_state();
        let challenge = seed_challenge(&state, 600);

        state.join_challenge(&challenge.id, "USR-1").unwrap();
        let (_, account) = state.complete_challenge(&challenge.id, "USR-1").unwrap();

        let status = state.engine().compute(account.points);
        assert_eq!(status.tier, gamification_engine::Tier::Builder);
    }
}
