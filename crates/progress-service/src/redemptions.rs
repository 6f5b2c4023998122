//! 兑换流程与审批队列
//!
//! 兑换 = 纯规则判定 + 账本 CAS 写入 + 记录入库：
//! 读余额快照 → `RewardLedger` 判定 → 带版本号写回。并发兑换
//! 互相冲突时败者重读新余额重新判定，双花在此被挡住。
//!
//! 审批状态机：Pending → Approved → Fulfilled，或 Pending → Rejected。
//! 管理员驳回时退还积分；已批准未发放的兑换不退积分。

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use gamification_engine::{RedemptionOutcome, RewardLedger};
use huru_shared::error::{HuruError, Result};
use huru_shared::events::{EventPayload, NotificationKind};
use huru_shared::store::CasError;

use crate::models::{Redemption, RedemptionStatus};
use crate::state::ProgressState;

/// 单次兑换尝试的完整结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResult {
    pub outcome: RedemptionOutcome,
    /// 本次尝试后的余额（被拒绝时不变）
    pub points: u64,
    /// 发生扣分时生成的兑换记录
    pub redemption: Option<Redemption>,
}

// ============================================================================
// 服务逻辑
// ============================================================================

impl ProgressState {
    /// 发起兑换
    pub fn redeem(&self, user_id: &str, reward_id: &str) -> Result<RedeemResult> {
        let reward = self.get_reward(reward_id)?;

        for _ in 0..=self.max_retries {
            let Some(snapshot) = self.accounts.get(user_id) else {
                return Err(HuruError::not_found("PointsAccount", user_id));
            };

            let (outcome, new_points) = RewardLedger::redeem(snapshot.points, &reward);

            if !outcome.deducted() {
                // 预期中的拒绝：余额不变，不产生记录，通知用户原因
                tracing::info!(
                    user_id = %user_id,
                    reward_id = %reward_id,
                    outcome = ?outcome,
                    "兑换被拒绝"
                );
                self.publish_redemption_update(user_id, &reward.name, &outcome, None);
                return Ok(RedeemResult {
                    outcome,
                    points: snapshot.points,
                    redemption: None,
                });
            }

            match self
                .accounts
                .compare_and_update(user_id, snapshot.version, |account| {
                    account.points = new_points;
                    account.updated_at = Utc::now();
                }) {
                Ok(updated) => {
                    let status = match outcome {
                        RedemptionOutcome::PendingApproval => RedemptionStatus::Pending,
                        _ => RedemptionStatus::Fulfilled,
                    };
                    let redemption = Redemption {
                        id: format!("RDM-{}", Uuid::new_v4()),
                        user_id: user_id.to_string(),
                        reward_id: reward.id.clone(),
                        reward_name: reward.name.clone(),
                        points_spent: reward.points_cost,
                        status,
                        requested_at: Utc::now(),
                        resolved_at: match status {
                            RedemptionStatus::Fulfilled => Some(Utc::now()),
                            _ => None,
                        },
                        notes: None,
                    };
                    self.redemptions.insert(&redemption.id, redemption.clone());

                    tracing::info!(
                        user_id = %user_id,
                        reward_id = %reward_id,
                        redemption_id = %redemption.id,
                        status = ?status,
                        new_balance = updated.points,
                        "兑换扣分成功"
                    );
                    self.publish_redemption_update(
                        user_id,
                        &reward.name,
                        &outcome,
                        Some(&redemption),
                    );

                    return Ok(RedeemResult {
                        outcome,
                        points: updated.points,
                        redemption: Some(redemption),
                    });
                }
                // 余额在判定期间被并发修改，重读快照重新判定
                Err(CasError::Conflict { .. }) => continue,
                Err(CasError::Missing) => {
                    return Err(HuruError::not_found("PointsAccount", user_id));
                }
            }
        }

        Err(HuruError::ConcurrentUpdate {
            entity: "PointsAccount".to_string(),
            id: user_id.to_string(),
        })
    }

    /// 用户的兑换历史，最新的在前
    pub fn user_redemptions(&self, user_id: &str) -> Vec<Redemption> {
        let mut records = self.redemptions.list_by(|r| r.user_id == user_id);
        records.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        records
    }

    /// 待审批队列，最早提交的在前
    pub fn pending_redemptions(&self) -> Vec<Redemption> {
        let mut records = self.redemptions.list_by(Redemption::is_pending);
        records.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        records
    }

    /// 批准兑换：Pending → Approved
    pub fn approve_redemption(
        &self,
        redemption_id: &str,
        notes: Option<String>,
    ) -> Result<Redemption> {
        let redemption =
            self.transition_redemption(redemption_id, RedemptionStatus::Pending, move |r| {
                r.status = RedemptionStatus::Approved;
                r.resolved_at = Some(Utc::now());
                r.notes = notes.clone();
            })?;

        tracing::info!(redemption_id = %redemption_id, "兑换已批准");
        self.publish_resolution(&redemption);
        Ok(redemption)
    }

    /// 驳回兑换：Pending → Rejected，并退还积分
    ///
    /// 扣分在提交时是暂记，驳回后退款使余额等于已终结结果之和。
    pub fn reject_redemption(
        &self,
        redemption_id: &str,
        notes: Option<String>,
    ) -> Result<Redemption> {
        let redemption =
            self.transition_redemption(redemption_id, RedemptionStatus::Pending, move |r| {
                r.status = RedemptionStatus::Rejected;
                r.resolved_at = Some(Utc::now());
                r.notes = notes.clone();
            })?;

        self.award_points(
            &redemption.user_id,
            redemption.points_spent,
            "redemption rejected, points refunded",
        )?;

        tracing::info!(
            redemption_id = %redemption_id,
            refunded = redemption.points_spent,
            "兑换已驳回并退款"
        );
        self.publish_resolution(&redemption);
        Ok(redemption)
    }

    /// 发放奖品：Approved → Fulfilled
    pub fn fulfill_redemption(&self, redemption_id: &str) -> Result<Redemption> {
        let redemption =
            self.transition_redemption(redemption_id, RedemptionStatus::Approved, |r| {
                r.status = RedemptionStatus::Fulfilled;
                r.resolved_at = Some(Utc::now());
            })?;

        tracing::info!(redemption_id = %redemption_id, "奖品已发放");
        self.publish_resolution(&redemption);
        Ok(redemption)
    }

    /// 原子状态迁移
    ///
    /// 在条目锁内校验当前状态再应用变更，两个管理员并发处理同一条
    /// 记录时只有一人成功。
    fn transition_redemption<F>(
        &self,
        redemption_id: &str,
        expected: RedemptionStatus,
        apply: F,
    ) -> Result<Redemption>
    where
        F: FnOnce(&mut Redemption),
    {
        let mut transitioned = false;
        let updated = self.redemptions.update(redemption_id, |redemption| {
            if redemption.status == expected {
                apply(redemption);
                transitioned = true;
            }
        });

        match updated {
            None => Err(HuruError::not_found("Redemption", redemption_id)),
            Some(redemption) if transitioned => Ok(redemption),
            Some(redemption) => Err(HuruError::conflict(format!(
                "兑换记录状态为 {:?}，无法从 {:?} 迁移",
                redemption.status, expected
            ))),
        }
    }

    fn publish_redemption_update(
        &self,
        user_id: &str,
        reward_name: &str,
        outcome: &RedemptionOutcome,
        redemption: Option<&Redemption>,
    ) {
        self.bus.publish(EventPayload::new(
            NotificationKind::RedemptionUpdate,
            user_id,
            json!({
                "rewardName": reward_name,
                "outcome": outcome,
                "redemptionId": redemption.map(|r| r.id.clone()),
            }),
            "progress-service",
        ));
    }

    fn publish_resolution(&self, redemption: &Redemption) {
        self.bus.publish(EventPayload::new(
            NotificationKind::RedemptionUpdate,
            &redemption.user_id,
            json!({
                "rewardName": redemption.reward_name,
                "status": redemption.status,
                "redemptionId": redemption.id,
                "notes": redemption.notes,
            }),
            "progress-service",
        ));
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 发起兑换请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub reward_id: String,
}

/// 审批操作请求
#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    pub notes: Option<String>,
}

/// 兑换记录响应
#[derive(Debug, Serialize, Deserialize)]
pub struct RedemptionResponse {
    pub redemption: Redemption,
}

/// 兑换记录列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct RedemptionListResponse {
    pub redemptions: Vec<Redemption>,
    pub total: usize,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建兑换路由
pub fn redemption_routes() -> Router<Arc<ProgressState>> {
    Router::new()
        .route("/users/{user_id}/redemptions", post(redeem))
        .route("/users/{user_id}/redemptions", get(list_user_redemptions))
        .route("/admin/redemptions/pending", get(list_pending))
        .route(
            "/admin/redemptions/{redemption_id}/approve",
            post(approve_redemption),
        )
        .route(
            "/admin/redemptions/{redemption_id}/reject",
            post(reject_redemption),
        )
        .route(
            "/admin/redemptions/{redemption_id}/fulfill",
            post(fulfill_redemption),
        )
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 发起兑换
#[tracing::instrument(skip(state, req))]
async fn redeem(
    State(state): State<Arc<ProgressState>>,
    Path(user_id): Path<String>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<RedeemResult>> {
    let result = state.redeem(&user_id, &req.reward_id)?;
    Ok(Json(result))
}

/// 用户兑换历史
#[tracing::instrument(skip(state))]
async fn list_user_redemptions(
    State(state): State<Arc<ProgressState>>,
    Path(user_id): Path<String>,
) -> Json<RedemptionListResponse> {
    let redemptions = state.user_redemptions(&user_id);
    let total = redemptions.len();
    Json(RedemptionListResponse { redemptions, total })
}

/// 待审批队列（管理员）
#[tracing::instrument(skip(state))]
async fn list_pending(State(state): State<Arc<ProgressState>>) -> Json<RedemptionListResponse> {
    let redemptions = state.pending_redemptions();
    let total = redemptions.len();
    Json(RedemptionListResponse { redemptions, total })
}

/// 批准兑换（管理员）
#[tracing::instrument(skip(state, req))]
async fn approve_redemption(
    State(state): State<Arc<ProgressState>>,
    Path(redemption_id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<RedemptionResponse>> {
    let redemption = state.approve_redemption(&redemption_id, req.notes)?;
    Ok(Json(RedemptionResponse { redemption }))
}

/// 驳回兑换（管理员）
#[tracing::instrument(skip(state, req))]
async fn reject_redemption(
    State(state): State<Arc<ProgressState>>,
    Path(redemption_id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<RedemptionResponse>> {
    let redemption = state.reject_redemption(&redemption_id, req.notes)?;
    Ok(Json(RedemptionResponse { redemption }))
}

/// 发放奖品（管理员）
#[tracing::instrument(skip(state))]
async fn fulfill_redemption(
    State(state): State<Arc<ProgressState>>,
    Path(redemption_id): Path<String>,
) -> Result<(StatusCode, Json<RedemptionResponse>)> {
    let redemption = state.fulfill_redemption(&redemption_id)?;
    Ok((StatusCode::OK, Json(RedemptionResponse { redemption })))
}

// ============================================================================
// 单元测试
// ============================================================================
