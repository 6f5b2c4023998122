//! 奖品目录
//!
//! 管理员维护的静态目录。引擎只读取兑换判定所需字段；
//! 上下架直接切换 `is_available`，下架奖品在兑换时按缺货处理。

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use gamification_engine::{Reward, RewardKind};
use huru_shared::error::{HuruError, Result};

use crate::state::ProgressState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl ProgressState {
    /// 获取奖品
    pub fn get_reward(&self, reward_id: &str) -> Result<Reward> {
        self.rewards
            .get(reward_id)
            .ok_or_else(|| HuruError::not_found("Reward", reward_id))
    }

    /// 新增目录条目
    pub fn create_reward(
        &self,
        name: String,
        description: String,
        points_cost: u64,
        kind: RewardKind,
        requires_approval: bool,
    ) -> Result<Reward> {
        if points_cost == 0 {
            return Err(HuruError::InvalidArgument {
                field: "points_cost".to_string(),
                message: "必须为正整数".to_string(),
            });
        }

        let reward = Reward {
            id: format!("RWD-{}", Uuid::new_v4()),
            name,
            description,
            points_cost,
            kind,
            is_available: true,
            requires_approval,
        };
        self.rewards.insert(&reward.id, reward.clone());
        tracing::info!(reward_id = %reward.id, "奖品已上架");
        Ok(reward)
    }

    /// 切换上下架状态
    pub fn set_reward_availability(&self, reward_id: &str, available: bool) -> Result<Reward> {
        self.rewards
            .update(reward_id, |reward| reward.is_available = available)
            .ok_or_else(|| HuruError::not_found("Reward", reward_id))
    }
}

/// 默认奖品目录
///
/// 与产品上线时的六件奖品一致，供 populate 播种。
pub fn default_rewards() -> Vec<Reward> {
    let fixture = [
        (
            "Airtime - KSh 100",
            "Mobile airtime credit for your phone",
            200u64,
            RewardKind::Airtime,
            true,
            true,
        ),
        (
            "Inspirational Book",
            "Choose from our collection of inspiring books",
            500,
            RewardKind::Book,
            true,
            true,
        ),
        (
            "Coffee Shop Voucher",
            "KSh 300 voucher for local coffee shops",
            600,
            RewardKind::Voucher,
            true,
            true,
        ),
        (
            "Digital Badge Collection",
            "Exclusive digital badges for your profile",
            150,
            RewardKind::Digital,
            true,
            false,
        ),
        (
            "Airtime - KSh 500",
            "Premium mobile airtime credit",
            1000,
            RewardKind::Airtime,
            true,
            true,
        ),
        (
            "Study Materials Kit",
            "Notebooks, pens, and study accessories",
            800,
            RewardKind::Voucher,
            false,
            true,
        ),
    ];

    fixture
        .into_iter()
        .enumerate()
        .map(
            |(index, (name, description, cost, kind, available, approval))| Reward {
                id: format!("RWD-{:03}", index + 1),
                name: name.to_string(),
                description: description.to_string(),
                points_cost: cost,
                kind,
                is_available: available,
                requires_approval: approval,
            },
        )
        .collect()
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 目录查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRewardsQuery {
    /// 仅返回可兑换的奖品
    #[serde(default)]
    pub available_only: bool,
}

/// 新增奖品请求（管理员）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRewardRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub description: String,
    pub points_cost: u64,
    pub kind: RewardKind,
    #[serde(default)]
    pub requires_approval: bool,
}

/// 上下架请求（管理员）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAvailabilityRequest {
    pub is_available: bool,
}

/// 奖品响应
#[derive(Debug, Serialize, Deserialize)]
pub struct RewardResponse {
    pub reward: Reward,
}

/// 奖品列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct RewardListResponse {
    pub rewards: Vec<Reward>,
    pub total: usize,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建目录路由
pub fn catalog_routes() -> Router<Arc<ProgressState>> {
    Router::new()
        .route("/rewards", get(list_rewards))
        .route("/rewards/{reward_id}", get(get_reward))
        .route("/admin/rewards", post(create_reward))
        .route(
            "/admin/rewards/{reward_id}/availability",
            put(set_availability),
        )
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 获取目录列表
#[tracing::instrument(skip(state))]
async fn list_rewards(
    State(state): State<Arc<ProgressState>>,
    Query(query): Query<ListRewardsQuery>,
) -> Json<RewardListResponse> {
    let mut rewards = state
        .rewards
        .list_by(|reward| !query.available_only || reward.is_available);
    // 目录按积分从低到高展示
    rewards.sort_by_key(|reward| reward.points_cost);

    let total = rewards.len();
    Json(RewardListResponse { rewards, total })
}

/// 获取奖品详情
#[tracing::instrument(skip(state))]
async fn get_reward(
    State(state): State<Arc<ProgressState>>,
    Path(reward_id): Path<String>,
) -> Result<Json<RewardResponse>> {
    let reward = state.get_reward(&reward_id)?;
    Ok(Json(RewardResponse { reward }))
}

/// 新增奖品（管理员）
#[tracing::instrument(skip(state, req))]
async fn create_reward(
    State(state): State<Arc<ProgressState>>,
    Json(req): Json<CreateRewardRequest>,
) -> Result<(StatusCode, Json<RewardResponse>)> {
    req.validate()?;
    let reward = state.create_reward(
        req.name,
        req.description,
        req.points_cost,
        req.kind,
        req.requires_approval,
    )?;
    Ok((StatusCode::CREATED, Json(RewardResponse { reward })))
}

/// 上下架（管理员）
#[tracing::instrument(skip(state))]
async fn set_availability(
    State(state): State<Arc<ProgressState>>,
    Path(reward_id): Path<String>,
    Json(req): Json<SetAvailabilityRequest>,
) -> Result<Json<RewardResponse>> {
    let reward = state.set_reward_availability(&reward_id, req.is_available)?;
    tracing::info!(
        reward_id = %reward_id,
        is_available = req.is_available,
        "奖品上下架状态已更新"
    );
    Ok(Json(RewardResponse { reward }))
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use huru_shared::events::EventBus;
    use tower::ServiceExt;

    fn test_state() -> Arc<ProgressState> {
        let (bus, _rx) = EventBus::channel(16);
        let state = ProgressState::with_defaults(bus);
        state
            .rewards
            .insert_many(default_rewards(), |reward| reward.id.clone());
        Arc::new(state)
    }

    #[test]
    fn test_default_rewards_fixture() {
        let rewards = default_rewards();
        assert_eq!(rewards.len(), 6);

        // 数字徽章是唯一免审批奖品
        let auto: Vec<_> = rewards.iter().filter(|r| !r.requires_approval).collect();
        assert_eq!(auto.len(), 1);
        assert_eq!(auto[0].kind, RewardKind::Digital);

        // 学习用品套装缺货
        let out_of_stock: Vec<_> = rewards.iter().filter(|r| !r.is_available).collect();
        assert_eq!(out_of_stock.len(), 1);
        assert_eq!(out_of_stock[0].name, "Study Materials Kit");
    }

    #[test]
    fn test_create_reward_rejects_zero_cost() {
        let state = test_state();
        let err = state
            .create_reward(
                "Free".to_string(),
                String::new(),
                0,
                RewardKind::Digital,
                false,
            )
            .unwrap_err();
        assert!(matches!(err, HuruError::InvalidArgument { .. }));
    }

    #[test]
    fn test_set_availability() {
        let state = test_state();

        let reward = state.set_reward_availability("RWD-001", false).unwrap();
        assert!(!reward.is_available);

        let reward = state.set_reward_availability("RWD-001", true).unwrap();
        assert!(reward.is_available);

        assert!(state.set_reward_availability("RWD-999", true).is_err());
    }

    #[tokio::test]
    async fn test_list_rewards_endpoint_sorted_and_filtered() {
        let app = catalog_routes().with_state(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/rewards?availableOnly=true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let resp: RewardListResponse = serde_json::from_slice(&body).unwrap();

        // 缺货的 Study Materials Kit 被过滤
        assert_eq!(resp.total, 5);
        // 按积分升序
        let costs: Vec<u64> = resp.rewards.iter().map(|r| r.points_cost).collect();
        let mut sorted = costs.clone();
        sorted.sort_unstable();
        assert_eq!(costs, sorted);
    }
}
