//! 积分账户服务
//!
//! 账户是余额的唯一权威记录，所有变动走本模块的 CAS 写路径：
//! 读快照 → 锁外计算 → 带版本号写回，冲突则重读重试。
//! 等级始终由引擎按当前余额推导，不落库。

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use gamification_engine::{LevelStatus, Tier};
use huru_shared::config::TierEntry;
use huru_shared::error::{HuruError, Result};
use huru_shared::events::{EventPayload, NotificationKind};
use huru_shared::store::CasError;

use crate::models::{Badge, PointsAccount};
use crate::state::ProgressState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl ProgressState {
    /// 创建积分账户
    pub fn create_account(
        &self,
        user_id: Option<String>,
        display_name: String,
    ) -> Result<PointsAccount> {
        let user_id = user_id.unwrap_or_else(|| format!("USR-{}", Uuid::new_v4()));
        if self.accounts.contains(&user_id) {
            return Err(HuruError::AlreadyExists {
                entity: "PointsAccount".to_string(),
                field: "user_id".to_string(),
                value: user_id,
            });
        }

        let account = PointsAccount::new(user_id.clone(), display_name);
        self.accounts.insert(&user_id, account.clone());
        tracing::info!(user_id = %user_id, "积分账户已创建");
        Ok(account)
    }

    /// 获取账户
    pub fn get_account(&self, user_id: &str) -> Result<PointsAccount> {
        self.accounts
            .get(user_id)
            .ok_or_else(|| HuruError::not_found("PointsAccount", user_id))
    }

    /// 账户当前的等级状态
    pub fn level_status(&self, user_id: &str) -> Result<(PointsAccount, LevelStatus)> {
        let account = self.get_account(user_id)?;
        let status = self.engine().compute(account.points);
        Ok((account, status))
    }

    /// 活动加分
    ///
    /// 余额的单调递增路径（完成挑战、出席活动、审批退款等）。
    /// 跨越等级阈值时发布 LevelUp 通知事件。
    pub fn award_points(&self, user_id: &str, amount: u64, reason: &str) -> Result<PointsAccount> {
        self.mutate_account(user_id, |account| {
            account.points = account.points.saturating_add(amount);
            account.updated_at = Utc::now();
        })
        .inspect(|_| {
            tracing::info!(user_id = %user_id, amount, reason, "积分已入账");
        })
    }

    /// 每日签到
    ///
    /// 连续签到（与上次签到相隔恰好一天）累加连击，中断则重置为 1；
    /// 同一天重复签到是状态冲突。签到发放固定积分。
    pub fn check_in(&self, user_id: &str) -> Result<PointsAccount> {
        let now = Utc::now();
        let today = now.date_naive();
        let points = self.checkin_points;
        let engine = self.engine();

        // 同日判定必须基于写回时的快照，并发重复签到在重试后会
        // 读到已更新的 last_checkin 并被拒绝
        for _ in 0..=self.max_retries {
            let snapshot = self.get_account(user_id)?;
            if let Some(last) = snapshot.last_checkin
                && last.date_naive() == today
            {
                return Err(HuruError::conflict("今日已签到"));
            }

            let streak = match snapshot.last_checkin {
                Some(last)
                    if today.signed_duration_since(last.date_naive()).num_days() == 1 =>
                {
                    snapshot.streak_days + 1
                }
                _ => 1,
            };

            match self
                .accounts
                .compare_and_update(user_id, snapshot.version, |account| {
                    account.streak_days = streak;
                    account.last_checkin = Some(now);
                    account.points = account.points.saturating_add(points);
                    account.updated_at = now;
                }) {
                Ok(updated) => {
                    let tier_before = engine.compute(snapshot.points).tier;
                    let tier_after = engine.compute(updated.points).tier;
                    if tier_after > tier_before {
                        self.publish_level_up(user_id, tier_after, updated.points);
                    }
                    tracing::info!(
                        user_id = %user_id,
                        streak_days = updated.streak_days,
                        "签到成功"
                    );
                    return Ok(updated);
                }
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

    /// 授予徽章
    ///
    /// 徽章自带奖励积分，同一徽章不重复授予。
    pub fn grant_badge(&self, user_id: &str, badge: Badge) -> Result<PointsAccount> {
        let snapshot = self.get_account(user_id)?;
        if snapshot.badges.iter().any(|b| b.id == badge.id) {
            return Err(HuruError::conflict(format!("徽章已授予: {}", badge.id)));
        }

        let badge_points = badge.points;
        let badge_name = badge.name.clone();
        let updated = self.mutate_account(user_id, move |account| {
            account.points = account.points.saturating_add(badge_points);
            account.badges.push(badge.clone());
            account.updated_at = Utc::now();
        })?;

        tracing::info!(user_id = %user_id, badge = %badge_name, "徽章已授予");
        Ok(updated)
    }

    /// 账本写路径：乐观并发循环
    ///
    /// 每次尝试都重新读取快照再带版本号写回；重试耗尽返回
    /// `ConcurrentUpdate`。跨越等级阈值时在成功写入后发布 LevelUp。
    pub(crate) fn mutate_account<F>(&self, user_id: &str, apply: F) -> Result<PointsAccount>
    where
        F: Fn(&mut PointsAccount) + Clone,
    {
        let engine = self.engine();

        for _ in 0..=self.max_retries {
            let Some(snapshot) = self.accounts.get(user_id) else {
                return Err(HuruError::not_found("PointsAccount", user_id));
            };
            let tier_before = engine.compute(snapshot.points).tier;

            match self
                .accounts
                .compare_and_update(user_id, snapshot.version, apply.clone())
            {
                Ok(updated) => {
                    let tier_after = engine.compute(updated.points).tier;
                    if tier_after > tier_before {
                        self.publish_level_up(user_id, tier_after, updated.points);
                    }
                    return Ok(updated);
                }
                // 快照过期：有并发写入抢先，重读重试
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

    fn publish_level_up(&self, user_id: &str, tier: Tier, points: u64) {
        tracing::info!(user_id = %user_id, tier = ?tier, "用户升级");
        self.bus.publish(EventPayload::new(
            NotificationKind::LevelUp,
            user_id,
            json!({
                "tier": tier,
                "tierName": tier.display_name(),
                "points": points,
            }),
            "progress-service",
        ));
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 创建账户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    /// 不提供则自动生成
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub display_name: String,
}

/// 活动加分请求（管理员）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AwardPointsRequest {
    #[validate(range(min = 1))]
    pub amount: u64,
    #[validate(length(min = 1, max = 200))]
    pub reason: String,
}

/// 调整等级阈值表请求（管理员）
#[derive(Debug, Deserialize)]
pub struct UpdateTiersRequest {
    pub tiers: Vec<TierEntry>,
}

/// 授予徽章请求（管理员）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrantBadgeRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub description: String,
    pub icon: String,
    pub points: u64,
}

/// 账户响应
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub account: PointsAccount,
}

/// 账户列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountListResponse {
    pub accounts: Vec<PointsAccount>,
    pub total: usize,
}

/// 等级状态响应
///
/// 进度条渲染所需的全部数据。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelResponse {
    pub user_id: String,
    pub display_name: String,
    pub points: u64,
    pub tier: Tier,
    pub tier_name: String,
    pub progress_percent: f64,
    pub points_to_next: Option<u64>,
    pub streak_days: u32,
    pub badge_count: usize,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建账户路由
pub fn account_routes() -> Router<Arc<ProgressState>> {
    Router::new()
        .route("/users", get(list_accounts))
        .route("/users", post(create_account))
        .route("/users/{user_id}/account", get(get_account))
        .route("/users/{user_id}/level", get(get_level))
        .route("/users/{user_id}/checkin", post(check_in))
        .route("/admin/users/{user_id}/points", post(award_points))
        .route("/admin/users/{user_id}/badges", post(grant_badge))
        .route("/admin/gamification/tiers", put(update_tiers))
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 创建账户
#[tracing::instrument(skip(state, req))]
async fn create_account(
    State(state): State<Arc<ProgressState>>,
    Json(req): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    req.validate()?;
    let account = state.create_account(req.user_id, req.display_name)?;
    Ok((StatusCode::CREATED, Json(AccountResponse { account })))
}

/// 列出所有账户
async fn list_accounts(State(state): State<Arc<ProgressState>>) -> Json<AccountListResponse> {
    let accounts = state.accounts.list();
    let total = accounts.len();
    Json(AccountListResponse { accounts, total })
}

/// 获取账户详情
#[tracing::instrument(skip(state))]
async fn get_account(
    State(state): State<Arc<ProgressState>>,
    Path(user_id): Path<String>,
) -> Result<Json<AccountResponse>> {
    let account = state.get_account(&user_id)?;
    Ok(Json(AccountResponse { account }))
}

/// 获取等级状态
#[tracing::instrument(skip(state))]
async fn get_level(
    State(state): State<Arc<ProgressState>>,
    Path(user_id): Path<String>,
) -> Result<Json<LevelResponse>> {
    let (account, status) = state.level_status(&user_id)?;
    Ok(Json(LevelResponse {
        user_id: account.user_id,
        display_name: account.display_name,
        points: account.points,
        tier: status.tier,
        tier_name: status.tier.display_name().to_string(),
        progress_percent: status.progress_percent,
        points_to_next: status.points_to_next,
        streak_days: account.streak_days,
        badge_count: account.badges.len(),
    }))
}

/// 每日签到
#[tracing::instrument(skip(state))]
async fn check_in(
    State(state): State<Arc<ProgressState>>,
    Path(user_id): Path<String>,
) -> Result<Json<AccountResponse>> {
    let account = state.check_in(&user_id)?;
    Ok(Json(AccountResponse { account }))
}

/// 活动加分（管理员）
#[tracing::instrument(skip(state, req))]
async fn award_points(
    State(state): State<Arc<ProgressState>>,
    Path(user_id): Path<String>,
    Json(req): Json<AwardPointsRequest>,
) -> Result<Json<AccountResponse>> {
    req.validate()?;
    let account = state.award_points(&user_id, req.amount, &req.reason)?;
    Ok(Json(AccountResponse { account }))
}

/// 授予徽章（管理员）
#[tracing::instrument(skip(state, req))]
async fn grant_badge(
    State(state): State<Arc<ProgressState>>,
    Path(user_id): Path<String>,
    Json(req): Json<GrantBadgeRequest>,
) -> Result<(StatusCode, Json<AccountResponse>)> {
    req.validate()?;
    let badge = Badge {
        id: format!("BDG-{}", Uuid::new_v4()),
        name: req.name,
        description: req.description,
        icon: req.icon,
        points: req.points,
        earned_at: Utc::now(),
    };
    let account = state.grant_badge(&user_id, badge)?;
    Ok((StatusCode::CREATED, Json(AccountResponse { account })))
}

/// 调整等级阈值表（管理员）
///
/// 新表整体替换旧表，对后续所有等级计算立即生效；
/// 非法表（乱序、首行非 0、未知等级名）被拒绝，旧表保持不变。
#[tracing::instrument(skip(state, req))]
async fn update_tiers(
    State(state): State<Arc<ProgressState>>,
    Json(req): Json<UpdateTiersRequest>,
) -> Result<Json<serde_json::Value>> {
    let table = crate::state::tier_table_from_entries(&req.tiers)
        .map_err(|e| HuruError::Validation(e.to_string()))?;
    state.swap_tier_table(table);
    tracing::info!(tiers = req.tiers.len(), "等级阈值表已更新");
    Ok(Json(json!({ "updated": true })))
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

    fn test_state() -> (Arc<ProgressState>, tokio::sync::mpsc::Receiver<EventPayload>) {
        let (bus, rx) = EventBus::channel(64);
        (Arc::new(ProgressState::with_defaults(bus)), rx)
    }

    #[test]
    fn test_create_and_get_account() {
        let (state, _rx) = test_state();

        let account = state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();
        assert_eq!(account.points, 0);

        let fetched = state.get_account("USR-1").unwrap();
        assert_eq!(fetched.display_name, "JohnD");

        // 重复创建同一 user_id 冲突
        let err = state
            .create_account(Some("USR-1".to_string()), "Other".to_string())
            .unwrap_err();
        assert!(matches!(err, HuruError::AlreadyExists { .. }));
    }

    #[test]
    fn test_award_points_and_level_status() {
        let (state, _rx) = test_state();
        state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();

        state.award_points("USR-1", 750, "test").unwrap();

        let (account, status) = state.level_status("USR-1").unwrap();
        assert_eq!(account.points, 750);
        assert_eq!(status.tier, Tier::Builder);
        assert_eq!(status.points_to_next, Some(750));
        assert!((status.progress_percent - 25.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_level_up_event_published_once() {
        let (state, mut rx) = test_state();
        state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();

        // 跨越 Builder 阈值 → 一条 LevelUp
        state.award_points("USR-1", 600, "test").unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, NotificationKind::LevelUp);
        assert_eq!(event.data["tierName"], json!("HURU Builder"));

        // 同一等级内继续加分不再发事件
        state.award_points("USR-1", 100, "test").unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_check_in_streak() {
        let (state, _rx) = test_state();
        state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();

        let account = state.check_in("USR-1").unwrap();
        assert_eq!(account.streak_days, 1);
        assert_eq!(account.points, 5);

        // 同一天重复签到冲突
        let err = state.check_in("USR-1").unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));

        // 昨天签到过 → 连击 +1
        state.accounts.update("USR-1", |acc| {
            acc.last_checkin = Some(Utc::now() - chrono::Duration::days(1));
        });
        let account = state.check_in("USR-1").unwrap();
        assert_eq!(account.streak_days, 2);

        // 中断两天 → 连击重置
        state.accounts.update("USR-1", |acc| {
            acc.last_checkin = Some(Utc::now() - chrono::Duration::days(3));
        });
        let account = state.check_in("USR-1").unwrap();
        assert_eq!(account.streak_days, 1);
    }

    #[test]
    fn test_grant_badge_once() {
        let (state, _rx) = test_state();
        state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();

        let badge = Badge {
            id: "BDG-first-steps".to_string(),
            name: "First Steps".to_string(),
            description: "Completed your first challenge".to_string(),
            icon: "footsteps".to_string(),
            points: 25,
            earned_at: Utc::now(),
        };

        let account = state.grant_badge("USR-1", badge.clone()).unwrap();
        assert_eq!(account.badges.len(), 1);
        assert_eq!(account.points, 25);

        let err = state.grant_badge("USR-1", badge).unwrap_err();
        assert!(matches!(err, HuruError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_awards_all_land() {
        let (bus, _rx) = EventBus::channel(256);
        let mut config = huru_shared::config::GamificationConfig::default();
        // 并发压力下放宽重试预算，验证无丢失更新
        config.redemption_max_retries = 32;
        let state = Arc::new(ProgressState::from_config(&config, bus).unwrap());
        state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = Arc::clone(&state);
            handles.push(tokio::spawn(async move {
                state.award_points("USR-1", 10, "concurrent").unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(state.get_account("USR-1").unwrap().points, 80);
    }

    #[tokio::test]
    async fn test_level_endpoint() {
        let (state, _rx) = test_state();
        state
            .create_account(Some("USR-9".to_string()), "SarahW".to_string())
            .unwrap();
        state.award_points("USR-9", 1600, "seed").unwrap();

        let app = account_routes().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/users/USR-9/level")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let resp: LevelResponse = serde_json::from_slice(&body).unwrap();

        assert_eq!(resp.tier, Tier::Leader);
        assert_eq!(resp.tier_name, "HURU Leader");
        assert_eq!(resp.progress_percent, 100.0);
        assert_eq!(resp.points_to_next, None);
    }

    #[tokio::test]
    async fn test_create_account_endpoint_validates() {
        let (state, _rx) = test_state();
        let app = account_routes().with_state(state);

        // display_name 为空触发验证错误
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/users")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"displayName":""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_tiers_endpoint() {
        let (state, _rx) = test_state();
        state
            .create_account(Some("USR-1".to_string()), "JohnD".to_string())
            .unwrap();
        state.award_points("USR-1", 800, "seed").unwrap();

        let app = account_routes().with_state(Arc::clone(&state));
        let body = r#"{"tiers":[
            {"name":"explorer","threshold":0},
            {"name":"builder","threshold":1000},
            {"name":"leader","threshold":5000}
        ]}"#;
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/admin/gamification/tiers")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // 新阈值生效：800 分回落到 Explorer
        let (_, status) = state.level_status("USR-1").unwrap();
        assert_eq!(status.tier, Tier::Explorer);

        // 非法表被拒绝，旧表保持不变
        let app = account_routes().with_state(Arc::clone(&state));
        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/admin/gamification/tiers")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"tiers":[{"name":"builder","threshold":9}]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let (_, status) = state.level_status("USR-1").unwrap();
        assert_eq!(status.tier, Tier::Explorer);
    }
}
