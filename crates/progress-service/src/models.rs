//! 成长服务数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use huru_shared::store::Versioned;

// ---------------------------------------------------------------------------
// PointsAccount — 积分账户
// ---------------------------------------------------------------------------

/// 已获得的徽章
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    /// 获得徽章时一并发放的积分
    pub points: u64,
    pub earned_at: DateTime<Utc>,
}

/// 积分账户
///
/// 余额不变量：永不为负（u64 + 兑换规则的有序检查共同保证）。
/// 等级不落库，展示时由引擎按当前余额推导。
/// `version` 由存储维护，供乐观并发写入校验。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsAccount {
    pub user_id: String,
    pub display_name: String,
    pub points: u64,
    /// 连续签到天数
    pub streak_days: u32,
    pub last_checkin: Option<DateTime<Utc>>,
    pub badges: Vec<Badge>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PointsAccount {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            points: 0,
            streak_days: 0,
            last_checkin: None,
            badges: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Versioned for PointsAccount {
    fn version(&self) -> u64 {
        self.version
    }
    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

// ---------------------------------------------------------------------------
// Redemption — 兑换记录
// ---------------------------------------------------------------------------

/// 兑换记录状态
///
/// 状态机：Pending → Approved → Fulfilled，或 Pending → Rejected。
/// 无需审批的兑换直接以 Fulfilled 入库。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

/// 兑换记录
///
/// 只有发生扣分的兑换才会入库；被拒绝的尝试（缺货 / 余额不足）
/// 不产生记录，结果标签直接返回给调用方。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    /// 冗余存储，审批列表展示用
    pub reward_name: String,
    pub points_spent: u64,
    pub status: RedemptionStatus,
    pub requested_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Redemption {
    /// 是否仍在等待管理员处理
    pub fn is_pending(&self) -> bool {
        self.status == RedemptionStatus::Pending
    }

    /// 是否已终结（发放或驳回）
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            RedemptionStatus::Fulfilled | RedemptionStatus::Rejected
        )
    }
}

// ---------------------------------------------------------------------------
// Challenge — 挑战
// ---------------------------------------------------------------------------

/// 挑战类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Reading,
    Walking,
    Meditation,
    Service,
    Creative,
}

/// 挑战
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: ChallengeKind,
    pub duration_days: u32,
    /// 完成挑战发放的积分
    pub points: u64,
    pub participants: Vec<String>,
    /// 已完成并领取积分的用户，保证每人只加一次分
    pub completions: Vec<String>,
    pub created_by: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

impl Challenge {
    pub fn has_joined(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn has_completed(&self, user_id: &str) -> bool {
        self.completions.iter().any(|p| p == user_id)
    }
}

// ---------------------------------------------------------------------------
// CommunityEvent — 社区活动
// ---------------------------------------------------------------------------

/// 活动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Workshop,
    Webinar,
    Meetup,
    Challenge,
    Prayer,
}

/// 社区活动
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: EventKind,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    pub is_virtual: bool,
    /// None 表示不限名额
    pub max_participants: Option<u32>,
    pub participants: Vec<String>,
    /// 已出席并领取积分的用户
    pub attended: Vec<String>,
    pub created_by: String,
    pub is_active: bool,
    /// 出席发放的积分
    pub points: u64,
}

impl CommunityEvent {
    pub fn has_registered(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn has_attended(&self, user_id: &str) -> bool {
        self.attended.iter().any(|p| p == user_id)
    }

    /// 是否还有名额
    pub fn has_capacity(&self) -> bool {
        match self.max_participants {
            Some(max) => (self.participants.len() as u32) < max,
            None => true,
        }
    }
}
