//! 游戏化数据模型
//!
//! 等级、阈值表、奖品目录条目与兑换结果标签。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{EngineError, Result};

// ---------------------------------------------------------------------------
// Tier — 等级
// ---------------------------------------------------------------------------

/// 成长等级
///
/// 三级体系，顺序固定：Explorer → Builder → Leader。
/// 等级不单独存储，始终由积分对照阈值表推导。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Explorer,
    Builder,
    Leader,
}

impl Tier {
    /// 展示名称（产品文案）
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Explorer => "HURU Explorer",
            Self::Builder => "HURU Builder",
            Self::Leader => "HURU Leader",
        }
    }

    /// 获取下一个等级，Leader 已是最高等级，返回 None
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Explorer => Some(Self::Builder),
            Self::Builder => Some(Self::Leader),
            Self::Leader => None,
        }
    }
}

impl FromStr for Tier {
    type Err = EngineError;

    /// 从配置中的等级名解析，大小写不敏感
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "explorer" => Ok(Self::Explorer),
            "builder" => Ok(Self::Builder),
            "leader" => Ok(Self::Leader),
            other => Err(EngineError::UnknownTier(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// TierTable — 阈值表
// ---------------------------------------------------------------------------

/// 阈值表中的一行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRow {
    pub tier: Tier,
    /// 达到该等级所需的最低积分
    pub threshold: u64,
}

/// 等级阈值表
///
/// 有序配置数据，在构造时校验：非空、首行阈值为 0、阈值严格递增。
/// 校验失败属于配置错误，在启动阶段暴露，计算路径因此无失败分支。
/// 序列化形式就是行的列表，反序列化经过构造校验，非法表无法绕过。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<TierRow>", try_from = "Vec<TierRow>")]
pub struct TierTable {
    rows: Vec<TierRow>,
}

impl TierTable {
    /// 构造并校验阈值表
    pub fn new(rows: Vec<TierRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(EngineError::InvalidTierTable {
                reason: "阈值表不能为空".to_string(),
            });
        }
        if rows[0].threshold != 0 {
            return Err(EngineError::InvalidTierTable {
                reason: format!("首行阈值必须为 0，实际为 {}", rows[0].threshold),
            });
        }
        for pair in rows.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(EngineError::InvalidTierTable {
                    reason: format!(
                        "阈值必须严格递增: {:?}={} 不大于 {:?}={}",
                        pair[1].tier, pair[1].threshold, pair[0].tier, pair[0].threshold
                    ),
                });
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[TierRow] {
        &self.rows
    }

    /// 积分对应的行下标：阈值 ≤ points 的最大行
    pub(crate) fn row_index_for(&self, points: u64) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.threshold <= points)
            // 首行阈值为 0，任何 u64 积分都至少命中首行
            .unwrap_or(0)
    }
}

impl Default for TierTable {
    /// 产品默认阈值：Explorer=0, Builder=500, Leader=1500
    fn default() -> Self {
        Self {
            rows: vec![
                TierRow {
                    tier: Tier::Explorer,
                    threshold: 0,
                },
                TierRow {
                    tier: Tier::Builder,
                    threshold: 500,
                },
                TierRow {
                    tier: Tier::Leader,
                    threshold: 1500,
                },
            ],
        }
    }
}

impl TryFrom<Vec<TierRow>> for TierTable {
    type Error = EngineError;

    fn try_from(rows: Vec<TierRow>) -> Result<Self> {
        Self::new(rows)
    }
}

impl From<TierTable> for Vec<TierRow> {
    fn from(table: TierTable) -> Self {
        table.rows
    }
}

// ---------------------------------------------------------------------------
// LevelStatus — 等级计算结果
// ---------------------------------------------------------------------------

/// 等级计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStatus {
    pub tier: Tier,
    /// 等级内进度百分比，0.0..=100.0；最高等级恒为 100.0
    pub progress_percent: f64,
    /// 距下一等级还需的积分，最高等级为 None
    pub points_to_next: Option<u64>,
}

// ---------------------------------------------------------------------------
// Reward — 奖品目录条目
// ---------------------------------------------------------------------------

/// 奖品类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardKind {
    Airtime,
    Book,
    Voucher,
    Digital,
}

/// 奖品目录条目
///
/// 目录由管理员维护；引擎只读取 points_cost / is_available /
/// requires_approval 三个字段做兑换判定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points_cost: u64,
    pub kind: RewardKind,
    pub is_available: bool,
    pub requires_approval: bool,
}

// ---------------------------------------------------------------------------
// RedemptionOutcome — 兑换结果标签
// ---------------------------------------------------------------------------

/// 兑换被拒绝的原因
///
/// 这些是预期中的用户可见状况，不是错误；调用方据此展示提示文案。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    InsufficientPoints,
    OutOfStock,
}

/// 单次兑换尝试的结果标签
///
/// 以标签而非异常表达，调用方必须对每个分支处理。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedemptionOutcome {
    /// 扣分成功且无需人工审批，奖品立即发放
    Fulfilled,
    /// 扣分成功，等待管理员审批
    PendingApproval,
    /// 兑换被拒绝，余额不变
    Rejected(RejectReason),
}

impl RedemptionOutcome {
    /// 是否发生了扣分
    pub fn deducted(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::PendingApproval)
    }
}
