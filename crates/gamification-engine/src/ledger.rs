//! 兑换规则
//!
//! 对单次兑换请求做有序判定并给出结果标签。检查顺序是产品决定：
//! 缺货优先于余额不足，保证用户先看到「缺货」而不是被误导去攒分。

use crate::models::{RedemptionOutcome, RejectReason, Reward};

/// 兑换规则引擎
///
/// 纯计算：输入余额与奖品条目，输出结果标签与新余额。
/// 余额的持有、并发控制与落账由调用方负责。
pub struct RewardLedger;

impl RewardLedger {
    /// 判定一次兑换请求
    ///
    /// 有序检查，命中即返回：
    /// 1. 奖品不可用 → `Rejected(OutOfStock)`，余额不变
    /// 2. 余额不足 → `Rejected(InsufficientPoints)`，余额不变
    /// 3. 扣除积分；需审批 → `PendingApproval`，否则 `Fulfilled`
    pub fn redeem(user_points: u64, reward: &Reward) -> (RedemptionOutcome, u64) {
        if !reward.is_available {
            return (
                RedemptionOutcome::Rejected(RejectReason::OutOfStock),
                user_points,
            );
        }
        if user_points < reward.points_cost {
            return (
                RedemptionOutcome::Rejected(RejectReason::InsufficientPoints),
                user_points,
            );
        }

        let new_points = user_points - reward.points_cost;
        let outcome = if reward.requires_approval {
            RedemptionOutcome::PendingApproval
        } else {
            RedemptionOutcome::Fulfilled
        };
        (outcome, new_points)
    }
}
