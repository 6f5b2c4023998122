//! 引擎集成测试
//!
//! 验证等级计算与兑换规则组合使用时的端到端行为：
//! 兑换扣分后等级/进度条随新余额正确回落。

use gamification_engine::{
    LevelEngine, RedemptionOutcome, RejectReason, Reward, RewardKind, RewardLedger, Tier,
};

fn catalog_reward(id: &str, cost: u64, available: bool, approval: bool) -> Reward {
    Reward {
        id: id.to_string(),
        name: format!("Reward {id}"),
        description: String::new(),
        points_cost: cost,
        kind: RewardKind::Voucher,
        is_available: available,
        requires_approval: approval,
    }
}

#[test]
fn redeem_then_recompute_level() {
    let engine = LevelEngine::default();

    // Builder 用户（750 分）兑换 500 分奖品后回落到 Explorer
    let before = engine.compute(750);
    assert_eq!(before.tier, Tier::Builder);

    let (outcome, new_points) =
        RewardLedger::redeem(750, &catalog_reward("RWD-1", 500, true, false));
    assert_eq!(outcome, RedemptionOutcome::Fulfilled);
    assert_eq!(new_points, 250);

    let after = engine.compute(new_points);
    assert_eq!(after.tier, Tier::Explorer);
    assert_eq!(after.points_to_next, Some(250));
    assert!((after.progress_percent - 50.0).abs() < f64::EPSILON);
}

#[test]
fn rejected_redemption_leaves_level_unchanged() {
    let engine = LevelEngine::default();

    let (outcome, new_points) =
        RewardLedger::redeem(1600, &catalog_reward("RWD-2", 800, false, true));
    assert_eq!(outcome, RedemptionOutcome::Rejected(RejectReason::OutOfStock));
    assert_eq!(new_points, 1600);

    let status = engine.compute(new_points);
    assert_eq!(status.tier, Tier::Leader);
    assert_eq!(status.progress_percent, 100.0);
}

#[test]
fn sequential_redemptions_drain_balance() {
    // 连续兑换直到余额不足，最后一次必须被拒绝且余额不再变化
    let reward = catalog_reward("RWD-3", 400, true, false);
    let mut points = 1000u64;

    let (o1, p1) = RewardLedger::redeem(points, &reward);
    assert_eq!(o1, RedemptionOutcome::Fulfilled);
    points = p1;

    let (o2, p2) = RewardLedger::redeem(points, &reward);
    assert_eq!(o2, RedemptionOutcome::Fulfilled);
    points = p2;

    let (o3, p3) = RewardLedger::redeem(points, &reward);
    assert_eq!(
        o3,
        RedemptionOutcome::Rejected(RejectReason::InsufficientPoints)
    );
    assert_eq!(p3, 200);
    assert_eq!(points, 200);
}
