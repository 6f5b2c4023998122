//! 等级计算
//!
//! 把累计积分映射为等级与等级内进度。纯函数：相同输入恒得相同输出。

use crate::models::{LevelStatus, TierTable};

/// 等级引擎
///
/// 持有一张已校验的阈值表。表由配置注入，引擎自身无可变状态。
#[derive(Debug, Clone)]
pub struct LevelEngine {
    table: TierTable,
}

impl LevelEngine {
    pub fn new(table: TierTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TierTable {
        &self.table
    }

    /// 计算积分对应的等级状态
    ///
    /// - 等级 = 阈值 ≤ points 的最高等级
    /// - 最高等级：进度恒为 100%，points_to_next 为 None
    /// - 其余：进度 = (points - 当前阈值) / (下一阈值 - 当前阈值) × 100，
    ///   夹取到 [0, 100]
    ///
    /// 积分为 u64，负数输入在类型层面不可表达。
    pub fn compute(&self, points: u64) -> LevelStatus {
        let rows = self.table.rows();
        let index = self.table.row_index_for(points);
        let current = rows[index];

        match rows.get(index + 1) {
            None => LevelStatus {
                tier: current.tier,
                progress_percent: 100.0,
                points_to_next: None,
            },
            Some(next) => {
                let span = (next.threshold - current.threshold) as f64;
                let gained = (points - current.threshold) as f64;
                let progress = (gained / span * 100.0).clamp(0.0, 100.0);
                LevelStatus {
                    tier: current.tier,
                    progress_percent: progress,
                    points_to_next: Some(next.threshold - points),
                }
            }
        }
    }
}

impl Default for LevelEngine {
    fn default() -> Self {
        Self::new(TierTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tier;

    #[test]
    fn test_compute_at_zero() {
        let engine = LevelEngine::default();
        let status = engine.compute(0);
        assert_eq!(status.tier, Tier::Explorer);
        assert_eq!(status.progress_percent, 0.0);
        assert_eq!(status.points_to_next, Some(500));
    }

    #[test]
    fn test_builder_band_has_exact_linear_progress() {
        let engine = LevelEngine::default();

        // [500, 1500) 区间内进度为 ((p-500)/1000)*100
        for points in [500u64, 600, 750, 1000, 1250, 1499] {
            let status = engine.compute(points);
            assert_eq!(status.tier, Tier::Builder, "points={points}");
            let expected = ((points - 500) as f64 / 1000.0) * 100.0;
            assert!(
                (status.progress_percent - expected).abs() < f64::EPSILON,
                "points={points}: {} != {expected}",
                status.progress_percent
            );
            assert_eq!(status.points_to_next, Some(1500 - points));
        }
    }

    #[test]
    fn test_leader_is_terminal() {
        let engine = LevelEngine::default();

        for points in [1500u64, 1501, 10_000, u64::MAX] {
            let status = engine.compute(points);
            assert_eq!(status.tier, Tier::Leader, "points={points}");
            assert_eq!(status.progress_percent, 100.0);
            assert_eq!(status.points_to_next, None);
        }
    }

    #[test]
    fn test_tier_boundaries() {
        let engine = LevelEngine::default();
        assert_eq!(engine.compute(499).tier, Tier::Explorer);
        assert_eq!(engine.compute(500).tier, Tier::Builder);
        assert_eq!(engine.compute(1499).tier, Tier::Builder);
        assert_eq!(engine.compute(1500).tier, Tier::Leader);
    }

    #[test]
    fn test_progress_is_monotonic_within_tier() {
        let engine = LevelEngine::default();
        let mut last = -1.0f64;
        for points in 500..1500u64 {
            let progress = engine.compute(points).progress_percent;
            assert!(progress >= last, "points={points}");
            last = progress;
        }
    }

    #[test]
    fn test_compute_is_pure() {
        let engine = LevelEngine::default();
        let a = engine.compute(750);
        let b = engine.compute(750);
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_table() {
        use crate::models::TierRow;

        // 运营调高 Leader 门槛后，1500 分回落到 Builder
        let table = TierTable::new(vec![
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
                threshold: 3000,
            },
        ])
        .unwrap();
        let engine = LevelEngine::new(table);

        let status = engine.compute(1500);
        assert_eq!(status.tier, Tier::Builder);
        assert_eq!(status.points_to_next, Some(1500));
        assert!((status.progress_percent - 40.0).abs() < 1e-9);
    }
}
