//! 服务共享状态
//!
//! 聚合成长域的全部内存存储与等级引擎。引擎放在 ArcSwap 中，
//! 管理员调整阈值表时整体替换，读路径无锁。

use std::sync::Arc;

use arc_swap::ArcSwap;

use gamification_engine::{EngineError, LevelEngine, Tier, TierRow, TierTable};
use huru_shared::config::{GamificationConfig, TierEntry};
use huru_shared::events::EventBus;
use huru_shared::store::MemoryStore;

use crate::models::{Challenge, CommunityEvent, PointsAccount, Redemption};

/// 成长服务状态
pub struct ProgressState {
    pub accounts: MemoryStore<PointsAccount>,
    pub redemptions: MemoryStore<Redemption>,
    pub rewards: MemoryStore<gamification_engine::Reward>,
    pub challenges: MemoryStore<Challenge>,
    pub events: MemoryStore<CommunityEvent>,
    engine: ArcSwap<LevelEngine>,
    pub bus: EventBus,
    /// 乐观并发写入的最大重试次数
    pub max_retries: u32,
    /// 每日签到奖励积分
    pub checkin_points: u64,
}

impl ProgressState {
    /// 由配置构建状态
    ///
    /// 阈值表在这里完成解析与校验，配置错误在启动阶段暴露。
    pub fn from_config(config: &GamificationConfig, bus: EventBus) -> Result<Self, EngineError> {
        let table = tier_table_from_entries(&config.tiers)?;
        Ok(Self {
            accounts: MemoryStore::new(),
            redemptions: MemoryStore::new(),
            rewards: MemoryStore::new(),
            challenges: MemoryStore::new(),
            events: MemoryStore::new(),
            engine: ArcSwap::from_pointee(LevelEngine::new(table)),
            bus,
            max_retries: config.redemption_max_retries,
            checkin_points: config.checkin_points,
        })
    }

    /// 使用默认阈值表构建（测试与本地演示用）
    pub fn with_defaults(bus: EventBus) -> Self {
        Self::from_config(&GamificationConfig::default(), bus)
            .expect("默认配置必定合法")
    }

    /// 获取当前等级引擎的快照
    pub fn engine(&self) -> Arc<LevelEngine> {
        self.engine.load_full()
    }

    /// 整体替换阈值表
    pub fn swap_tier_table(&self, table: TierTable) {
        self.engine.store(Arc::new(LevelEngine::new(table)));
    }
}

/// 把配置行解析为引擎阈值表
pub fn tier_table_from_entries(entries: &[TierEntry]) -> Result<TierTable, EngineError> {
    let rows = entries
        .iter()
        .map(|entry| {
            Ok(TierRow {
                tier: entry.name.parse::<Tier>()?,
                threshold: entry.threshold,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    TierTable::new(rows)
}
