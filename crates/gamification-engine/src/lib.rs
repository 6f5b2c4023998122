//! 游戏化计算核心
//!
//! 两条纯规则，无 I/O、无内部状态：
//!
//! - [`LevelEngine`]: 累计积分 → 等级 + 等级内进度百分比 + 距下一等级积分
//! - [`RewardLedger`]: 兑换请求 → 兑换结果标签 + 新积分余额
//!
//! 积分账户的持有与并发控制在 progress-service 中完成，本 crate
//! 只负责计算；等级阈值表由调用方以配置数据注入。

pub mod error;
pub mod ledger;
pub mod level;
pub mod models;

pub use error::EngineError;
pub use ledger::RewardLedger;
pub use level::LevelEngine;
pub use models::{
    LevelStatus, RedemptionOutcome, RejectReason, Reward, RewardKind, Tier, TierRow, TierTable,
};
