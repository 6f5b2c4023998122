//! 引擎错误类型
//!
//! 引擎的计算函数对合法输入是全函数；唯一的失败面在阈值表构造时，
//! 属于配置/编程错误，在启动阶段暴露。

use thiserror::Error;

/// 引擎错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("无效的等级阈值表: {reason}")]
    InvalidTierTable { reason: String },

    #[error("未知的等级名: {0}")]
    UnknownTier(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
