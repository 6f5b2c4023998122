//! 统一错误处理模块
//!
//! 定义各服务共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 注意：业务上的「预期结果」（积分不足、奖品缺货等）不属于错误，
//! 它们以兑换结果标签的形式返回，调用方必须对标签分支处理。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// 系统错误类型
#[derive(Debug, Error)]
pub enum HuruError {
    // ==================== 资源错误 ====================
    #[error("记录未找到: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("记录已存在: {entity} {field}={value}")]
    AlreadyExists {
        entity: String,
        field: String,
        value: String,
    },

    // ==================== 业务状态冲突 ====================
    #[error("状态冲突: {reason}")]
    Conflict { reason: String },

    /// 乐观并发写入在重试耗尽后仍然失败
    #[error("并发更新冲突: {entity} id={id}")]
    ConcurrentUpdate { entity: String, id: String },

    #[error("名额已满: {resource}")]
    CapacityExceeded { resource: String },

    // ==================== 验证错误 ====================
    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("无效的参数: {field} - {message}")]
    InvalidArgument { field: String, message: String },

    // ==================== 权限错误 ====================
    #[error("权限不足: {operation}")]
    Forbidden { operation: String },

    // ==================== 配置错误 ====================
    #[error("配置加载失败: {0}")]
    Config(#[from] ::config::ConfigError),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, HuruError>;

impl HuruError {
    /// 资源未找到的便捷构造
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// 状态冲突的便捷构造
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// 获取错误码
    ///
    /// 错误码是 API 契约的一部分，客户端用它做条件分支，变更视为破坏性变更。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::Conflict { .. } => "CONFLICT",
            Self::ConcurrentUpdate { .. } => "CONCURRENT_UPDATE",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyExists { .. }
            | Self::Conflict { .. }
            | Self::ConcurrentUpdate { .. }
            | Self::CapacityExceeded { .. } => StatusCode::CONFLICT,
            Self::Validation(_) | Self::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HuruError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Config(e) => {
                tracing::error!(error = %e, "配置错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "code": self.code(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for HuruError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
