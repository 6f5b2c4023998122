//! 捐赠记录
//!
//! 记录捐赠并提供对外列表与管理端汇总。支付本身不在系统内发生，
//! M-Pesa 收款码只作展示字符串保存。

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use huru_shared::error::{HuruError, Result};

use crate::models::{Donation, PaymentMethod};
use crate::state::CommunityState;

// ============================================================================
// 服务逻辑
// ============================================================================

impl CommunityState {
    /// 记录捐赠
    pub fn record_donation(
        &self,
        donor_id: Option<String>,
        amount: u64,
        message: Option<String>,
        is_anonymous: bool,
        payment_method: PaymentMethod,
        till_number: Option<String>,
    ) -> Result<Donation> {
        if amount == 0 {
            return Err(HuruError::InvalidArgument {
                field: "amount".to_string(),
                message: "捐赠金额必须为正".to_string(),
            });
        }

        let donation = Donation {
            id: format!("DON-{}", Uuid::new_v4()),
            donor_id,
            amount,
            message,
            is_anonymous,
            timestamp: Utc::now(),
            payment_method,
            till_number,
        };
        self.donations.insert(&donation.id, donation.clone());
        tracing::info!(donation_id = %donation.id, amount, "捐赠已记录");
        Ok(donation)
    }

    /// 对外捐赠列表（匿名者隐去捐赠人），最新在前
    pub fn public_donations(&self) -> Vec<Donation> {
        let mut donations: Vec<Donation> = self
            .donations
            .list()
            .into_iter()
            .map(Donation::public_view)
            .collect();
        donations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        donations
    }

    /// 捐赠总额（KSH）
    pub fn donation_total(&self) -> u64 {
        self.donations
            .list()
            .iter()
            .map(|donation| donation.amount)
            .sum()
    }
}

// ============================================================================
// 请求/响应 DTO
// ============================================================================

/// 记录捐赠请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordDonationRequest {
    pub donor_id: Option<String>,
    #[validate(range(min = 1))]
    pub amount: u64,
    pub message: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub payment_method: PaymentMethod,
    pub till_number: Option<String>,
}

/// 捐赠响应
#[derive(Debug, Serialize, Deserialize)]
pub struct DonationResponse {
    pub donation: Donation,
}

/// 捐赠列表响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationListResponse {
    pub donations: Vec<Donation>,
    pub total: usize,
    pub total_amount: u64,
}

// ============================================================================
// 路由配置
// ============================================================================

/// 构建捐赠路由
pub fn donation_routes() -> Router<Arc<CommunityState>> {
    Router::new()
        .route("/donations", post(record_donation))
        .route("/donations", get(list_donations))
}

// ============================================================================
// Handler 实现
// ============================================================================

/// 记录捐赠
#[tracing::instrument(skip(state, req))]
async fn record_donation(
    State(state): State<Arc<CommunityState>>,
    Json(req): Json<RecordDonationRequest>,
) -> Result<(StatusCode, Json<DonationResponse>)> {
    req.validate()?;
    let donation = state.record_donation(
        req.donor_id,
        req.amount,
        req.message,
        req.is_anonymous,
        req.payment_method,
        req.till_number,
    )?;
    Ok((StatusCode::CREATED, Json(DonationResponse { donation })))
}

/// 捐赠列表
#[tracing::instrument(skip(state))]
async fn list_donations(State(state): State<Arc<CommunityState>>) -> Json<DonationListResponse> {
    let donations = state.public_donations();
    let total = donations.len();
    let total_amount = state.donation_total();
    Json(DonationListResponse {
        donations,
        total,
        total_amount,
    })
}

// ============================================================================
// 单元测试
// ============================================================================
