//! 出库申请模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WithdrawalStatus;

/// 出库申请
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: i64,
    pub product_id: i64,
    pub requested_by: i64,
    pub reason: String,
    /// 申请出库数量（件/袋）
    pub quantity: i32,
    /// 申请时产品总数量，用于区分全部出库与部分出库
    pub product_quantity: i32,
    pub status: WithdrawalStatus,
    pub decided_by: Option<i64>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WithdrawalRequest {
    pub fn is_partial(&self) -> bool {
        self.quantity < self.product_quantity
    }

    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }
}

/// 新建出库申请（product_id 由提交方填入）
#[derive(Debug, Clone, PartialEq)]
pub struct NewWithdrawal {
    pub requested_by: i64,
    pub reason: String,
    pub quantity: i32,
    pub product_quantity: i32,
}

/// 出库申请查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WithdrawalFilter {
    pub status: Option<WithdrawalStatus>,
    pub product_id: Option<i64>,
    pub requested_by: Option<i64>,
}

impl WithdrawalFilter {
    pub fn matches(&self, w: &WithdrawalRequest) -> bool {
        self.status.is_none_or(|s| w.status == s)
            && self.product_id.is_none_or(|id| w.product_id == id)
            && self.requested_by.is_none_or(|id| w.requested_by == id)
    }
}
