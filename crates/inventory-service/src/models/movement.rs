//! 库存流水模型
//!
//! 流水只追加不修改，是产品位置和状态变化的审计记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Location, MovementType, ProductStatus};

/// 库存流水
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: i64,
    pub product_id: i64,
    pub movement_type: MovementType,
    pub from_location_id: Option<i64>,
    pub to_location_id: Option<i64>,
    /// 库位编码快照，库位删除后仍可追溯
    pub from_location_code: Option<String>,
    pub to_location_code: Option<String>,
    pub from_status: Option<ProductStatus>,
    pub to_status: ProductStatus,
    pub quantity: i32,
    pub weight_kg: f64,
    pub user_id: i64,
    pub reason: Option<String>,
    /// 系统自动生成（相对人工调整）
    pub automatic: bool,
    pub created_at: DateTime<Utc>,
}

/// 待写入的流水
///
/// product_id 由提交方在落库时填入（新建产品时尚无 ID）
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub from_location_id: Option<i64>,
    pub to_location_id: Option<i64>,
    pub from_location_code: Option<String>,
    pub to_location_code: Option<String>,
    pub from_status: Option<ProductStatus>,
    pub to_status: ProductStatus,
    pub quantity: i32,
    pub weight_kg: f64,
    pub user_id: i64,
    pub reason: Option<String>,
    pub automatic: bool,
}

impl NewMovement {
    /// 系统自动生成的流水，数量和重量默认为 0
    pub fn new(movement_type: MovementType, to_status: ProductStatus, user_id: i64) -> Self {
        Self {
            movement_type,
            from_location_id: None,
            to_location_id: None,
            from_location_code: None,
            to_location_code: None,
            from_status: None,
            to_status,
            quantity: 0,
            weight_kg: 0.0,
            user_id,
            reason: None,
            automatic: true,
        }
    }

    pub fn from_location(mut self, location: &Location) -> Self {
        self.from_location_id = Some(location.id);
        self.from_location_code = Some(location.code.clone());
        self
    }

    pub fn to_location(mut self, location: &Location) -> Self {
        self.to_location_id = Some(location.id);
        self.to_location_code = Some(location.code.clone());
        self
    }

    pub fn from_status(mut self, status: ProductStatus) -> Self {
        self.from_status = Some(status);
        self
    }

    pub fn goods(mut self, quantity: i32, weight_kg: f64) -> Self {
        self.quantity = quantity;
        self.weight_kg = weight_kg;
        self
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    /// 人工操作（调整、移除）产生的流水
    pub fn manual(mut self) -> Self {
        self.automatic = false;
        self
    }
}

/// 流水查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementFilter {
    pub product_id: Option<i64>,
    /// 匹配来源或目标库位
    pub location_id: Option<i64>,
    pub movement_type: Option<MovementType>,
    pub user_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn matches(&self, m: &Movement) -> bool {
        self.product_id.is_none_or(|id| m.product_id == id)
            && self.location_id.is_none_or(|id| {
                m.from_location_id == Some(id) || m.to_location_id == Some(id)
            })
            && self.movement_type.is_none_or(|t| m.movement_type == t)
            && self.user_id.is_none_or(|id| m.user_id == id)
            && self.since.is_none_or(|t| m.created_at >= t)
            && self.until.is_none_or(|t| m.created_at < t)
    }
}
