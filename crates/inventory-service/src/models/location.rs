//! 库位模型与容量规则

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InventoryError, Result};

/// 库位坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    #[sqlx(rename = "block_no")]
    pub block: i32,
    #[sqlx(rename = "side_no")]
    pub side: i32,
    #[sqlx(rename = "row_no")]
    pub row: i32,
    #[sqlx(rename = "level_no")]
    pub level: i32,
}

impl Coordinates {
    pub fn new(block: i32, side: i32, row: i32, level: i32) -> Self {
        Self {
            block,
            side,
            row,
            level,
        }
    }

    /// 库位编码，如 Q01-L1-F03-A2
    pub fn code(&self) -> String {
        format!(
            "Q{:02}-L{}-F{:02}-A{}",
            self.block, self.side, self.row, self.level
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// 库位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub chamber_id: i64,
    #[sqlx(flatten)]
    pub coordinates: Coordinates,
    pub code: String,
    pub max_capacity_kg: f64,
    pub current_weight_kg: f64,
    pub occupied: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// 检查库位能否放入指定重量的产品
    ///
    /// 依次检查：启用状态、是否已被占用、承重上限
    pub fn can_hold(&self, weight_kg: f64) -> Result<()> {
        if !self.active {
            return Err(InventoryError::LocationInactive(self.id));
        }
        if self.occupied {
            return Err(InventoryError::LocationOccupied(self.id));
        }
        self.check_weight(weight_kg)
    }

    /// 只校验承重，用于已占用库位上的产品重量调整
    pub fn check_weight(&self, weight_kg: f64) -> Result<()> {
        if weight_kg > self.max_capacity_kg {
            return Err(InventoryError::CapacityExceeded {
                location_id: self.id,
                capacity_kg: self.max_capacity_kg,
                requested_kg: weight_kg,
            });
        }
        Ok(())
    }

    /// 剩余承重
    pub fn free_capacity_kg(&self) -> f64 {
        (self.max_capacity_kg - self.current_weight_kg).max(0.0)
    }
}

/// 新建库位
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub chamber_id: i64,
    pub coordinates: Coordinates,
    pub max_capacity_kg: f64,
    pub active: bool,
}

impl NewLocation {
    pub fn code(&self) -> String {
        self.coordinates.code()
    }
}

/// 库位查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationFilter {
    pub chamber_id: Option<i64>,
    pub occupied: Option<bool>,
    pub active: Option<bool>,
    /// 至少能承载的重量
    pub min_capacity_kg: Option<f64>,
}

impl LocationFilter {
    pub fn matches(&self, loc: &Location) -> bool {
        self.chamber_id.is_none_or(|id| loc.chamber_id == id)
            && self.occupied.is_none_or(|o| loc.occupied == o)
            && self.active.is_none_or(|a| loc.active == a)
            && self.min_capacity_kg.is_none_or(|w| loc.max_capacity_kg >= w)
    }
}
