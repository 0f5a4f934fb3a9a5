//! 冷库模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ChamberStatus, Coordinates};

/// 冷库尺寸
///
/// 库位坐标按 区(quadra) / 侧(lado) / 排(fila) / 层(andar) 四级编排，每一维从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChamberDimensions {
    pub blocks: i32,
    pub sides: i32,
    pub rows: i32,
    pub levels: i32,
}

impl ChamberDimensions {
    pub fn new(blocks: i32, sides: i32, rows: i32, levels: i32) -> Self {
        Self {
            blocks,
            sides,
            rows,
            levels,
        }
    }

    /// 每一维都必须 ≥ 1
    pub fn is_valid(&self) -> bool {
        self.blocks >= 1 && self.sides >= 1 && self.rows >= 1 && self.levels >= 1
    }

    /// 坐标是否落在冷库范围内
    pub fn contains(&self, c: &Coordinates) -> bool {
        (1..=self.blocks).contains(&c.block)
            && (1..=self.sides).contains(&c.side)
            && (1..=self.rows).contains(&c.row)
            && (1..=self.levels).contains(&c.level)
    }

    /// 冷库可容纳的库位总数
    pub fn capacity(&self) -> i64 {
        self.blocks as i64 * self.sides as i64 * self.rows as i64 * self.levels as i64
    }

    /// 按 区 → 侧 → 排 → 层 的顺序枚举全部坐标
    pub fn iter_coordinates(&self) -> impl Iterator<Item = Coordinates> + '_ {
        (1..=self.blocks).flat_map(move |block| {
            (1..=self.sides).flat_map(move |side| {
                (1..=self.rows).flat_map(move |row| {
                    (1..=self.levels).map(move |level| Coordinates::new(block, side, row, level))
                })
            })
        })
    }
}

impl fmt::Display for ChamberDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{}x{}",
            self.blocks, self.sides, self.rows, self.levels
        )
    }
}

/// 冷库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Chamber {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// 目标温度（°C）
    pub temperature_target: Option<f64>,
    /// 目标湿度（%）
    pub humidity_target: Option<f64>,
    #[sqlx(flatten)]
    pub dimensions: ChamberDimensions,
    pub status: ChamberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chamber {
    /// 只有运行中的冷库可以接收新产品
    pub fn accepts_products(&self) -> bool {
        self.status == ChamberStatus::Active
    }
}

/// 新建冷库
#[derive(Debug, Clone, PartialEq)]
pub struct NewChamber {
    pub name: String,
    pub description: Option<String>,
    pub temperature_target: Option<f64>,
    pub humidity_target: Option<f64>,
    pub dimensions: ChamberDimensions,
    pub status: ChamberStatus,
}

/// 冷库占用情况汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChamberOccupancy {
    pub chamber_id: i64,
    pub chamber_name: String,
    pub total_locations: i64,
    pub active_locations: i64,
    pub occupied_locations: i64,
    pub stored_weight_kg: f64,
    pub capacity_kg: f64,
    /// 已占用库位 / 可用库位，0.0 ~ 1.0
    pub occupancy_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        let dims = ChamberDimensions::new(2, 2, 10, 4);
        assert!(dims.contains(&Coordinates::new(1, 1, 1, 1)));
        assert!(dims.contains(&Coordinates::new(2, 2, 10, 4)));
        assert!(!dims.contains(&Coordinates::new(3, 1, 1, 1)));
        assert!(!dims.contains(&Coordinates::new(1, 0, 1, 1)));
        assert!(!dims.contains(&Coordinates::new(1, 1, 11, 1)));
        assert!(!dims.contains(&Coordinates::new(1, 1, 1, 5)));
    }

    #[test]
    fn test_iter_coordinates_covers_capacity() {
        let dims = ChamberDimensions::new(2, 2, 3, 2);
        let all: Vec<_> = dims.iter_coordinates().collect();
        assert_eq!(all.len() as i64, dims.capacity());
        assert_eq!(all.first(), Some(&Coordinates::new(1, 1, 1, 1)));
        assert_eq!(all.last(), Some(&Coordinates::new(2, 2, 3, 2)));
        assert!(all.iter().all(|c| dims.contains(c)));
    }

    #[test]
    fn test_is_valid() {
        assert!(ChamberDimensions::new(1, 1, 1, 1).is_valid());
        assert!(!ChamberDimensions::new(0, 1, 1, 1).is_valid());
        assert!(!ChamberDimensions::new(1, 1, -2, 1).is_valid());
    }
}
