//! 产品写入单元
//!
//! 产品的每一次状态变化都打包成一个 [`ProductCommit`]，由仓储在同一个事务内落库：
//! 产品行（带版本校验）、库位占用变化、流水记录以及出库申请变化。

use super::{Movement, NewMovement, NewProduct, NewWithdrawal, Product, WithdrawalRequest};

/// 产品行写入
#[derive(Debug, Clone, PartialEq)]
pub enum ProductWrite {
    Insert(NewProduct),
    /// 仅当库中版本等于 expected_version 时写入，写入后版本加一
    Update {
        product: Product,
        expected_version: i32,
    },
}

/// 库位占用变化，落库时会在事务内重新校验
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationChange {
    /// 占用库位：要求库位启用、空闲且承重足够
    Occupy { location_id: i64, weight_kg: f64 },
    /// 释放库位，重量清零
    Release { location_id: i64 },
    /// 已占用库位上的重量调整
    Reweigh { location_id: i64, weight_kg: f64 },
}

impl LocationChange {
    pub fn location_id(&self) -> i64 {
        match self {
            Self::Occupy { location_id, .. }
            | Self::Release { location_id }
            | Self::Reweigh { location_id, .. } => *location_id,
        }
    }
}

/// 出库申请写入
#[derive(Debug, Clone, PartialEq)]
pub enum WithdrawalWrite {
    Insert(NewWithdrawal),
    /// 处理申请（批准/驳回/撤回），要求库中状态仍为 PENDING
    Update(WithdrawalRequest),
}

/// 一次原子提交
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCommit {
    pub product: ProductWrite,
    /// 按顺序执行，移库时先释放旧库位再占用新库位
    pub locations: Vec<LocationChange>,
    pub movement: Option<NewMovement>,
    pub withdrawal: Option<WithdrawalWrite>,
}

impl ProductCommit {
    pub fn insert(product: NewProduct) -> Self {
        Self {
            product: ProductWrite::Insert(product),
            locations: Vec::new(),
            movement: None,
            withdrawal: None,
        }
    }

    pub fn update(product: Product, expected_version: i32) -> Self {
        Self {
            product: ProductWrite::Update {
                product,
                expected_version,
            },
            locations: Vec::new(),
            movement: None,
            withdrawal: None,
        }
    }

    pub fn with_location(mut self, change: LocationChange) -> Self {
        self.locations.push(change);
        self
    }

    pub fn with_movement(mut self, movement: NewMovement) -> Self {
        self.movement = Some(movement);
        self
    }

    pub fn with_withdrawal(mut self, withdrawal: WithdrawalWrite) -> Self {
        self.withdrawal = Some(withdrawal);
        self
    }
}

/// 提交结果
#[derive(Debug, Clone, PartialEq)]
pub struct CommitResult {
    pub product: Product,
    pub movement: Option<Movement>,
    pub withdrawal: Option<WithdrawalRequest>,
}
