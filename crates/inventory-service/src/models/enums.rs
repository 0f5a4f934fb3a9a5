//! 仓储枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化，
//! 两端都使用 SCREAMING_SNAKE_CASE 文本存储。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 产品状态
///
/// 状态名沿用业务方的葡语术语，前端和报表都直接展示这些值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    /// 已登记 - 录入系统但尚未申请上架
    Cadastrado,
    /// 待上架 - 等待分配库位
    AguardandoLocacao,
    /// 已上架 - 占用一个库位
    Locado,
    /// 待出库 - 存在未处理的出库申请
    AguardandoRetirada,
    /// 已出库
    Retirado,
    /// 已移除（管理员下架/报废）
    Removido,
    /// 已取消（上架前作废）
    Cancelado,
}

impl ProductStatus {
    pub const ALL: [ProductStatus; 7] = [
        Self::Cadastrado,
        Self::AguardandoLocacao,
        Self::Locado,
        Self::AguardandoRetirada,
        Self::Retirado,
        Self::Removido,
        Self::Cancelado,
    ];

    /// 终态产品只读
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Retirado | Self::Removido | Self::Cancelado)
    }

    /// 该状态下产品是否占用库位
    pub fn holds_location(&self) -> bool {
        matches!(self, Self::Locado | Self::AguardandoRetirada)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cadastrado => "CADASTRADO",
            Self::AguardandoLocacao => "AGUARDANDO_LOCACAO",
            Self::Locado => "LOCADO",
            Self::AguardandoRetirada => "AGUARDANDO_RETIRADA",
            Self::Retirado => "RETIRADO",
            Self::Removido => "REMOVIDO",
            Self::Cancelado => "CANCELADO",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// 管理员 - 审批出库、移除产品、维护冷库和用户
    Admin,
    /// 操作员 - 日常入库、上架、移库和出库申请
    #[default]
    Operador,
}

impl UserRole {
    /// 当前角色是否满足所需角色（管理员满足所有角色要求）
    pub fn satisfies(&self, required: UserRole) -> bool {
        *self == Self::Admin || *self == required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Operador => "OPERADOR",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "OPERADOR" => Ok(Self::Operador),
            other => Err(format!("未知角色: {}", other)),
        }
    }
}

/// 冷库状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChamberStatus {
    /// 运行中 - 可入库
    #[default]
    Active,
    /// 维护中 - 不接收新产品，已有产品可出库
    Maintenance,
    /// 停用
    Inactive,
}

/// 包装形式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageType {
    /// 普通袋装
    #[default]
    Bag,
    /// 吨袋
    BigBag,
    /// 箱装
    Box,
    /// 散装
    Bulk,
}

/// 流水类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// 入库上架（+）
    Entry,
    /// 出库/移除（-）
    Exit,
    /// 库位间移动
    Transfer,
    /// 数量/重量调整
    Adjustment,
    /// 仅状态变化，不涉及库位
    StatusChange,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "ENTRY",
            Self::Exit => "EXIT",
            Self::Transfer => "TRANSFER",
            Self::Adjustment => "ADJUSTMENT",
            Self::StatusChange => "STATUS_CHANGE",
        }
    }
}

/// 出库申请状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    /// 待审批
    #[default]
    Pending,
    /// 已批准（产品已出库）
    Approved,
    /// 已驳回
    Rejected,
    /// 申请人撤回
    Cancelled,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
