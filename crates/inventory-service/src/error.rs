//! 仓储服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;

use crate::lifecycle::ProductAction;
use crate::models::ProductStatus;

/// 仓储服务错误类型
#[derive(Debug, Error)]
pub enum InventoryError {
    // === 资源不存在 ===
    #[error("产品不存在: {0}")]
    ProductNotFound(i64),

    #[error("库位不存在: {0}")]
    LocationNotFound(i64),

    #[error("冷库不存在: {0}")]
    ChamberNotFound(i64),

    #[error("客户不存在: {0}")]
    ClientNotFound(i64),

    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("出库申请不存在: {0}")]
    WithdrawalNotFound(i64),

    // === 生命周期 ===
    #[error("产品状态不允许此操作: product_id={product_id}, status={from}, action={action}")]
    InvalidTransition {
        product_id: i64,
        from: ProductStatus,
        action: ProductAction,
    },

    #[error("产品已处于终态，不可修改: product_id={product_id}, status={status}")]
    ProductReadOnly {
        product_id: i64,
        status: ProductStatus,
    },

    #[error("权限不足: {0}")]
    Forbidden(String),

    // === 库位与冷库 ===
    #[error("库位已被占用: {0}")]
    LocationOccupied(i64),

    #[error("库位已停用: {0}")]
    LocationInactive(i64),

    #[error("超出库位承重: location_id={location_id}, 上限 {capacity_kg}kg, 需要 {requested_kg}kg")]
    CapacityExceeded {
        location_id: i64,
        capacity_kg: f64,
        requested_kg: f64,
    },

    #[error("坐标超出冷库范围: chamber_id={chamber_id}, coordinates={coordinates}")]
    CoordinatesOutOfRange {
        chamber_id: i64,
        coordinates: String,
    },

    #[error("冷库未处于运行状态: {0}")]
    ChamberNotActive(i64),

    #[error("冷库仍有产品在库: chamber_id={chamber_id}, occupied={occupied}")]
    ChamberInUse { chamber_id: i64, occupied: i64 },

    // === 客户 ===
    #[error("客户已停用: {0}")]
    ClientInactive(i64),

    #[error("客户仍有在库产品: client_id={client_id}, products={products}")]
    ClientHasProducts { client_id: i64, products: i64 },

    // === 出库申请 ===
    #[error("出库申请已处理: withdrawal_id={0}")]
    WithdrawalNotPending(i64),

    #[error("产品已有待处理的出库申请: product_id={0}")]
    WithdrawalAlreadyPending(i64),

    // === 唯一性冲突 ===
    #[error("邮箱已被使用: {0}")]
    DuplicateEmail(String),

    #[error("证件号已存在: {0}")]
    DuplicateDocument(String),

    #[error("冷库名称已存在: {0}")]
    DuplicateChamberName(String),

    #[error("库位已存在: chamber_id={chamber_id}, code={code}")]
    DuplicateLocation { chamber_id: i64, code: String },

    // === 认证 ===
    #[error("邮箱或密码错误")]
    InvalidCredentials,

    #[error("账号已停用")]
    UserDisabled,

    #[error("账号已锁定，请 {0} 分钟后重试")]
    UserLocked(i64),

    #[error("至少需要保留一个启用的管理员")]
    LastAdmin,

    // === 系统错误 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("并发冲突，请刷新后重试: product_id={product_id}, expected_version={expected_version}")]
    ConcurrencyConflict {
        product_id: i64,
        expected_version: i32,
    },

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 仓储服务 Result 类型别名
pub type Result<T> = std::result::Result<T, InventoryError>;

impl InventoryError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::ConcurrencyConflict { .. })
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::ConcurrencyConflict { .. }
        )
    }

    /// 是否为资源不存在
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound(_)
                | Self::LocationNotFound(_)
                | Self::ChamberNotFound(_)
                | Self::ClientNotFound(_)
                | Self::UserNotFound(_)
                | Self::WithdrawalNotFound(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::LocationNotFound(_) => "LOCATION_NOT_FOUND",
            Self::ChamberNotFound(_) => "CHAMBER_NOT_FOUND",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::WithdrawalNotFound(_) => "WITHDRAWAL_NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ProductReadOnly { .. } => "PRODUCT_READ_ONLY",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::LocationOccupied(_) => "LOCATION_OCCUPIED",
            Self::LocationInactive(_) => "LOCATION_INACTIVE",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::CoordinatesOutOfRange { .. } => "COORDINATES_OUT_OF_RANGE",
            Self::ChamberNotActive(_) => "CHAMBER_NOT_ACTIVE",
            Self::ChamberInUse { .. } => "CHAMBER_IN_USE",
            Self::ClientInactive(_) => "CLIENT_INACTIVE",
            Self::ClientHasProducts { .. } => "CLIENT_HAS_PRODUCTS",
            Self::WithdrawalNotPending(_) => "WITHDRAWAL_NOT_PENDING",
            Self::WithdrawalAlreadyPending(_) => "WITHDRAWAL_ALREADY_PENDING",
            Self::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            Self::DuplicateDocument(_) => "DUPLICATE_DOCUMENT",
            Self::DuplicateChamberName(_) => "DUPLICATE_CHAMBER_NAME",
            Self::DuplicateLocation { .. } => "DUPLICATE_LOCATION",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UserDisabled => "USER_DISABLED",
            Self::UserLocked(_) => "USER_LOCKED",
            Self::LastAdmin => "LAST_ADMIN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(
            InventoryError::ConcurrencyConflict {
                product_id: 1,
                expected_version: 3
            }
            .is_retryable()
        );
        assert!(!InventoryError::ProductNotFound(1).is_retryable());
        assert!(!InventoryError::LocationOccupied(2).is_retryable());
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(InventoryError::LocationOccupied(1).is_business_error());
        assert!(InventoryError::LastAdmin.is_business_error());
        assert!(!InventoryError::Internal("boom".to_string()).is_business_error());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            InventoryError::InvalidTransition {
                product_id: 1,
                from: ProductStatus::Retirado,
                action: ProductAction::Move,
            }
            .error_code(),
            "INVALID_TRANSITION"
        );
        assert_eq!(
            InventoryError::CapacityExceeded {
                location_id: 1,
                capacity_kg: 10.0,
                requested_kg: 20.0
            }
            .error_code(),
            "CAPACITY_EXCEEDED"
        );
        assert_eq!(InventoryError::UserLocked(30).error_code(), "USER_LOCKED");
    }

    #[test]
    fn test_error_display() {
        let err = InventoryError::InvalidTransition {
            product_id: 9,
            from: ProductStatus::Cadastrado,
            action: ProductAction::RequestWithdrawal,
        };
        assert_eq!(
            err.to_string(),
            "产品状态不允许此操作: product_id=9, status=CADASTRADO, action=REQUEST_WITHDRAWAL"
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(InventoryError::ChamberNotFound(1).is_not_found());
        assert!(!InventoryError::LastAdmin.is_not_found());
    }
}
