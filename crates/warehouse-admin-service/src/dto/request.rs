//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构。格式校验在这里完成，
//! 业务规则（状态、容量、唯一性等）由服务层校验。

use chrono::{DateTime, NaiveDate, Utc};
use inventory::models::{
    ChamberDimensions, ChamberStatus, ClientFilter, Coordinates, LocationFilter, MovementFilter,
    MovementType, NewChamber, NewClient, NewLocation, PageRequest, ProductFilter, ProductPatch,
    ProductStatus, StorageType, UserFilter, UserRole, WithdrawalFilter, WithdrawalStatus,
};
use inventory::service::{ChamberPatch, ClientPatch, CreateProduct, CreateUser, LocationPatch, UserPatch};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;

/// 分页参数默认值
fn page_request(page: Option<i64>, page_size: Option<i64>) -> PageRequest {
    let defaults = PageRequest::default();
    PageRequest::new(
        page.unwrap_or(defaults.page).max(1),
        page_size.unwrap_or(defaults.page_size),
    )
}

// ============================================
// 认证
// ============================================

/// 登录请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "密码长度必须在 1-128 之间"))]
    pub password: String,
}

/// 修改密码请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub old_password: String,
    #[validate(length(min = 8, max = 128, message = "新密码长度必须在 8-128 之间"))]
    pub new_password: String,
}

// ============================================
// 用户
// ============================================

/// 创建用户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "姓名长度必须在 1-100 之间"))]
    pub name: String,
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "密码长度必须在 8-128 之间"))]
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

impl From<CreateUserRequest> for CreateUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role,
        }
    }
}

/// 更新用户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            role: req.role,
            active: req.active,
            password: req.password,
        }
    }
}

/// 用户查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    pub keyword: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl UserQuery {
    pub fn into_parts(self) -> (UserFilter, PageRequest) {
        let page = page_request(self.page, self.page_size);
        let filter = UserFilter {
            keyword: self.keyword,
            role: self.role,
            active: self.active,
        };
        (filter, page)
    }
}

// ============================================
// 客户
// ============================================

/// 创建客户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "客户名称长度必须在 1-200 之间"))]
    pub name: String,
    /// CPF 或 CNPJ，可带分隔符
    #[validate(length(min = 11, max = 20, message = "证件号长度不正确"))]
    pub document: String,
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
}

impl From<CreateClientRequest> for NewClient {
    fn from(req: CreateClientRequest) -> Self {
        Self {
            name: req.name,
            document: req.document,
            email: req.email,
            phone: req.phone,
            address: req.address,
            contact_person: req.contact_person,
        }
    }
}

/// 更新客户请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 11, max = 20))]
    pub document: Option<String>,
    #[validate(email(message = "邮箱格式不正确"))]
    pub email: Option<String>,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    pub active: Option<bool>,
}

impl From<UpdateClientRequest> for ClientPatch {
    fn from(req: UpdateClientRequest) -> Self {
        Self {
            name: req.name,
            document: req.document,
            email: req.email,
            phone: req.phone,
            address: req.address,
            contact_person: req.contact_person,
            active: req.active,
        }
    }
}

/// 客户查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientQuery {
    pub keyword: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ClientQuery {
    pub fn into_parts(self) -> (ClientFilter, PageRequest) {
        let page = page_request(self.page, self.page_size);
        let filter = ClientFilter {
            keyword: self.keyword,
            active: self.active,
        };
        (filter, page)
    }
}

// ============================================
// 冷库与库位
// ============================================

/// 创建冷库请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateChamberRequest {
    #[validate(length(min = 1, max = 100, message = "冷库名称长度必须在 1-100 之间"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = -40.0, max = 40.0, message = "目标温度超出范围"))]
    pub temperature_target: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0, message = "目标湿度必须在 0-100 之间"))]
    pub humidity_target: Option<f64>,
    #[validate(range(min = 1, max = 100))]
    pub blocks: i32,
    #[validate(range(min = 1, max = 100))]
    pub sides: i32,
    #[validate(range(min = 1, max = 100))]
    pub rows: i32,
    #[validate(range(min = 1, max = 100))]
    pub levels: i32,
    #[serde(default)]
    pub status: ChamberStatus,
}

impl From<CreateChamberRequest> for NewChamber {
    fn from(req: CreateChamberRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            temperature_target: req.temperature_target,
            humidity_target: req.humidity_target,
            dimensions: ChamberDimensions::new(req.blocks, req.sides, req.rows, req.levels),
            status: req.status,
        }
    }
}

/// 更新冷库请求
///
/// 尺寸四个字段必须同时提供
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChamberRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = -40.0, max = 40.0))]
    pub temperature_target: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub humidity_target: Option<f64>,
    #[validate(range(min = 1, max = 100))]
    pub blocks: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub sides: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub rows: Option<i32>,
    #[validate(range(min = 1, max = 100))]
    pub levels: Option<i32>,
}

impl TryFrom<UpdateChamberRequest> for ChamberPatch {
    type Error = ApiError;

    fn try_from(req: UpdateChamberRequest) -> Result<Self, Self::Error> {
        let dimensions = match (req.blocks, req.sides, req.rows, req.levels) {
            (Some(b), Some(s), Some(r), Some(l)) => Some(ChamberDimensions::new(b, s, r, l)),
            (None, None, None, None) => None,
            _ => {
                return Err(ApiError::Validation(
                    "blocks/sides/rows/levels 必须同时提供".to_string(),
                ));
            }
        };

        Ok(Self {
            name: req.name,
            description: req.description,
            temperature_target: req.temperature_target,
            humidity_target: req.humidity_target,
            dimensions,
        })
    }
}

/// 冷库状态变更请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChamberStatusRequest {
    pub status: ChamberStatus,
}

/// 批量生成库位请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLocationsRequest {
    #[validate(range(exclusive_min = 0.0, message = "库位承重必须大于 0"))]
    pub max_capacity_kg: f64,
}

/// 创建库位请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationRequest {
    pub chamber_id: i64,
    #[validate(range(min = 1))]
    pub block: i32,
    #[validate(range(min = 1))]
    pub side: i32,
    #[validate(range(min = 1))]
    pub row: i32,
    #[validate(range(min = 1))]
    pub level: i32,
    #[validate(range(exclusive_min = 0.0, message = "库位承重必须大于 0"))]
    pub max_capacity_kg: f64,
    pub active: Option<bool>,
}

impl From<CreateLocationRequest> for NewLocation {
    fn from(req: CreateLocationRequest) -> Self {
        Self {
            chamber_id: req.chamber_id,
            coordinates: Coordinates::new(req.block, req.side, req.row, req.level),
            max_capacity_kg: req.max_capacity_kg,
            active: req.active.unwrap_or(true),
        }
    }
}

/// 更新库位请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    #[validate(range(exclusive_min = 0.0))]
    pub max_capacity_kg: Option<f64>,
    pub active: Option<bool>,
}

impl From<UpdateLocationRequest> for LocationPatch {
    fn from(req: UpdateLocationRequest) -> Self {
        Self {
            max_capacity_kg: req.max_capacity_kg,
            active: req.active,
        }
    }
}

/// 库位查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationQuery {
    pub chamber_id: Option<i64>,
    pub occupied: Option<bool>,
    pub active: Option<bool>,
    pub min_capacity_kg: Option<f64>,
}

impl From<LocationQuery> for LocationFilter {
    fn from(query: LocationQuery) -> Self {
        Self {
            chamber_id: query.chamber_id,
            occupied: query.occupied,
            active: query.active,
            min_capacity_kg: query.min_capacity_kg,
        }
    }
}

/// 可用库位查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableLocationQuery {
    pub chamber_id: Option<i64>,
    /// 需要放入的重量
    pub weight_kg: Option<f64>,
}

// ============================================
// 产品
// ============================================

/// 登记产品请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "产品名称长度必须在 1-200 之间"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "批次号长度必须在 1-50 之间"))]
    pub lot: String,
    #[validate(length(max = 50))]
    pub seed_type: Option<String>,
    #[validate(range(min = 1, message = "数量必须大于 0"))]
    pub quantity: i32,
    #[validate(range(exclusive_min = 0.0, message = "单件重量必须大于 0"))]
    pub unit_weight_kg: f64,
    #[serde(default)]
    pub storage_type: StorageType,
    pub client_id: i64,
    /// 指定时直接上架
    pub location_id: Option<i64>,
    pub expiration_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<CreateProductRequest> for CreateProduct {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            name: req.name,
            lot: req.lot,
            seed_type: req.seed_type,
            quantity: req.quantity,
            unit_weight_kg: req.unit_weight_kg,
            storage_type: req.storage_type,
            client_id: req.client_id,
            location_id: req.location_id,
            expiration_date: req.expiration_date,
            notes: req.notes,
        }
    }
}

/// 修改产品请求，必须带上读取时的版本号
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub version: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub lot: Option<String>,
    #[validate(length(max = 50))]
    pub seed_type: Option<String>,
    #[validate(range(min = 1, message = "数量必须大于 0"))]
    pub quantity: Option<i32>,
    #[validate(range(exclusive_min = 0.0, message = "单件重量必须大于 0"))]
    pub unit_weight_kg: Option<f64>,
    pub storage_type: Option<StorageType>,
    pub expiration_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl UpdateProductRequest {
    /// 拆分为 (期望版本号, 修改内容)
    pub fn into_parts(self) -> (i32, ProductPatch) {
        let patch = ProductPatch {
            name: self.name,
            lot: self.lot,
            seed_type: self.seed_type,
            quantity: self.quantity,
            unit_weight_kg: self.unit_weight_kg,
            storage_type: self.storage_type,
            expiration_date: self.expiration_date,
            notes: self.notes,
        };
        (self.version, patch)
    }
}

/// 无参数的状态操作（提交上架）
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRequest {
    pub version: Option<i32>,
}

/// 上架或移库请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationTargetRequest {
    pub location_id: i64,
    pub version: Option<i32>,
}

/// 作废请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelProductRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub version: Option<i32>,
}

/// 移除请求，必须说明原因
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RemoveProductRequest {
    #[validate(length(min = 1, max = 500, message = "移除原因不能为空"))]
    pub reason: String,
    pub version: Option<i32>,
}

/// 产品查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub status: Option<ProductStatus>,
    pub client_id: Option<i64>,
    pub chamber_id: Option<i64>,
    pub location_id: Option<i64>,
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ProductQuery {
    pub fn into_parts(self) -> (ProductFilter, PageRequest) {
        let page = page_request(self.page, self.page_size);
        let filter = ProductFilter {
            status: self.status,
            client_id: self.client_id,
            chamber_id: self.chamber_id,
            location_id: self.location_id,
            keyword: self.keyword,
        };
        (filter, page)
    }
}

/// 只带分页的查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PaginationParams {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.page_size)
    }
}

// ============================================
// 出库申请
// ============================================

/// 出库申请请求，未指定数量时全部出库
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWithdrawalRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "出库数量必须大于 0"))]
    pub quantity: Option<i32>,
    #[validate(length(min = 1, max = 500, message = "出库原因不能为空"))]
    pub reason: String,
    pub version: Option<i32>,
}

/// 审批请求
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// 出库申请查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalQuery {
    pub status: Option<WithdrawalStatus>,
    pub product_id: Option<i64>,
    pub requested_by: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl WithdrawalQuery {
    pub fn into_parts(self) -> (WithdrawalFilter, PageRequest) {
        let page = page_request(self.page, self.page_size);
        let filter = WithdrawalFilter {
            status: self.status,
            product_id: self.product_id,
            requested_by: self.requested_by,
        };
        (filter, page)
    }
}

// ============================================
// 流水
// ============================================

/// 流水查询参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementQuery {
    pub product_id: Option<i64>,
    pub location_id: Option<i64>,
    pub movement_type: Option<MovementType>,
    pub user_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl MovementQuery {
    pub fn into_parts(self) -> (MovementFilter, PageRequest) {
        let page = page_request(self.page, self.page_size);
        let filter = MovementFilter {
            product_id: self.product_id,
            location_id: self.location_id,
            movement_type: self.movement_type,
            user_id: self.user_id,
            since: self.since,
            until: self.until,
        };
        (filter, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_product_validation() {
        let req: CreateProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Soja",
            "lot": "L1",
            "quantity": 0,
            "unitWeightKg": 40.0,
            "clientId": 1
        }))
        .unwrap();
        assert!(req.validate().is_err());
        assert_eq!(req.storage_type, StorageType::Bag);
    }

    #[test]
    fn test_partial_dimensions_are_rejected() {
        let req: UpdateChamberRequest = serde_json::from_value(serde_json::json!({
            "blocks": 2,
            "rows": 3
        }))
        .unwrap();
        assert!(matches!(
            ChamberPatch::try_from(req),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_page_defaults() {
        let (_, page) = ProductQuery::default().into_parts();
        assert_eq!(page, PageRequest::default());

        let (_, page) = ClientQuery {
            page: Some(0),
            page_size: Some(500),
            ..Default::default()
        }
        .into_parts();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit(), 100);
    }

    #[test]
    fn test_login_request_requires_email() {
        let req = LoginRequest {
            email: "not-an-email".to_string(),
            password: "x".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
