//! 服务层输入输出
//!
//! 与 HTTP 层的请求 DTO 解耦，HTTP 层校验格式后转换为这里的结构

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    ChamberDimensions, ChamberOccupancy, ProductStatus, StorageType, UserRole,
};

/// 新建产品
#[derive(Debug, Clone, PartialEq)]
pub struct CreateProduct {
    pub name: String,
    pub lot: String,
    pub seed_type: Option<String>,
    pub quantity: i32,
    pub unit_weight_kg: f64,
    pub storage_type: StorageType,
    pub client_id: i64,
    /// 指定时直接上架
    pub location_id: Option<i64>,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// 冷库可编辑字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChamberPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub temperature_target: Option<f64>,
    pub humidity_target: Option<f64>,
    pub dimensions: Option<ChamberDimensions>,
}

/// 库位可编辑字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationPatch {
    pub max_capacity_kg: Option<f64>,
    pub active: Option<bool>,
}

/// 客户可编辑字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
    pub active: Option<bool>,
}

/// 新建用户（明文密码，由服务层哈希）
#[derive(Debug, Clone, PartialEq)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// 用户可编辑字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    /// 管理员重置密码
    pub password: Option<String>,
}

/// 按状态统计的产品数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: ProductStatus,
    pub count: i64,
}

/// 首页概览
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_products: i64,
    /// 非终态产品数
    pub active_products: i64,
    pub products_by_status: Vec<StatusCount>,
    pub chambers: Vec<ChamberOccupancy>,
    pub movements_last_24h: i64,
    pub pending_withdrawals: i64,
}

