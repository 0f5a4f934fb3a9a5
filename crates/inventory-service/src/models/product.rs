//! 产品模型

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ProductStatus, StorageType};

/// 入库的种子产品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// 批次号
    pub lot: String,
    /// 品种/种类（如 SOJA、MILHO）
    pub seed_type: Option<String>,
    pub quantity: i32,
    pub unit_weight_kg: f64,
    /// quantity × unit_weight_kg，写入时由服务层计算
    pub total_weight_kg: f64,
    pub storage_type: StorageType,
    pub client_id: i64,
    pub location_id: Option<i64>,
    pub status: ProductStatus,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// 乐观锁版本号，每次写入加一
    pub version: i32,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn recompute_total_weight(&mut self) {
        self.total_weight_kg = total_weight(self.quantity, self.unit_weight_kg);
    }
}

/// 总重量，保留三位小数避免浮点尾差
pub fn total_weight(quantity: i32, unit_weight_kg: f64) -> f64 {
    (quantity as f64 * unit_weight_kg * 1000.0).round() / 1000.0
}

/// 新建产品
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub lot: String,
    pub seed_type: Option<String>,
    pub quantity: i32,
    pub unit_weight_kg: f64,
    pub total_weight_kg: f64,
    pub storage_type: StorageType,
    pub client_id: i64,
    pub location_id: Option<i64>,
    pub status: ProductStatus,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: i64,
}

/// 产品可编辑字段，None 表示不修改
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub lot: Option<String>,
    pub seed_type: Option<String>,
    pub quantity: Option<i32>,
    pub unit_weight_kg: Option<f64>,
    pub storage_type: Option<StorageType>,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ProductPatch {
    /// 将修改应用到产品副本上并重算总重量
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(lot) = &self.lot {
            product.lot = lot.clone();
        }
        if let Some(seed_type) = &self.seed_type {
            product.seed_type = Some(seed_type.clone());
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
        if let Some(unit_weight) = self.unit_weight_kg {
            product.unit_weight_kg = unit_weight;
        }
        if let Some(storage_type) = self.storage_type {
            product.storage_type = storage_type;
        }
        if let Some(date) = self.expiration_date {
            product.expiration_date = Some(date);
        }
        if let Some(notes) = &self.notes {
            product.notes = Some(notes.clone());
        }
        product.recompute_total_weight();
    }
}

/// 产品查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub status: Option<ProductStatus>,
    pub client_id: Option<i64>,
    /// 按产品当前所在冷库过滤
    pub chamber_id: Option<i64>,
    pub location_id: Option<i64>,
    /// 名称或批次号模糊匹配
    pub keyword: Option<String>,
}

impl ProductFilter {
    /// location_chamber 为产品当前库位所属的冷库
    pub fn matches(&self, product: &Product, location_chamber: Option<i64>) -> bool {
        let keyword_ok = self.keyword.as_deref().is_none_or(|k| {
            let k = k.to_lowercase();
            product.name.to_lowercase().contains(&k) || product.lot.to_lowercase().contains(&k)
        });
        keyword_ok
            && self.status.is_none_or(|s| product.status == s)
            && self.client_id.is_none_or(|id| product.client_id == id)
            && self.location_id.is_none_or(|id| product.location_id == Some(id))
            && self.chamber_id.is_none_or(|id| location_chamber == Some(id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: i64, status: ProductStatus) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: "Soja BRS 284".to_string(),
            lot: format!("LOTE-{:04}", id),
            seed_type: Some("SOJA".to_string()),
            quantity: 40,
            unit_weight_kg: 25.0,
            total_weight_kg: 1000.0,
            storage_type: StorageType::Bag,
            client_id: 1,
            location_id: None,
            status,
            expiration_date: None,
            notes: None,
            version: 1,
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_total_weight_rounding() {
        assert_eq!(total_weight(40, 25.0), 1000.0);
        assert_eq!(total_weight(3, 0.1), 0.3);
        assert_eq!(total_weight(7, 1.111), 7.777);
    }

    #[test]
    fn test_patch_recomputes_total_weight() {
        let mut p = product(1, ProductStatus::Cadastrado);
        ProductPatch {
            quantity: Some(10),
            notes: Some("lote reembalado".to_string()),
            ..Default::default()
        }
        .apply(&mut p);

        assert_eq!(p.quantity, 10);
        assert_eq!(p.total_weight_kg, 250.0);
        assert_eq!(p.notes.as_deref(), Some("lote reembalado"));
        assert_eq!(p.name, "Soja BRS 284");
    }

    #[test]
    fn test_filter_matches() {
        let mut p = product(7, ProductStatus::Locado);
        p.location_id = Some(3);

        assert!(ProductFilter::default().matches(&p, Some(2)));
        assert!(
            ProductFilter {
                keyword: Some("lote-0007".to_string()),
                ..Default::default()
            }
            .matches(&p, None)
        );
        assert!(
            ProductFilter {
                chamber_id: Some(2),
                location_id: Some(3),
                ..Default::default()
            }
            .matches(&p, Some(2))
        );
        assert!(
            !ProductFilter {
                chamber_id: Some(9),
                ..Default::default()
            }
            .matches(&p, Some(2))
        );
        assert!(
            !ProductFilter {
                status: Some(ProductStatus::Cadastrado),
                ..Default::default()
            }
            .matches(&p, Some(2))
        );
    }
}
