//! 流水查询服务
//!
//! 流水只由产品/出库提交时自动写入，这里只读

use std::sync::Arc;

use crate::error::{InventoryError, Result};
use crate::models::{Movement, MovementFilter, PageRequest, Paged};
use crate::repository::{
    LocationRepositoryTrait, MovementRepositoryTrait, ProductRepositoryTrait, Repositories,
};

pub struct MovementService {
    movements: Arc<dyn MovementRepositoryTrait>,
    products: Arc<dyn ProductRepositoryTrait>,
    locations: Arc<dyn LocationRepositoryTrait>,
}

impl MovementService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            movements: repos.movements.clone(),
            products: repos.products.clone(),
            locations: repos.locations.clone(),
        }
    }

    /// 按条件查询，最新的在前
    pub async fn list(&self, filter: MovementFilter, page: PageRequest) -> Result<Paged<Movement>> {
        if let (Some(since), Some(until)) = (filter.since, filter.until) {
            if since > until {
                return Err(InventoryError::Validation(
                    "开始时间不能晚于结束时间".to_string(),
                ));
            }
        }
        self.movements.list(&filter, page).await
    }

    pub async fn for_product(&self, product_id: i64, page: PageRequest) -> Result<Paged<Movement>> {
        if self.products.get(product_id).await?.is_none() {
            return Err(InventoryError::ProductNotFound(product_id));
        }
        let filter = MovementFilter {
            product_id: Some(product_id),
            ..Default::default()
        };
        self.movements.list(&filter, page).await
    }

    /// 库位流水（作为来源或目标）
    pub async fn for_location(&self, location_id: i64, page: PageRequest) -> Result<Paged<Movement>> {
        if self.locations.get(location_id).await?.is_none() {
            return Err(InventoryError::LocationNotFound(location_id));
        }
        let filter = MovementFilter {
            location_id: Some(location_id),
            ..Default::default()
        };
        self.movements.list(&filter, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let service = MovementService::new(&Repositories::in_memory());
        let now = Utc::now();
        let filter = MovementFilter {
            since: Some(now),
            until: Some(now - Duration::hours(1)),
            ..Default::default()
        };
        let err = service.list(filter, PageRequest::default()).await.unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_product_and_location() {
        let service = MovementService::new(&Repositories::in_memory());
        assert!(matches!(
            service.for_product(7, PageRequest::default()).await,
            Err(InventoryError::ProductNotFound(7))
        ));
        assert!(matches!(
            service.for_location(8, PageRequest::default()).await,
            Err(InventoryError::LocationNotFound(8))
        ));
    }
}
