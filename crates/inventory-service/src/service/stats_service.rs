//! 首页统计

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::chamber_service::ChamberService;
use crate::error::Result;
use crate::models::{PageRequest, ProductStatus, WithdrawalFilter, WithdrawalStatus};
use crate::repository::{
    ChamberRepositoryTrait, MovementRepositoryTrait, ProductRepositoryTrait, Repositories,
    WithdrawalRepositoryTrait,
};
use crate::service::dto::{Overview, StatusCount};

pub struct StatsService {
    products: Arc<dyn ProductRepositoryTrait>,
    chambers: Arc<dyn ChamberRepositoryTrait>,
    movements: Arc<dyn MovementRepositoryTrait>,
    withdrawals: Arc<dyn WithdrawalRepositoryTrait>,
    chamber_service: ChamberService,
}

impl StatsService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            products: repos.products.clone(),
            chambers: repos.chambers.clone(),
            movements: repos.movements.clone(),
            withdrawals: repos.withdrawals.clone(),
            chamber_service: ChamberService::new(repos),
        }
    }

    /// 产品状态分布、各冷库占用、近 24 小时流水数、待审批出库数
    pub async fn overview(&self) -> Result<Overview> {
        let counts = self.products.count_by_status().await?;
        // 没有产品的状态补 0，保证输出稳定
        let products_by_status: Vec<StatusCount> = ProductStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: counts
                    .iter()
                    .find(|(s, _)| s == status)
                    .map_or(0, |(_, c)| *c),
            })
            .collect();
        let total_products = products_by_status.iter().map(|s| s.count).sum();
        let active_products = products_by_status
            .iter()
            .filter(|s| !s.status.is_terminal())
            .map(|s| s.count)
            .sum();

        let mut chambers = Vec::new();
        for chamber in self.chambers.list().await? {
            chambers.push(self.chamber_service.occupancy_of(&chamber).await?);
        }

        let movements_last_24h = self
            .movements
            .count_since(Utc::now() - Duration::hours(24))
            .await?;

        let pending = WithdrawalFilter {
            status: Some(WithdrawalStatus::Pending),
            ..Default::default()
        };
        let pending_withdrawals = self
            .withdrawals
            .list(&pending, PageRequest::new(1, 1))
            .await?
            .total;

        Ok(Overview {
            total_products,
            active_products,
            products_by_status,
            chambers,
            movements_last_24h,
            pending_withdrawals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockProductRepositoryTrait;

    #[tokio::test]
    async fn test_overview_fills_missing_statuses() {
        let mut mock = MockProductRepositoryTrait::new();
        mock.expect_count_by_status().returning(|| {
            Ok(vec![
                (ProductStatus::Locado, 4),
                (ProductStatus::Retirado, 2),
            ])
        });

        let mut repos = Repositories::in_memory();
        repos.products = Arc::new(mock);
        let overview = StatsService::new(&repos).overview().await.unwrap();

        assert_eq!(overview.products_by_status.len(), ProductStatus::ALL.len());
        assert_eq!(overview.total_products, 6);
        assert_eq!(overview.active_products, 4);
        assert_eq!(overview.movements_last_24h, 0);
        assert_eq!(overview.pending_withdrawals, 0);
        assert!(overview.chambers.is_empty());
    }
}
