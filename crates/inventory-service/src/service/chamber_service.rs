//! 冷库服务

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::product_service::{optional_text, required_text};
use crate::error::{InventoryError, Result};
use crate::models::{Chamber, ChamberDimensions, ChamberOccupancy, ChamberStatus, NewChamber};
use crate::repository::{ChamberRepositoryTrait, LocationRepositoryTrait, Repositories};
use crate::service::dto::ChamberPatch;

/// 冷库服务
pub struct ChamberService {
    chambers: Arc<dyn ChamberRepositoryTrait>,
    locations: Arc<dyn LocationRepositoryTrait>,
}

impl ChamberService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            chambers: repos.chambers.clone(),
            locations: repos.locations.clone(),
        }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewChamber) -> Result<Chamber> {
        let input = NewChamber {
            name: required_text(&input.name, "冷库名称")?,
            description: optional_text(input.description),
            ..input
        };
        validate_dimensions(&input.dimensions)?;
        validate_humidity(input.humidity_target)?;

        let chamber = self.chambers.create(&input).await?;
        info!(chamber_id = chamber.id, dimensions = %chamber.dimensions, "冷库已创建");
        Ok(chamber)
    }

    /// 修改冷库信息
    ///
    /// 尺寸缩小时，已有库位不能落到新尺寸之外
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: ChamberPatch) -> Result<Chamber> {
        let mut chamber = self.load(id).await?;

        if let Some(name) = &patch.name {
            chamber.name = required_text(name, "冷库名称")?;
        }
        if patch.description.is_some() {
            chamber.description = optional_text(patch.description);
        }
        if let Some(temperature) = patch.temperature_target {
            chamber.temperature_target = Some(temperature);
        }
        if let Some(humidity) = patch.humidity_target {
            validate_humidity(Some(humidity))?;
            chamber.humidity_target = Some(humidity);
        }
        if let Some(dimensions) = patch.dimensions {
            validate_dimensions(&dimensions)?;
            let outside = self.locations.count_outside(id, dimensions).await?;
            if outside > 0 {
                return Err(InventoryError::Validation(format!(
                    "调整为 {} 后有 {} 个库位超出范围，请先删除这些库位",
                    dimensions, outside
                )));
            }
            chamber.dimensions = dimensions;
        }

        let updated = self.chambers.update(&chamber).await?;
        info!(chamber_id = id, "冷库已更新");
        Ok(updated)
    }

    /// 切换运行状态
    #[instrument(skip(self))]
    pub async fn set_status(&self, id: i64, status: ChamberStatus) -> Result<Chamber> {
        let mut chamber = self.load(id).await?;
        let previous = chamber.status;
        chamber.status = status;

        let updated = self.chambers.update(&chamber).await?;
        info!(chamber_id = id, from = ?previous, to = ?status, "冷库状态已变更");
        Ok(updated)
    }

    /// 删除冷库，空闲库位一并删除
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.chambers.delete(id).await?;
        warn!(chamber_id = id, "冷库已删除");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Chamber> {
        self.load(id).await
    }

    pub async fn list(&self) -> Result<Vec<Chamber>> {
        self.chambers.list().await
    }

    /// 冷库占用情况
    pub async fn occupancy(&self, id: i64) -> Result<ChamberOccupancy> {
        let chamber = self.load(id).await?;
        self.occupancy_of(&chamber).await
    }

    pub(crate) async fn occupancy_of(&self, chamber: &Chamber) -> Result<ChamberOccupancy> {
        let stats = self.locations.stats(chamber.id).await?;
        let occupancy_rate = if stats.active_locations > 0 {
            stats.occupied_locations as f64 / stats.active_locations as f64
        } else {
            0.0
        };

        Ok(ChamberOccupancy {
            chamber_id: chamber.id,
            chamber_name: chamber.name.clone(),
            total_locations: stats.total_locations,
            active_locations: stats.active_locations,
            occupied_locations: stats.occupied_locations,
            stored_weight_kg: stats.stored_weight_kg,
            capacity_kg: stats.capacity_kg,
            occupancy_rate,
        })
    }

    async fn load(&self, id: i64) -> Result<Chamber> {
        self.chambers
            .get(id)
            .await?
            .ok_or(InventoryError::ChamberNotFound(id))
    }
}

fn validate_dimensions(dimensions: &ChamberDimensions) -> Result<()> {
    if !dimensions.is_valid() {
        return Err(InventoryError::Validation(
            "冷库各维度（区/侧/排/层）必须大于等于 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_humidity(humidity: Option<f64>) -> Result<()> {
    match humidity {
        Some(h) if !(0.0..=100.0).contains(&h) => Err(InventoryError::Validation(
            "目标湿度必须在 0 到 100 之间".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{LocationStats, MockLocationRepositoryTrait};

    fn chamber_input(name: &str) -> NewChamber {
        NewChamber {
            name: name.to_string(),
            description: None,
            temperature_target: Some(12.0),
            humidity_target: Some(45.0),
            dimensions: ChamberDimensions::new(2, 2, 5, 3),
            status: ChamberStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_shrinking_past_existing_locations_is_rejected() {
        let mut mock = MockLocationRepositoryTrait::new();
        mock.expect_count_outside().returning(|_, _| Ok(4));

        let mut repos = Repositories::in_memory();
        let chambers = repos.chambers.clone();
        repos.locations = Arc::new(mock);
        let service = ChamberService::new(&repos);

        let chamber = chambers.create(&chamber_input("Câmara Fria 1")).await.unwrap();
        let err = service
            .update(
                chamber.id,
                ChamberPatch {
                    dimensions: Some(ChamberDimensions::new(1, 2, 5, 3)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_occupancy_rate_uses_active_locations() {
        let mut mock = MockLocationRepositoryTrait::new();
        mock.expect_stats().returning(|_| {
            Ok(LocationStats {
                total_locations: 10,
                active_locations: 8,
                occupied_locations: 2,
                stored_weight_kg: 1500.0,
                capacity_kg: 8000.0,
            })
        });

        let mut repos = Repositories::in_memory();
        let chambers = repos.chambers.clone();
        repos.locations = Arc::new(mock);
        let service = ChamberService::new(&repos);

        let chamber = chambers.create(&chamber_input("Câmara Fria 2")).await.unwrap();
        let occupancy = service.occupancy(chamber.id).await.unwrap();
        assert_eq!(occupancy.occupancy_rate, 0.25);
        assert_eq!(occupancy.chamber_name, "Câmara Fria 2");
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let service = ChamberService::new(&Repositories::in_memory());

        let mut input = chamber_input("  ");
        assert!(matches!(
            service.create(input.clone()).await,
            Err(InventoryError::Validation(_))
        ));

        input.name = "Câmara 3".to_string();
        input.dimensions = ChamberDimensions::new(0, 1, 1, 1);
        assert!(matches!(
            service.create(input.clone()).await,
            Err(InventoryError::Validation(_))
        ));

        input.dimensions = ChamberDimensions::new(1, 1, 1, 1);
        input.humidity_target = Some(120.0);
        assert!(matches!(
            service.create(input).await,
            Err(InventoryError::Validation(_))
        ));
    }
}
