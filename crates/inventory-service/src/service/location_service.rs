//! 库位服务

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{InventoryError, Result};
use crate::models::{Chamber, Location, LocationFilter, NewLocation};
use crate::repository::{ChamberRepositoryTrait, LocationRepositoryTrait, Repositories};
use crate::service::dto::LocationPatch;

/// 单次批量生成的库位上限
pub const MAX_GENERATED_LOCATIONS: i64 = 10_000;

/// 库位服务
pub struct LocationService {
    locations: Arc<dyn LocationRepositoryTrait>,
    chambers: Arc<dyn ChamberRepositoryTrait>,
}

impl LocationService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            locations: repos.locations.clone(),
            chambers: repos.chambers.clone(),
        }
    }

    /// 新建单个库位，坐标必须落在冷库尺寸内
    #[instrument(skip(self, input), fields(chamber_id = input.chamber_id))]
    pub async fn create(&self, input: NewLocation) -> Result<Location> {
        validate_capacity(input.max_capacity_kg)?;
        let chamber = self.load_chamber(input.chamber_id).await?;
        if !chamber.dimensions.contains(&input.coordinates) {
            return Err(InventoryError::CoordinatesOutOfRange {
                chamber_id: chamber.id,
                coordinates: input.coordinates.code(),
            });
        }

        let location = self.locations.create(&input).await?;
        info!(location_id = location.id, code = %location.code, "库位已创建");
        Ok(location)
    }

    /// 按冷库尺寸补齐全部库位，已存在的坐标保持不变
    ///
    /// 返回新建数量
    #[instrument(skip(self))]
    pub async fn generate_for_chamber(&self, chamber_id: i64, default_capacity_kg: f64) -> Result<u64> {
        validate_capacity(default_capacity_kg)?;
        let chamber = self.load_chamber(chamber_id).await?;

        let capacity = chamber.dimensions.capacity();
        if capacity > MAX_GENERATED_LOCATIONS {
            return Err(InventoryError::Validation(format!(
                "冷库尺寸 {} 共 {} 个库位，超过单次生成上限 {}",
                chamber.dimensions, capacity, MAX_GENERATED_LOCATIONS
            )));
        }

        let locations: Vec<NewLocation> = chamber
            .dimensions
            .iter_coordinates()
            .map(|coordinates| NewLocation {
                chamber_id,
                coordinates,
                max_capacity_kg: default_capacity_kg,
                active: true,
            })
            .collect();
        let created = self.locations.create_many(&locations).await?;

        info!(
            chamber_id,
            created,
            skipped = locations.len() as u64 - created,
            "库位批量生成完成"
        );
        Ok(created)
    }

    /// 修改承重或启停
    ///
    /// 承重不得低于当前在库重量，占用中的库位不能停用
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i64, patch: LocationPatch) -> Result<Location> {
        let mut location = self.load(id).await?;

        if let Some(capacity) = patch.max_capacity_kg {
            validate_capacity(capacity)?;
            if capacity < location.current_weight_kg {
                return Err(InventoryError::CapacityExceeded {
                    location_id: id,
                    capacity_kg: capacity,
                    requested_kg: location.current_weight_kg,
                });
            }
            location.max_capacity_kg = capacity;
        }
        if let Some(active) = patch.active {
            if !active && location.occupied {
                return Err(InventoryError::LocationOccupied(id));
            }
            location.active = active;
        }

        let updated = self.locations.update(&location).await?;
        info!(location_id = id, "库位已更新");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.locations.delete(id).await?;
        info!(location_id = id, "库位已删除");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Location> {
        self.load(id).await
    }

    pub async fn list(&self, filter: &LocationFilter) -> Result<Vec<Location>> {
        self.locations.list(filter).await
    }

    /// 可上架库位：启用、空闲、承重不低于 min_weight_kg，且所属冷库运行中
    pub async fn available(
        &self,
        chamber_id: Option<i64>,
        min_weight_kg: Option<f64>,
    ) -> Result<Vec<Location>> {
        let open_chambers: HashSet<i64> = self
            .chambers
            .list()
            .await?
            .into_iter()
            .filter(Chamber::accepts_products)
            .map(|c| c.id)
            .collect();

        let filter = LocationFilter {
            chamber_id,
            occupied: Some(false),
            active: Some(true),
            min_capacity_kg: min_weight_kg,
        };
        let locations = self.locations.list(&filter).await?;

        Ok(locations
            .into_iter()
            .filter(|l| open_chambers.contains(&l.chamber_id))
            .collect())
    }

    async fn load(&self, id: i64) -> Result<Location> {
        self.locations
            .get(id)
            .await?
            .ok_or(InventoryError::LocationNotFound(id))
    }

    async fn load_chamber(&self, id: i64) -> Result<Chamber> {
        self.chambers
            .get(id)
            .await?
            .ok_or(InventoryError::ChamberNotFound(id))
    }
}

fn validate_capacity(capacity_kg: f64) -> Result<()> {
    if !capacity_kg.is_finite() || capacity_kg <= 0.0 {
        return Err(InventoryError::Validation("库位承重必须大于 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::tests::location;
    use crate::models::{ChamberDimensions, ChamberStatus, Coordinates, NewChamber};
    use crate::service::ChamberService;
    use crate::repository::MockLocationRepositoryTrait;

    #[tokio::test]
    async fn test_capacity_cannot_drop_below_stored_weight() {
        let mut mock = MockLocationRepositoryTrait::new();
        mock.expect_get().returning(|id| {
            let mut loc = location(id, 1000.0);
            loc.occupied = true;
            loc.current_weight_kg = 800.0;
            Ok(Some(loc))
        });
        mock.expect_update().never();

        let mut repos = Repositories::in_memory();
        repos.locations = Arc::new(mock);
        let service = LocationService::new(&repos);

        let err = service
            .update(
                3,
                LocationPatch {
                    max_capacity_kg: Some(500.0),
                    active: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InventoryError::CapacityExceeded {
                location_id: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_occupied_location_cannot_be_deactivated() {
        let mut mock = MockLocationRepositoryTrait::new();
        mock.expect_get().returning(|id| {
            let mut loc = location(id, 1000.0);
            loc.occupied = true;
            Ok(Some(loc))
        });
        mock.expect_update().never();

        let mut repos = Repositories::in_memory();
        repos.locations = Arc::new(mock);
        let service = LocationService::new(&repos);

        let err = service
            .update(
                4,
                LocationPatch {
                    max_capacity_kg: None,
                    active: Some(false),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::LocationOccupied(4)));
    }

    #[tokio::test]
    async fn test_create_rejects_coordinates_outside_chamber() {
        let mut repos = Repositories::in_memory();
        let chamber = ChamberService::new(&repos)
            .create(NewChamber {
                name: "Câmara 02".to_string(),
                description: None,
                temperature_target: None,
                humidity_target: None,
                dimensions: ChamberDimensions::new(1, 1, 2, 2),
                status: ChamberStatus::Active,
            })
            .await
            .unwrap();

        let mut mock = MockLocationRepositoryTrait::new();
        mock.expect_create().never();
        repos.locations = Arc::new(mock);
        let service = LocationService::new(&repos);

        for coordinates in [Coordinates::new(1, 1, 2, 3), Coordinates::new(0, 1, 1, 1)] {
            let err = service
                .create(NewLocation {
                    chamber_id: chamber.id,
                    coordinates,
                    max_capacity_kg: 1000.0,
                    active: true,
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                InventoryError::CoordinatesOutOfRange { chamber_id, .. } if chamber_id == chamber.id
            ));
        }
    }

    #[test]
    fn test_validate_capacity() {
        assert!(validate_capacity(0.1).is_ok());
        assert!(validate_capacity(0.0).is_err());
        assert!(validate_capacity(-5.0).is_err());
        assert!(validate_capacity(f64::INFINITY).is_err());
    }
}
