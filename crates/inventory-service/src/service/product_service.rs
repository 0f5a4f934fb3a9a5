//! 产品服务
//!
//! 负责产品从入库登记到上架、移库、作废和移除的全过程：
//! - 状态机校验（含角色）
//! - 库位容量校验（启用、空闲、承重、所属冷库运行中）
//! - 自动生成流水
//! - 乐观锁：所有写入都带期望版本号，由仓储在提交时校验
//!
//! 出库相关的状态变化由 [`WithdrawalService`](super::WithdrawalService) 负责。

use std::sync::Arc;

use storage_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::error::{InventoryError, Result};
use crate::lifecycle::{self, ProductAction};
use crate::models::{
    total_weight, Actor, CommitResult, Location, LocationChange, Movement, MovementFilter,
    MovementType, NewMovement, NewProduct, PageRequest, Paged, Product, ProductCommit,
    ProductFilter, ProductPatch, ProductStatus,
};
use crate::repository::{
    ChamberRepositoryTrait, ClientRepositoryTrait, LocationRepositoryTrait,
    MovementRepositoryTrait, ProductRepositoryTrait, Repositories,
};
use crate::service::dto::CreateProduct;

/// 产品服务
pub struct ProductService {
    products: Arc<dyn ProductRepositoryTrait>,
    locations: Arc<dyn LocationRepositoryTrait>,
    chambers: Arc<dyn ChamberRepositoryTrait>,
    clients: Arc<dyn ClientRepositoryTrait>,
    movements: Arc<dyn MovementRepositoryTrait>,
}

impl ProductService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            products: repos.products.clone(),
            locations: repos.locations.clone(),
            chambers: repos.chambers.clone(),
            clients: repos.clients.clone(),
            movements: repos.movements.clone(),
        }
    }

    /// 登记新产品
    ///
    /// 指定库位时直接上架（LOCADO，ENTRY 流水），否则为 CADASTRADO
    #[instrument(skip(self, input), fields(client_id = input.client_id, actor = actor.user_id))]
    pub async fn create(&self, input: CreateProduct, actor: Actor) -> Result<Product> {
        let name = required_text(&input.name, "产品名称")?;
        let lot = required_text(&input.lot, "批次号")?;
        validate_goods(input.quantity, input.unit_weight_kg)?;

        let client = self
            .clients
            .get(input.client_id)
            .await?
            .ok_or(InventoryError::ClientNotFound(input.client_id))?;
        if !client.active {
            return Err(InventoryError::ClientInactive(client.id));
        }

        let weight = total_weight(input.quantity, input.unit_weight_kg);
        let target = match input.location_id {
            Some(location_id) => Some(self.load_target_location(location_id, weight).await?),
            None => None,
        };
        let status = if target.is_some() {
            ProductStatus::Locado
        } else {
            ProductStatus::Cadastrado
        };

        let new_product = NewProduct {
            name,
            lot,
            seed_type: optional_text(input.seed_type),
            quantity: input.quantity,
            unit_weight_kg: input.unit_weight_kg,
            total_weight_kg: weight,
            storage_type: input.storage_type,
            client_id: client.id,
            location_id: target.as_ref().map(|l| l.id),
            status,
            expiration_date: input.expiration_date,
            notes: optional_text(input.notes),
            created_by: actor.user_id,
        };

        let commit = match &target {
            Some(location) => ProductCommit::insert(new_product)
                .with_location(LocationChange::Occupy {
                    location_id: location.id,
                    weight_kg: weight,
                })
                .with_movement(
                    NewMovement::new(MovementType::Entry, status, actor.user_id)
                        .to_location(location)
                        .goods(input.quantity, weight),
                ),
            None => ProductCommit::insert(new_product).with_movement(
                NewMovement::new(MovementType::StatusChange, status, actor.user_id)
                    .goods(input.quantity, weight),
            ),
        };

        let result = self.products.commit(commit).await?;
        record_movement(&result);

        info!(
            product_id = result.product.id,
            status = %result.product.status,
            location_id = ?result.product.location_id,
            "产品已登记"
        );
        Ok(result.product)
    }

    /// 修改产品信息
    ///
    /// 已上架产品的重量变化会同步到库位，并记录 ADJUSTMENT 流水
    #[instrument(skip(self, patch), fields(actor = actor.user_id))]
    pub async fn update(
        &self,
        id: i64,
        patch: ProductPatch,
        expected_version: i32,
        actor: Actor,
    ) -> Result<Product> {
        let current = self.load(id).await?;
        if current.status.is_terminal() {
            return Err(InventoryError::ProductReadOnly {
                product_id: id,
                status: current.status,
            });
        }
        check_version(&current, Some(expected_version))?;

        let changes_goods = patch.quantity.is_some() || patch.unit_weight_kg.is_some();
        if changes_goods && current.status == ProductStatus::AguardandoRetirada {
            return Err(InventoryError::Validation(
                "待出库产品不能修改数量或单件重量".to_string(),
            ));
        }
        let patch = ProductPatch {
            name: patch
                .name
                .as_deref()
                .map(|n| required_text(n, "产品名称"))
                .transpose()?,
            lot: patch
                .lot
                .as_deref()
                .map(|l| required_text(l, "批次号"))
                .transpose()?,
            ..patch
        };

        let mut updated = current.clone();
        patch.apply(&mut updated);
        validate_goods(updated.quantity, updated.unit_weight_kg)?;

        let mut commit = ProductCommit::update(updated.clone(), expected_version);
        let weight_changed = updated.total_weight_kg != current.total_weight_kg;
        let quantity_changed = updated.quantity != current.quantity;

        let located = current.location_id.filter(|_| weight_changed || quantity_changed);
        if let Some(location_id) = located {
            let location = self
                .locations
                .get(location_id)
                .await?
                .ok_or(InventoryError::LocationNotFound(location_id))?;
            if weight_changed {
                location.check_weight(updated.total_weight_kg)?;
                commit = commit.with_location(LocationChange::Reweigh {
                    location_id,
                    weight_kg: updated.total_weight_kg,
                });
            }
            commit = commit.with_movement(
                NewMovement::new(MovementType::Adjustment, current.status, actor.user_id)
                    .from_status(current.status)
                    .from_location(&location)
                    .to_location(&location)
                    .goods(updated.quantity, updated.total_weight_kg)
                    .reason(Some(format!(
                        "数量 {} -> {}，重量 {}kg -> {}kg",
                        current.quantity,
                        updated.quantity,
                        current.total_weight_kg,
                        updated.total_weight_kg
                    )))
                    .manual(),
            );
        }

        let result = self.products.commit(commit).await?;
        record_movement(&result);

        info!(product_id = id, version = result.product.version, "产品信息已更新");
        Ok(result.product)
    }

    /// 提交上架申请
    #[instrument(skip(self), fields(actor = actor.user_id))]
    pub async fn submit_for_allocation(
        &self,
        id: i64,
        expected_version: Option<i32>,
        actor: Actor,
    ) -> Result<Product> {
        let product = self.load(id).await?;
        let action = ProductAction::SubmitForAllocation;
        let to = guard(&product, action, actor)?;
        check_version(&product, expected_version)?;

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;

        let commit = ProductCommit::update(updated, product.version).with_movement(
            NewMovement::new(MovementType::StatusChange, to, actor.user_id)
                .from_status(from)
                .goods(product.quantity, product.total_weight_kg),
        );
        let result = self.commit_transition(action, from, commit).await?;

        info!(product_id = id, "产品已提交上架");
        Ok(result.product)
    }

    /// 分配库位（上架）
    #[instrument(skip(self), fields(actor = actor.user_id))]
    pub async fn allocate(
        &self,
        id: i64,
        location_id: i64,
        expected_version: Option<i32>,
        actor: Actor,
    ) -> Result<Product> {
        let product = self.load(id).await?;
        let action = ProductAction::Allocate;
        let to = guard(&product, action, actor)?;
        check_version(&product, expected_version)?;

        let location = self
            .load_target_location(location_id, product.total_weight_kg)
            .await
            .inspect_err(|e| reject_metric(action, e))?;

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;
        updated.location_id = Some(location.id);

        let commit = ProductCommit::update(updated, product.version)
            .with_location(LocationChange::Occupy {
                location_id: location.id,
                weight_kg: product.total_weight_kg,
            })
            .with_movement(
                NewMovement::new(MovementType::Entry, to, actor.user_id)
                    .from_status(from)
                    .to_location(&location)
                    .goods(product.quantity, product.total_weight_kg),
            );
        let result = self.commit_transition(action, from, commit).await?;

        info!(product_id = id, location = %location.code, "产品已上架");
        Ok(result.product)
    }

    /// 移库
    #[instrument(skip(self), fields(actor = actor.user_id))]
    pub async fn move_to(
        &self,
        id: i64,
        location_id: i64,
        expected_version: Option<i32>,
        actor: Actor,
    ) -> Result<Product> {
        let product = self.load(id).await?;
        let action = ProductAction::Move;
        let to = guard(&product, action, actor)?;
        check_version(&product, expected_version)?;

        let source_id = product
            .location_id
            .ok_or_else(|| InventoryError::Internal(format!("已上架产品缺少库位: {}", id)))?;
        if source_id == location_id {
            return Err(InventoryError::Validation(
                "目标库位与当前库位相同".to_string(),
            ));
        }

        let source = self
            .locations
            .get(source_id)
            .await?
            .ok_or(InventoryError::LocationNotFound(source_id))?;
        let target = self
            .load_target_location(location_id, product.total_weight_kg)
            .await
            .inspect_err(|e| reject_metric(action, e))?;

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;
        updated.location_id = Some(target.id);

        let commit = ProductCommit::update(updated, product.version)
            .with_location(LocationChange::Release {
                location_id: source.id,
            })
            .with_location(LocationChange::Occupy {
                location_id: target.id,
                weight_kg: product.total_weight_kg,
            })
            .with_movement(
                NewMovement::new(MovementType::Transfer, to, actor.user_id)
                    .from_status(from)
                    .from_location(&source)
                    .to_location(&target)
                    .goods(product.quantity, product.total_weight_kg),
            );
        let result = self.commit_transition(action, from, commit).await?;

        info!(
            product_id = id,
            from = %source.code,
            to = %target.code,
            "产品已移库"
        );
        Ok(result.product)
    }

    /// 上架前作废
    #[instrument(skip(self), fields(actor = actor.user_id))]
    pub async fn cancel(
        &self,
        id: i64,
        reason: Option<String>,
        expected_version: Option<i32>,
        actor: Actor,
    ) -> Result<Product> {
        let product = self.load(id).await?;
        let action = ProductAction::Cancel;
        let to = guard(&product, action, actor)?;
        check_version(&product, expected_version)?;

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;

        let commit = ProductCommit::update(updated, product.version).with_movement(
            NewMovement::new(MovementType::StatusChange, to, actor.user_id)
                .from_status(from)
                .goods(product.quantity, product.total_weight_kg)
                .reason(optional_text(reason)),
        );
        let result = self.commit_transition(action, from, commit).await?;

        info!(product_id = id, "产品已作废");
        Ok(result.product)
    }

    /// 管理员移除产品
    ///
    /// 已上架产品同时释放库位并记录 EXIT 流水
    #[instrument(skip(self), fields(actor = actor.user_id))]
    pub async fn remove(
        &self,
        id: i64,
        reason: String,
        expected_version: Option<i32>,
        actor: Actor,
    ) -> Result<Product> {
        let product = self.load(id).await?;
        let action = ProductAction::Remove;
        let to = guard(&product, action, actor)?;
        check_version(&product, expected_version)?;
        let reason = required_text(&reason, "移除原因")?;

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;
        updated.location_id = None;

        let mut commit = ProductCommit::update(updated, product.version);
        let movement = match product.location_id {
            Some(location_id) => {
                let location = self
                    .locations
                    .get(location_id)
                    .await?
                    .ok_or(InventoryError::LocationNotFound(location_id))?;
                commit = commit.with_location(LocationChange::Release { location_id });
                NewMovement::new(MovementType::Exit, to, actor.user_id).from_location(&location)
            }
            None => NewMovement::new(MovementType::StatusChange, to, actor.user_id),
        };
        commit = commit.with_movement(
            movement
                .from_status(from)
                .goods(product.quantity, product.total_weight_kg)
                .reason(Some(reason)),
        );
        let result = self.commit_transition(action, from, commit).await?;

        warn!(product_id = id, "产品已被管理员移除");
        Ok(result.product)
    }

    pub async fn get(&self, id: i64) -> Result<Product> {
        self.load(id).await
    }

    pub async fn list(&self, filter: &ProductFilter, page: PageRequest) -> Result<Paged<Product>> {
        self.products.list(filter, page).await
    }

    /// 产品流水，按时间倒序
    pub async fn history(&self, id: i64, page: PageRequest) -> Result<Paged<Movement>> {
        self.load(id).await?;
        let filter = MovementFilter {
            product_id: Some(id),
            ..Default::default()
        };
        self.movements.list(&filter, page).await
    }

    async fn load(&self, id: i64) -> Result<Product> {
        self.products
            .get(id)
            .await?
            .ok_or(InventoryError::ProductNotFound(id))
    }

    /// 加载目标库位并校验：所属冷库运行中、库位启用、空闲、承重足够
    async fn load_target_location(&self, location_id: i64, weight_kg: f64) -> Result<Location> {
        let location = self
            .locations
            .get(location_id)
            .await?
            .ok_or(InventoryError::LocationNotFound(location_id))?;
        let chamber = self
            .chambers
            .get(location.chamber_id)
            .await?
            .ok_or(InventoryError::ChamberNotFound(location.chamber_id))?;
        if !chamber.accepts_products() {
            return Err(InventoryError::ChamberNotActive(chamber.id));
        }
        location.can_hold(weight_kg)?;
        Ok(location)
    }

    async fn commit_transition(
        &self,
        action: ProductAction,
        from: ProductStatus,
        commit: ProductCommit,
    ) -> Result<CommitResult> {
        commit_transition(self.products.as_ref(), action, from, commit).await
    }
}

/// 提交状态变化并记录指标
pub(crate) async fn commit_transition(
    products: &dyn ProductRepositoryTrait,
    action: ProductAction,
    from: ProductStatus,
    commit: ProductCommit,
) -> Result<CommitResult> {
    let result = products
        .commit(commit)
        .await
        .inspect_err(|e| reject_metric(action, e))?;

    metrics::record_product_transition(
        action.as_str(),
        from.as_str(),
        result.product.status.as_str(),
    );
    record_movement(&result);
    Ok(result)
}

/// 状态机校验，失败时记录拒绝指标
pub(crate) fn guard(product: &Product, action: ProductAction, actor: Actor) -> Result<ProductStatus> {
    lifecycle::check(product, action, actor.role).inspect_err(|e| reject_metric(action, e))
}

pub(crate) fn reject_metric(action: ProductAction, err: &InventoryError) {
    metrics::record_product_rejection(action.as_str(), err.error_code());
}

fn record_movement(result: &CommitResult) {
    if let Some(movement) = &result.movement {
        metrics::record_stock_movement(movement.movement_type.as_str());
    }
}

/// 调用方带了版本号时先比对一次，提交时仓储还会再校验
pub(crate) fn check_version(product: &Product, expected: Option<i32>) -> Result<()> {
    match expected {
        Some(version) if version != product.version => Err(InventoryError::ConcurrencyConflict {
            product_id: product.id,
            expected_version: version,
        }),
        _ => Ok(()),
    }
}

fn validate_goods(quantity: i32, unit_weight_kg: f64) -> Result<()> {
    if quantity <= 0 {
        return Err(InventoryError::Validation("数量必须大于 0".to_string()));
    }
    if !unit_weight_kg.is_finite() || unit_weight_kg <= 0.0 {
        return Err(InventoryError::Validation("单件重量必须大于 0".to_string()));
    }
    Ok(())
}

pub(crate) fn required_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InventoryError::Validation(format!("{}不能为空", field)));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
