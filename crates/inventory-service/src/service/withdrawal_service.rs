//! 出库服务
//!
//! 出库分两步：操作员发起申请（产品进入 AGUARDANDO_RETIRADA），
//! 管理员批准或驳回；申请人也可以撤回。
//!
//! 批准时按申请数量区分：
//! - 全部出库：产品 RETIRADO，释放库位
//! - 部分出库：扣减数量并重算重量，产品回到 LOCADO，留在原库位

use std::sync::Arc;

use chrono::Utc;
use storage_shared::observability::metrics;
use tracing::{info, instrument};

use super::product_service::{check_version, commit_transition, guard, optional_text, required_text};
use crate::error::{InventoryError, Result};
use crate::lifecycle::ProductAction;
use crate::models::{
    total_weight, Actor, LocationChange, MovementType, NewMovement, NewWithdrawal, PageRequest,
    Paged, Product, ProductCommit, ProductStatus, WithdrawalFilter, WithdrawalRequest,
    WithdrawalStatus, WithdrawalWrite,
};
use crate::repository::{
    LocationRepositoryTrait, ProductRepositoryTrait, Repositories, WithdrawalRepositoryTrait,
};

/// 出库服务
pub struct WithdrawalService {
    products: Arc<dyn ProductRepositoryTrait>,
    locations: Arc<dyn LocationRepositoryTrait>,
    withdrawals: Arc<dyn WithdrawalRepositoryTrait>,
}

impl WithdrawalService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            products: repos.products.clone(),
            locations: repos.locations.clone(),
            withdrawals: repos.withdrawals.clone(),
        }
    }

    /// 发起出库申请
    ///
    /// quantity 为空时申请全部数量
    #[instrument(skip(self, reason), fields(actor = actor.user_id))]
    pub async fn request(
        &self,
        product_id: i64,
        quantity: Option<i32>,
        reason: String,
        expected_version: Option<i32>,
        actor: Actor,
    ) -> Result<WithdrawalRequest> {
        let product = self.load_product(product_id).await?;
        let action = ProductAction::RequestWithdrawal;
        let to = guard(&product, action, actor)?;
        check_version(&product, expected_version)?;
        let reason = required_text(&reason, "出库原因")?;

        if self
            .withdrawals
            .find_pending_by_product(product_id)
            .await?
            .is_some()
        {
            return Err(InventoryError::WithdrawalAlreadyPending(product_id));
        }

        let quantity = quantity.unwrap_or(product.quantity);
        if quantity <= 0 || quantity > product.quantity {
            return Err(InventoryError::Validation(format!(
                "出库数量必须在 1 到 {} 之间",
                product.quantity
            )));
        }

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;

        let commit = ProductCommit::update(updated, product.version)
            .with_movement(
                NewMovement::new(MovementType::StatusChange, to, actor.user_id)
                    .from_status(from)
                    .goods(quantity, total_weight(quantity, product.unit_weight_kg))
                    .reason(Some(reason.clone())),
            )
            .with_withdrawal(WithdrawalWrite::Insert(NewWithdrawal {
                requested_by: actor.user_id,
                reason,
                quantity,
                product_quantity: product.quantity,
            }));
        let result = commit_transition(self.products.as_ref(), action, from, commit).await?;
        let withdrawal = committed_withdrawal(result.withdrawal)?;

        info!(
            withdrawal_id = withdrawal.id,
            product_id,
            quantity,
            partial = withdrawal.is_partial(),
            "出库申请已提交"
        );
        Ok(withdrawal)
    }

    /// 批准出库（仅管理员）
    #[instrument(skip(self, note), fields(actor = actor.user_id))]
    pub async fn approve(
        &self,
        id: i64,
        note: Option<String>,
        actor: Actor,
    ) -> Result<WithdrawalRequest> {
        let (withdrawal, product) = self.load_pending(id).await?;

        let partial = withdrawal.quantity < product.quantity;
        let action = if partial {
            ProductAction::ConfirmPartialWithdrawal
        } else {
            ProductAction::ConfirmWithdrawal
        };
        let to = guard(&product, action, actor)?;

        let location_id = product
            .location_id
            .ok_or_else(|| InventoryError::Internal(format!("待出库产品缺少库位: {}", product.id)))?;
        let location = self
            .locations
            .get(location_id)
            .await?
            .ok_or(InventoryError::LocationNotFound(location_id))?;

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;

        let withdrawn_weight = total_weight(withdrawal.quantity, product.unit_weight_kg);
        let location_change = if partial {
            updated.quantity -= withdrawal.quantity;
            updated.recompute_total_weight();
            LocationChange::Reweigh {
                location_id,
                weight_kg: updated.total_weight_kg,
            }
        } else {
            updated.location_id = None;
            LocationChange::Release { location_id }
        };

        let decided = decide(&withdrawal, WithdrawalStatus::Approved, note, actor);
        let commit = ProductCommit::update(updated, product.version)
            .with_location(location_change)
            .with_movement(
                NewMovement::new(MovementType::Exit, to, actor.user_id)
                    .from_status(from)
                    .from_location(&location)
                    .goods(withdrawal.quantity, withdrawn_weight)
                    .reason(Some(withdrawal.reason.clone())),
            )
            .with_withdrawal(WithdrawalWrite::Update(decided));
        let result = commit_transition(self.products.as_ref(), action, from, commit).await?;
        let withdrawal = committed_withdrawal(result.withdrawal)?;

        metrics::record_withdrawal_decision("approved");
        info!(
            withdrawal_id = id,
            product_id = product.id,
            partial,
            remaining = result.product.quantity,
            "出库申请已批准"
        );
        Ok(withdrawal)
    }

    /// 驳回出库（仅管理员）
    #[instrument(skip(self, note), fields(actor = actor.user_id))]
    pub async fn reject(
        &self,
        id: i64,
        note: Option<String>,
        actor: Actor,
    ) -> Result<WithdrawalRequest> {
        let withdrawal = self
            .close(id, ProductAction::RejectWithdrawal, WithdrawalStatus::Rejected, note, actor)
            .await?;

        metrics::record_withdrawal_decision("rejected");
        info!(withdrawal_id = id, "出库申请已驳回");
        Ok(withdrawal)
    }

    /// 撤回出库申请（申请人或管理员）
    #[instrument(skip(self), fields(actor = actor.user_id))]
    pub async fn cancel(&self, id: i64, actor: Actor) -> Result<WithdrawalRequest> {
        let current = self.load(id).await?;
        if current.requested_by != actor.user_id && !actor.is_admin() {
            return Err(InventoryError::Forbidden(
                "只有申请人或管理员可以撤回出库申请".to_string(),
            ));
        }

        let withdrawal = self
            .close(id, ProductAction::CancelWithdrawal, WithdrawalStatus::Cancelled, None, actor)
            .await?;

        metrics::record_withdrawal_decision("cancelled");
        info!(withdrawal_id = id, "出库申请已撤回");
        Ok(withdrawal)
    }

    pub async fn get(&self, id: i64) -> Result<WithdrawalRequest> {
        self.load(id).await
    }

    pub async fn list(
        &self,
        filter: &WithdrawalFilter,
        page: PageRequest,
    ) -> Result<Paged<WithdrawalRequest>> {
        self.withdrawals.list(filter, page).await
    }

    /// 驳回和撤回：产品回到 LOCADO，只记录状态变更
    async fn close(
        &self,
        id: i64,
        action: ProductAction,
        status: WithdrawalStatus,
        note: Option<String>,
        actor: Actor,
    ) -> Result<WithdrawalRequest> {
        let (withdrawal, product) = self.load_pending(id).await?;
        let to = guard(&product, action, actor)?;

        let from = product.status;
        let mut updated = product.clone();
        updated.status = to;

        let decided = decide(&withdrawal, status, note, actor);
        let commit = ProductCommit::update(updated, product.version)
            .with_movement(
                NewMovement::new(MovementType::StatusChange, to, actor.user_id)
                    .from_status(from)
                    .goods(withdrawal.quantity, total_weight(withdrawal.quantity, product.unit_weight_kg))
                    .reason(decided.decision_note.clone()),
            )
            .with_withdrawal(WithdrawalWrite::Update(decided));
        let result = commit_transition(self.products.as_ref(), action, from, commit).await?;

        committed_withdrawal(result.withdrawal)
    }

    async fn load(&self, id: i64) -> Result<WithdrawalRequest> {
        self.withdrawals
            .get(id)
            .await?
            .ok_or(InventoryError::WithdrawalNotFound(id))
    }

    async fn load_product(&self, id: i64) -> Result<Product> {
        self.products
            .get(id)
            .await?
            .ok_or(InventoryError::ProductNotFound(id))
    }

    async fn load_pending(&self, id: i64) -> Result<(WithdrawalRequest, Product)> {
        let withdrawal = self.load(id).await?;
        if !withdrawal.is_pending() {
            return Err(InventoryError::WithdrawalNotPending(id));
        }
        let product = self.load_product(withdrawal.product_id).await?;
        if product.status != ProductStatus::AguardandoRetirada {
            return Err(InventoryError::Internal(format!(
                "出库申请 {} 对应的产品状态异常: {}",
                id, product.status
            )));
        }
        Ok((withdrawal, product))
    }
}

fn decide(
    withdrawal: &WithdrawalRequest,
    status: WithdrawalStatus,
    note: Option<String>,
    actor: Actor,
) -> WithdrawalRequest {
    WithdrawalRequest {
        status,
        decided_by: Some(actor.user_id),
        decided_at: Some(Utc::now()),
        decision_note: optional_text(note),
        ..withdrawal.clone()
    }
}

fn committed_withdrawal(withdrawal: Option<WithdrawalRequest>) -> Result<WithdrawalRequest> {
    withdrawal.ok_or_else(|| InventoryError::Internal("提交结果缺少出库申请".to_string()))
}
