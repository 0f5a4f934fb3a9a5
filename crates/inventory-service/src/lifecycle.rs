//! 产品状态机
//!
//! 纯函数实现，不做任何 I/O。服务层先通过 [`check`] 得到目标状态，
//! 再把产品、库位和流水一起提交。
//!
//! ```text
//! CADASTRADO          --submit-->          AGUARDANDO_LOCACAO
//! CADASTRADO | AGUARDANDO_LOCACAO --allocate--> LOCADO
//! CADASTRADO | AGUARDANDO_LOCACAO --cancel-->   CANCELADO
//! LOCADO              --move-->            LOCADO
//! LOCADO              --request-->         AGUARDANDO_RETIRADA
//! AGUARDANDO_RETIRADA --confirm-->         RETIRADO（全部）/ LOCADO（部分）
//! AGUARDANDO_RETIRADA --reject/cancel-->   LOCADO
//! 非终态（待出库除外） --remove-->          REMOVIDO
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{InventoryError, Result};
use crate::models::{Product, ProductStatus, UserRole};

/// 驱动状态变化的业务动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductAction {
    /// 提交上架
    SubmitForAllocation,
    /// 分配库位
    Allocate,
    /// 移库
    Move,
    /// 申请出库
    RequestWithdrawal,
    /// 批准出库（全部）
    ConfirmWithdrawal,
    /// 批准出库（部分），剩余数量留在原库位
    ConfirmPartialWithdrawal,
    /// 驳回出库
    RejectWithdrawal,
    /// 撤回出库申请
    CancelWithdrawal,
    /// 上架前作废
    Cancel,
    /// 管理员移除
    Remove,
}

impl ProductAction {
    pub const ALL: [ProductAction; 10] = [
        Self::SubmitForAllocation,
        Self::Allocate,
        Self::Move,
        Self::RequestWithdrawal,
        Self::ConfirmWithdrawal,
        Self::ConfirmPartialWithdrawal,
        Self::RejectWithdrawal,
        Self::CancelWithdrawal,
        Self::Cancel,
        Self::Remove,
    ];

    /// 执行该动作所需的角色
    ///
    /// 撤回出库申请在这里只要求登录，"仅申请人或管理员" 由出库服务校验
    pub fn required_role(&self) -> UserRole {
        match self {
            Self::ConfirmWithdrawal
            | Self::ConfirmPartialWithdrawal
            | Self::RejectWithdrawal
            | Self::Remove => UserRole::Admin,
            _ => UserRole::Operador,
        }
    }

    /// 动作完成后的目标状态
    pub fn target(&self) -> ProductStatus {
        match self {
            Self::SubmitForAllocation => ProductStatus::AguardandoLocacao,
            Self::Allocate
            | Self::Move
            | Self::ConfirmPartialWithdrawal
            | Self::RejectWithdrawal
            | Self::CancelWithdrawal => ProductStatus::Locado,
            Self::RequestWithdrawal => ProductStatus::AguardandoRetirada,
            Self::ConfirmWithdrawal => ProductStatus::Retirado,
            Self::Cancel => ProductStatus::Cancelado,
            Self::Remove => ProductStatus::Removido,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitForAllocation => "SUBMIT_FOR_ALLOCATION",
            Self::Allocate => "ALLOCATE",
            Self::Move => "MOVE",
            Self::RequestWithdrawal => "REQUEST_WITHDRAWAL",
            Self::ConfirmWithdrawal => "CONFIRM_WITHDRAWAL",
            Self::ConfirmPartialWithdrawal => "CONFIRM_PARTIAL_WITHDRAWAL",
            Self::RejectWithdrawal => "REJECT_WITHDRAWAL",
            Self::CancelWithdrawal => "CANCEL_WITHDRAWAL",
            Self::Cancel => "CANCEL",
            Self::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for ProductAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProductStatus {
    /// 当前状态下是否允许执行该动作（不考虑角色）
    pub fn allows(&self, action: ProductAction) -> bool {
        use ProductAction as A;
        use ProductStatus as S;

        match action {
            A::SubmitForAllocation => *self == S::Cadastrado,
            A::Allocate | A::Cancel => matches!(self, S::Cadastrado | S::AguardandoLocacao),
            A::Move | A::RequestWithdrawal => *self == S::Locado,
            A::ConfirmWithdrawal
            | A::ConfirmPartialWithdrawal
            | A::RejectWithdrawal
            | A::CancelWithdrawal => *self == S::AguardandoRetirada,
            A::Remove => !self.is_terminal() && *self != S::AguardandoRetirada,
        }
    }
}

/// 状态机拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// 当前状态不允许该动作
    InvalidTransition {
        from: ProductStatus,
        action: ProductAction,
    },
    /// 角色不足
    Forbidden {
        action: ProductAction,
        required: UserRole,
    },
}

/// 计算状态变化
///
/// 先校验角色再校验状态
pub fn transition(
    from: ProductStatus,
    action: ProductAction,
    role: UserRole,
) -> std::result::Result<ProductStatus, TransitionError> {
    let required = action.required_role();
    if !role.satisfies(required) {
        return Err(TransitionError::Forbidden { action, required });
    }
    if !from.allows(action) {
        return Err(TransitionError::InvalidTransition { from, action });
    }
    Ok(action.target())
}

/// 对具体产品执行状态机校验，返回目标状态
pub fn check(product: &Product, action: ProductAction, role: UserRole) -> Result<ProductStatus> {
    transition(product.status, action, role).map_err(|e| match e {
        TransitionError::InvalidTransition { from, action } => InventoryError::InvalidTransition {
            product_id: product.id,
            from,
            action,
        },
        TransitionError::Forbidden { action, required } => {
            InventoryError::Forbidden(format!("{} 需要 {} 角色", action, required))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::tests::product;

    use ProductAction as A;
    use ProductStatus as S;

    /// (起始状态, 动作, 目标状态)，表外的组合全部非法
    const ALLOWED: &[(S, A, S)] = &[
        (S::Cadastrado, A::SubmitForAllocation, S::AguardandoLocacao),
        (S::Cadastrado, A::Allocate, S::Locado),
        (S::AguardandoLocacao, A::Allocate, S::Locado),
        (S::Locado, A::Move, S::Locado),
        (S::Locado, A::RequestWithdrawal, S::AguardandoRetirada),
        (S::AguardandoRetirada, A::ConfirmWithdrawal, S::Retirado),
        (S::AguardandoRetirada, A::ConfirmPartialWithdrawal, S::Locado),
        (S::AguardandoRetirada, A::RejectWithdrawal, S::Locado),
        (S::AguardandoRetirada, A::CancelWithdrawal, S::Locado),
        (S::Cadastrado, A::Cancel, S::Cancelado),
        (S::AguardandoLocacao, A::Cancel, S::Cancelado),
        (S::Cadastrado, A::Remove, S::Removido),
        (S::AguardandoLocacao, A::Remove, S::Removido),
        (S::Locado, A::Remove, S::Removido),
    ];

    #[test]
    fn test_transition_table_is_exhaustive() {
        for from in S::ALL {
            for action in A::ALL {
                let expected = ALLOWED
                    .iter()
                    .find(|(f, a, _)| *f == from && *a == action)
                    .map(|(_, _, to)| *to);

                let result = transition(from, action, UserRole::Admin);
                match expected {
                    Some(to) => assert_eq!(result, Ok(to), "{} + {}", from, action),
                    None => assert_eq!(
                        result,
                        Err(TransitionError::InvalidTransition { from, action }),
                        "{} + {} should be rejected",
                        from,
                        action
                    ),
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        for from in [S::Retirado, S::Removido, S::Cancelado] {
            for action in A::ALL {
                assert!(!from.allows(action));
            }
        }
    }

    #[test]
    fn test_operator_cannot_run_admin_actions() {
        for action in [
            A::ConfirmWithdrawal,
            A::ConfirmPartialWithdrawal,
            A::RejectWithdrawal,
            A::Remove,
        ] {
            let from = if action == A::Remove {
                S::Locado
            } else {
                S::AguardandoRetirada
            };
            assert_eq!(
                transition(from, action, UserRole::Operador),
                Err(TransitionError::Forbidden {
                    action,
                    required: UserRole::Admin
                })
            );
        }
    }

    #[test]
    fn test_operator_runs_daily_actions() {
        assert_eq!(
            transition(S::Cadastrado, A::SubmitForAllocation, UserRole::Operador),
            Ok(S::AguardandoLocacao)
        );
        assert_eq!(
            transition(S::Locado, A::RequestWithdrawal, UserRole::Operador),
            Ok(S::AguardandoRetirada)
        );
        assert_eq!(
            transition(S::AguardandoRetirada, A::CancelWithdrawal, UserRole::Operador),
            Ok(S::Locado)
        );
    }

    #[test]
    fn test_check_maps_to_domain_errors() {
        let p = product(42, S::Retirado);
        match check(&p, A::Move, UserRole::Admin) {
            Err(InventoryError::InvalidTransition {
                product_id, from, ..
            }) => {
                assert_eq!(product_id, 42);
                assert_eq!(from, S::Retirado);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let p = product(43, S::Locado);
        assert!(matches!(
            check(&p, A::Remove, UserRole::Operador),
            Err(InventoryError::Forbidden(_))
        ));
    }
}
