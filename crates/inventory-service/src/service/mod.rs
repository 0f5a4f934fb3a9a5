//! 业务服务层
//!
//! 服务只依赖仓储 trait，由 [`Repositories`](crate::repository::Repositories) 注入具体实现

mod chamber_service;
mod client_service;
pub mod dto;
mod location_service;
mod movement_service;
pub mod password;
mod product_service;
mod stats_service;
mod user_service;
mod withdrawal_service;

pub use chamber_service::ChamberService;
pub use client_service::ClientService;
pub use dto::*;
pub use location_service::{LocationService, MAX_GENERATED_LOCATIONS};
pub use movement_service::MovementService;
pub use product_service::ProductService;
pub use stats_service::StatsService;
pub use user_service::{LockoutPolicy, UserService};
pub use withdrawal_service::WithdrawalService;
