//! HTTP 请求处理器

pub mod auth;
pub mod chambers;
pub mod clients;
pub mod locations;
pub mod movements;
pub mod products;
pub mod stats;
pub mod users;
pub mod withdrawals;
