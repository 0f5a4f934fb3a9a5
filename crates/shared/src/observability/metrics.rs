//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "product_transitions_total",
        "Total number of product lifecycle transitions"
    );
    metrics::describe_counter!(
        "stock_movements_total",
        "Total number of recorded stock movements"
    );
    metrics::describe_counter!(
        "product_rejections_total",
        "Product operations rejected by lifecycle or capacity rules"
    );
    metrics::describe_counter!(
        "withdrawal_decisions_total",
        "Total number of decided withdrawal requests"
    );
    metrics::describe_counter!("login_attempts_total", "Total number of login attempts");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录产品状态流转
#[inline]
pub fn record_product_transition(action: &str, from: &str, to: &str) {
    metrics::counter!(
        "product_transitions_total",
        "action" => action.to_string(),
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

/// 记录库存流水
#[inline]
pub fn record_stock_movement(movement_type: &str) {
    metrics::counter!(
        "stock_movements_total",
        "movement_type" => movement_type.to_string()
    )
    .increment(1);
}

/// 记录被业务规则拒绝的产品操作
#[inline]
pub fn record_product_rejection(action: &str, reason: &str) {
    metrics::counter!(
        "product_rejections_total",
        "action" => action.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// 记录出库申请审批结果
#[inline]
pub fn record_withdrawal_decision(decision: &str) {
    metrics::counter!(
        "withdrawal_decisions_total",
        "decision" => decision.to_string()
    )
    .increment(1);
}

/// 记录登录尝试
#[inline]
pub fn record_login_attempt(outcome: &str) {
    metrics::counter!("login_attempts_total", "outcome" => outcome.to_string()).increment(1);
}
