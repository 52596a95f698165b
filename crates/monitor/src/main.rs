//! Monitoring server
//!
//! Compiles metric and meter queries for cluster resources, runs them
//! against Prometheus and serves the post-processed results over HTTP.

use anyhow::{Context, Result};
use monitor_lib::{
    health::{components, HealthRegistry},
    observability::{MonitorMetrics, StructuredLogger},
    Catalog, Compiler, Executor, KubeNamespaceProvider, MonitoringService, PrometheusBackend,
};
use monitor_server::{api, config::MonitorConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting monitor-server");

    let config = MonitorConfig::load()?;
    info!(
        prometheus = %config.prometheus_endpoint,
        error_policy = ?config.error_policy,
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry
        .register_all(&[components::BACKEND, components::METADATA, components::EXECUTOR])
        .await;

    let metrics = MonitorMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    let backend = PrometheusBackend::new(&config.prometheus_endpoint, config.request_timeout())
        .context("Failed to create Prometheus client")?;
    let executor = Executor::new(
        Arc::new(backend),
        Compiler::new(Arc::new(Catalog::new())),
        config.error_policy,
    );

    let mut service = MonitoringService::new(executor)
        .with_default_price(config.price())
        .with_health(health_registry.clone())
        .with_logger(logger.clone());

    if config.namespace_clamp {
        match KubeNamespaceProvider::try_default().await {
            Ok(provider) => service = service.with_metadata(Arc::new(provider)),
            Err(e) => {
                warn!(error = %e, "Kubernetes API unavailable, namespace clamping disabled");
                health_registry
                    .set_degraded(components::METADATA, e.to_string())
                    .await;
            }
        }
    }

    logger.log_startup(SERVER_VERSION, &config.prometheus_endpoint);

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        service,
    ));

    health_registry.set_ready(true).await;

    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        served = &mut api_handle => {
            served
                .context("API server task panicked")?
                .context("API server failed")?;
            logger.log_shutdown("API server stopped");
        }
    }

    info!("Shutting down");
    Ok(())
}
