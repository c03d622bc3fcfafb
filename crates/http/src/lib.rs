//! HTTP server facade for shelf with Axum, error handling, and OpenAPI support.

use std::sync::Arc;

use anyhow::Context;

use shelf_kernel::ModuleRegistry;
use shelf_telemetry::RequestMetrics;

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Start the HTTP server with the given module registry. The metrics
/// collector is injected by the caller; this layer never owns global state.
pub async fn start_server(
    registry: &ModuleRegistry,
    settings: &shelf_kernel::settings::Settings,
    metrics: Arc<RequestMetrics>,
) -> anyhow::Result<()> {
    tracing::info!(
        "starting HTTP server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    let app = build_router(registry, settings, metrics);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", settings.server.host, settings.server.port))
            .await
            .context("failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Build the main HTTP router with all module routes merged in.
pub fn build_router(
    registry: &ModuleRegistry,
    settings: &shelf_kernel::settings::Settings,
    metrics: Arc<RequestMetrics>,
) -> axum::Router {
    let mut router_builder =
        RouterBuilder::new().route("/healthz", axum::routing::get(health_check));

    for module in registry.modules() {
        router_builder = router_builder.merge_module(module.name(), module.routes());
    }

    router_builder = router_builder.with_openapi(registry);

    // Layers wrap the routes added above them, so middleware goes last.
    router_builder = router_builder
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .with_metrics(metrics);

    router_builder.build()
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}
