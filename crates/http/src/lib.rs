//! HTTP server facade for shelf: router assembly, session gate, views, and
//! HTML error responses.

use std::future::Future;

use anyhow::Context;
use axum::{extract::Request, routing::get, Router, ServiceExt};
use tower::Layer;

use shelf_kernel::settings::Settings;
use shelf_kernel::ModuleRegistry;

pub mod auth;
pub mod error;
pub mod method_override;
pub mod router;
pub mod view;

pub use auth::{AuthState, CurrentUser};
pub use error::AppError;
pub use method_override::MethodOverrideLayer;
pub use view::{Renderer, View};

use router::RouterBuilder;

/// Build the main HTTP router with all module routes mounted
pub fn build_router(
    registry: &ModuleRegistry,
    settings: &Settings,
    auth: AuthState,
) -> anyhow::Result<Router> {
    let mut router_builder = RouterBuilder::new().route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_router = module
            .routes()
            .with_context(|| format!("failed to build routes of module '{}'", module.name()))?;

        tracing::info!(module = module.name(), "mounting module routes");
        router_builder = router_builder.mount_module(module_router);
    }

    // Order matters: everything added before the gate is guarded by it, and
    // the outer layers run first on the way in.
    let router = router_builder
        .with_openapi(registry)
        .with_session_gate(auth)
        .with_timeout(settings.server.request_timeout_ms)
        .with_tracing()
        .with_request_id()
        .build();

    Ok(router)
}

/// Serve `router` until `shutdown` resolves
pub async fn start_server(
    router: Router,
    settings: &Settings,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    // Method override has to see the request before the router does
    let app = MethodOverrideLayer.layer(router);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
