use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Migration definition contributed by a module. `up` is a batch of SQL
/// statements applied once, tracked by `(module, id)` in the migration ledger.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Core trait every shelf module implements. A module bundles its routes,
/// schema migrations, and OpenAPI fragment; dependencies (store handles,
/// collectors) are captured at construction time, so `routes` returns a
/// stateless router.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module.
    fn name(&self) -> &'static str;

    /// Initialize the module; called during startup before migrations.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Axum router for this module's routes, merged into the root router.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI specification fragment for this module as JSON; merged with
    /// the other modules' fragments.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Migrations contributed by this module, executed in the order returned.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }
}
