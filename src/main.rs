use std::sync::Arc;

use anyhow::Context;

use shelf_app::modules;
use shelf_db::Db;
use shelf_kernel::settings::Settings;
use shelf_kernel::{InitCtx, ModuleRegistry};
use shelf_telemetry::RequestMetrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;

    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "shelf-app bootstrap starting"
    );

    let db = Db::open(&settings.database.path).with_context(|| "failed to open database")?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &db);

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await?;

    let migrations = registry.collect_migrations();
    let migration_refs: Vec<(&str, &str, &str)> = migrations
        .iter()
        .map(|(module, migration)| (module.as_str(), migration.id, migration.up))
        .collect();
    let applied = db
        .apply_migrations(&migration_refs)
        .with_context(|| "failed to apply migrations")?;
    tracing::info!(applied, "migrations up to date");

    // Metrics collector is constructed here and injected; no global registry.
    let metrics = Arc::new(RequestMetrics::new());

    shelf_http::start_server(&registry, &settings, metrics).await
}
