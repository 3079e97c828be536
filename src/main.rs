use anyhow::Context;
use shelf::modules;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;

    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.path,
        "shelf bootstrap starting"
    );

    let db = shelf_db::connect(&settings.database.path)
        .with_context(|| format!("failed to open store at '{}'", settings.database.path))?;

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    registry.ensure_schema(db.as_ref())?;

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    tracing::info!("shelf bootstrap complete");

    let served = shelf_http::start_server(&registry, &settings).await;
    registry.stop_all().await?;
    served
}
