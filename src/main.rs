use anyhow::Context;
use bookrev_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load BookRev settings")?;
    bookrev_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        seed = ?settings.database.seed_csv,
        "bookrev-app bootstrap starting"
    );

    bookrev_app::run(settings).await
}
