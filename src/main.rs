use anyhow::Context;
use ignite_kernel::settings::Settings;

/// Container entrypoint: provision the store once and print the report.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load settings")?;
    ignite_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        database = %settings.database.name,
        "ignite-app bootstrap starting"
    );

    let report = ignite_app::bootstrap(&settings).await?;
    println!("{report}");

    Ok(())
}
