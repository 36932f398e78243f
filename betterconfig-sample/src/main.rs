use anyhow::{Context, Result};
use betterconfig::{load_config, ClientConfig, ConfigurationProvider};
use betterconfig_sample::{
    build_client, render, sample_interval, Sample, TextView, SAMPLE_PROJECT_SECRET,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "betterconfig_sample=info,betterconfig=info".into()),
        )
        .init();

    info!("BetterConfig sample starting...");

    // Optional TOML file, then environment overrides
    let config = match std::env::var("BETTERCONFIG_CONFIG") {
        Ok(path) => load_config(&path)
            .with_context(|| format!("Failed to load configuration file {}", path))?,
        Err(_) => {
            let mut config = ClientConfig::default();
            config.client.project_secret = SAMPLE_PROJECT_SECRET.to_string();
            config
        }
    }
    .with_env_overrides();

    info!(
        project_secret = %config.client.project_secret,
        base_url = %config.client.base_url,
        interval_seconds = sample_interval(&config),
        "Configuration loaded"
    );

    let client =
        build_client(&config, TextView::stdout()).context("Failed to build BetterConfig client")?;

    let sample = client.get_configuration(Sample::default()).await;
    info!(sample = %render(&sample).replace('\n', ", "), "Whole configuration");

    let sample_text = client.get_string_value("keySampleText", "").await;
    info!(key_sample_text = %sample_text, "Single value");

    let missing = client
        .get_string_value("myKeyNotExits", "Default value from the application")
        .await;
    info!(my_key_not_exits = %missing, "Missing key falls back to the default");

    info!("Watching for configuration changes, press Ctrl-C to exit");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    client.close().await;
    info!("BetterConfig sample stopped");
    Ok(())
}
