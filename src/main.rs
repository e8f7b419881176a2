mod camera_capture;
mod config;
mod db;
mod models;
mod processor;
mod sent_state;
#[cfg(test)]
mod test_support;
mod webhook;

use anyhow::Context;
use camera_capture::HttpCameraCapture;
use config::{AppConfig, EnvSource};
use db::pg_store::PgStore;
use processor::run_driver::{RunDriver, RunSettings};
use sent_state::SentState;
use tracing::info;
use webhook::DiscordWebhook;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let (config, env_source) = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    match env_source {
        EnvSource::DotEnv => info!("Loaded configuration from .env"),
        EnvSource::DotEnvDev => info!("Loaded configuration from .env.dev"),
        EnvSource::Process => info!("No .env or .env.dev file found, reading from system environment"),
    }

    // Init DB
    let pool = db::init_pool(&config.database_url)
        .await
        .context("connecting to database")?;
    info!("Connected to database");
    let store = PgStore::new(pool);

    let channel = DiscordWebhook::new(config.webhook_url.clone(), config.http_timeout)?;
    let frames = HttpCameraCapture::new(config.capture_dir.clone(), config.http_timeout, store.clone())?;

    let mut sent_state = match &config.state_file {
        Some(path) => {
            info!(path = %path.display(), "Using state file");
            Some(SentState::load(path).await?)
        }
        None => None,
    };

    let driver = RunDriver::new(&store, &store, &frames, &channel, RunSettings::from(&config));
    let summary = driver.run_once(sent_state.as_mut()).await?;

    info!(notified = summary.notified, cleared = summary.cleared, "Run complete.");
    Ok(())
}
