use anyhow::{Context, Result};
use std::sync::Arc;

use loginsight_client::config::{Config, LogFormat};
use loginsight_client::Connection;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;

    init_logging(&config);

    tracing::debug!(
        "Target configured: {}:{} (tls: {}, verify: {})",
        config.host,
        config.port,
        config.use_tls,
        config.verify_tls
    );

    let credentials = config.credentials().map(Arc::new);
    if credentials.is_none() {
        tracing::info!("No credentials configured, sending unauthenticated requests");
    }

    let connection = Connection::new(config.connection_config(), credentials)
        .context("Failed to create connection")?;

    let response = connection
        .request(
            config.method.clone(),
            &config.path,
            config.request_options(),
        )
        .await
        .with_context(|| format!("{} {} failed", config.method, config.path))?;

    let status = response.status();
    if let Some(warning) = response.warning() {
        eprintln!("Warning: {}", warning);
    }
    eprintln!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""));

    let body = response.text().await.context("Failed to read response body")?;
    println!("{}", body);

    if !status.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize logging with the configured level and format
fn init_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase()));

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .init();
        }
    }
}
