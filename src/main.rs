use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ecoflow_client::{Config, EcoflowClient};

/// Print quotas of the configured device.
///
/// With no arguments every quota is fetched; otherwise the arguments are
/// quota names, e.g. `pd.soc inv.inputWatts`.
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; env vars may also be set externally
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!(sn = %config.sn, base_url = %config.base_url, "Loaded configuration");

    let client = EcoflowClient::new(&config);
    let quotas: Vec<String> = std::env::args().skip(1).collect();

    let response = if quotas.is_empty() {
        client
            .get_all_device_quotas()
            .await
            .context("failed to fetch all device quotas")?
    } else {
        client
            .query_quotas(quotas)
            .await
            .context("failed to fetch selected device quotas")?
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("failed to render response")?
    );

    Ok(())
}
