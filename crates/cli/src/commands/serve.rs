//! `namecard serve` — start the HTTP gateway.

use anyhow::Context;
use namecard_config::AppConfig;

pub async fn run(port: Option<u16>, seed_demo: bool) -> anyhow::Result<()> {
    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(port) = port {
        config.gateway.port = port;
    }

    namecard_gateway::start(config, seed_demo)
        .await
        .map_err(|e| anyhow::anyhow!("gateway failed: {e}"))
}
