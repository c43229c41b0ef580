//! `namecard status` — a quick look at what is configured.

use namecard_config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    let path = AppConfig::config_path();
    let config = AppConfig::load()?;

    println!("namecard status");
    println!("  config file:  {} ({})", path.display(), if path.exists() { "present" } else { "absent, using defaults" });
    println!("  provider:     {} @ {}", config.provider.model, config.provider.base_url);
    println!("  api key:      {}", if config.provider.api_key.is_some() { "set" } else { "NOT SET" });
    println!("  wechat:       {}", if config.wechat_configured() { "configured" } else { "not configured" });
    println!("  store:        {} ({})", config.store.backend, config.store.path);
    println!("  gateway:      {}:{}", config.gateway.host, config.gateway.port);

    match config.validate() {
        Ok(()) => println!("  validation:   ok"),
        Err(e) => println!("  validation:   FAILED — {e}"),
    }

    Ok(())
}
