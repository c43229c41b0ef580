//! `namecard config` — show the active configuration or write a default file.

use namecard_config::AppConfig;

pub fn run(init: bool) -> anyhow::Result<()> {
    let path = AppConfig::config_path();

    if init {
        if path.exists() {
            println!("Config already exists at {}", path.display());
            return Ok(());
        }
        AppConfig::default().save_to(&path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let config = AppConfig::load()?;
    println!("Config file: {}", path.display());
    // Debug output redacts the API key and WeChat secret
    println!("{config:#?}");
    Ok(())
}
