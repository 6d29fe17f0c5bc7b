//! `reagent init`: first-time setup.

use reagent_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if config_path.exists() {
        return Err(format!(
            "Config already exists at {}. Edit it manually or delete it and re-run init.",
            config_path.display()
        )
        .into());
    }

    std::fs::create_dir_all(config_dir.join("data"))?;
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("Created {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set QWEN_API_KEY (or OPENAI_API_KEY with LLM_PROVIDER=openai),");
    println!("     or add api_key to the config file");
    println!("  2. Run: reagent solve \"compute 12 + 8\"");

    Ok(())
}
