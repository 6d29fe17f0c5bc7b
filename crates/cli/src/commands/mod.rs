pub mod init;
pub mod memory;
pub mod solve;
pub mod tools;

use reagent_config::AppConfig;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
