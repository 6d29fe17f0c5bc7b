//! Provider construction from configuration.

use std::sync::Arc;
use std::time::Duration;
use reagent_config::{AppConfig, ConfigError};
use reagent_core::Provider;
use tracing::{info, warn};
use crate::gateway::{ModelGateway, RetryPolicy};
use crate::openai_compat::OpenAiCompatProvider;

/// Build the gateway for the configured provider.
///
/// An unsupported provider name is a configuration error. A missing API
/// key is not: requests will fail with `NotConfigured` instead, so
/// commands that never call the model still work.
pub fn build_from_config(config: &AppConfig) -> Result<ModelGateway, ConfigError> {
    let resolved = config.resolve_provider()?;

    if resolved.api_key.is_none() {
        warn!(provider = %resolved.name, "No API key configured; model calls will fail");
    }

    info!(provider = %resolved.name, model = %resolved.model, base_url = %resolved.base_url, "Using provider");

    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::new(
        &resolved.name,
        &resolved.base_url,
        resolved.api_key.clone(),
        &resolved.model,
        Duration::from_secs(config.request_timeout_secs),
    ));

    Ok(ModelGateway::new(provider)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens)
        .with_retry(RetryPolicy::new(config.retry.max_attempts, config.retry.base_delay_ms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_default_uses_qwen() {
        let config = AppConfig::default();
        let gateway = build_from_config(&config).unwrap();
        assert_eq!(gateway.provider_name(), "qwen");
        assert_eq!(gateway.model(), "qwen-turbo");
    }

    #[test]
    fn build_respects_model_override() {
        let mut config = AppConfig {
            provider: "openai".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            reagent_config::ProviderConfig {
                model: Some("gpt-4o".into()),
                ..Default::default()
            },
        );
        let gateway = build_from_config(&config).unwrap();
        assert_eq!(gateway.provider_name(), "openai");
        assert_eq!(gateway.model(), "gpt-4o");
    }

    #[test]
    fn unsupported_provider_is_rejected() {
        let config = AppConfig {
            provider: "mystery".into(),
            ..AppConfig::default()
        };
        assert!(matches!(
            build_from_config(&config),
            Err(ConfigError::UnsupportedProvider(_))
        ));
    }
}
