// src/pipeline/validate.rs

use crate::error::Result;
use crate::models::Config;
use crate::services::ExtractorRegistry;

/// Validate configuration values and compile every extraction strategy.
///
/// Returns the registry so callers can reuse it.
pub fn run_validate(config: &Config) -> Result<ExtractorRegistry> {
    log::info!("Validating configuration...");

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    log::info!("✓ Config OK");
    log::info!("    user agent: {}", config.fetch.user_agent);
    log::info!("    timeout: {}s", config.fetch.timeout_secs);
    log::info!("    interval: {} min", config.watcher.interval_minutes);
    log::info!("    default keywords: {}", config.default_keywords.len());

    let registry = match ExtractorRegistry::from_config(config) {
        Ok(registry) => registry,
        Err(e) => {
            log::error!("Strategy compilation failed: {}", e);
            return Err(e);
        }
    };
    log::info!("✓ Strategies OK");
    for source in &config.sources {
        let strategy = if source.strategy.is_some() {
            "inline".to_string()
        } else {
            source
                .extractor
                .clone()
                .unwrap_or_else(|| source.name.to_lowercase())
        };
        log::info!(
            "    {} [{}] {} keyword(s)",
            source.name,
            strategy,
            config.keywords_for(source).len()
        );
    }

    if config.telegram.is_configured() {
        log::info!("✓ Telegram configured");
    } else {
        log::warn!("Telegram not configured; new postings will only be logged");
    }

    Ok(registry)
}
