// src/config.rs

//! Configuration loading utilities.

use std::path::{Path, PathBuf};

use crate::models::Config;

/// Name of the config file inside the storage directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Path of the config file for a storage directory.
pub fn config_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(CONFIG_FILE)
}

/// Load `{storage_dir}/config.toml` and apply environment overrides.
///
/// Falls back to defaults if the file is missing or invalid.
pub fn load_config(storage_dir: &Path) -> Config {
    load_config_with(storage_dir, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit variable lookup.
pub fn load_config_with<F>(storage_dir: &Path, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = Config::load_or_default(config_path(storage_dir));
    config.apply_env_with(lookup);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_with(tmp.path(), |_| None);
        assert_eq!(config.sources.len(), Config::default().sources.len());
    }

    #[test]
    fn test_reads_config_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            config_path(tmp.path()),
            r#"
default_keywords = ["motion"]

[watcher]
interval_minutes = 15

[[sources]]
name = "Acme"
url = "https://acme.test/careers"
"#,
        )
        .unwrap();

        let config = load_config_with(tmp.path(), |key| {
            (key == "TELEGRAM_CHAT_ID").then(|| "42".to_string())
        });
        assert_eq!(config.telegram.chat_id.as_deref(), Some("42"));
        assert_eq!(config.watcher.interval_minutes, 15);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.keywords_for(&config.sources[0]), ["motion".to_string()]);
    }
}
