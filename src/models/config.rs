//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::StrategySpec;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cycle and state settings
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// HTTP fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Notification channel settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Keywords used by sources that do not list their own
    #[serde(default = "defaults::keywords")]
    pub default_keywords: Vec<String>,

    /// Monitored recruiting pages, checked in order
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.telegram.bot_token = Some(token);
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID").filter(|v| !v.trim().is_empty()) {
            self.telegram.chat_id = Some(chat_id);
        }
        if let Some(raw) = lookup("CHECK_INTERVAL_MINUTES") {
            match raw.trim().parse::<u64>() {
                Ok(minutes) => self.watcher.interval_minutes = minutes,
                Err(e) => log::warn!("Ignoring CHECK_INTERVAL_MINUTES={raw:?}: {e}"),
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Keywords in effect for a source.
    pub fn keywords_for<'a>(&'a self, source: &'a SourceConfig) -> &'a [String] {
        source.keywords.as_deref().unwrap_or(&self.default_keywords)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.watcher.interval_minutes == 0 {
            return Err(AppError::validation("watcher.interval_minutes must be > 0"));
        }
        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(AppError::validation("A source has an empty name"));
            }
            if !names.insert(source.name.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate source name: {}",
                    source.name
                )));
            }
            Url::parse(&source.url).map_err(|e| {
                AppError::validation(format!("Source {} has invalid url: {e}", source.name))
            })?;
            if self.keywords_for(source).iter().all(|k| k.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "Source {} has no keywords",
                    source.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watcher: WatcherConfig::default(),
            fetch: FetchConfig::default(),
            telegram: TelegramConfig::default(),
            default_keywords: defaults::keywords(),
            sources: defaults::sources(),
        }
    }
}

/// Check cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Minutes between cycles in watch mode
    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u64,

    /// Send notifications on a cycle that starts without any saved state
    #[serde(default = "defaults::notify_on_first_run")]
    pub notify_on_first_run: bool,

    /// State file name, relative to the storage directory
    #[serde(default = "defaults::state_file")]
    pub state_file: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval_minutes: defaults::interval_minutes(),
            notify_on_first_run: defaults::notify_on_first_run(),
            state_file: defaults::state_file(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Telegram channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    /// Delay between consecutive messages in milliseconds
    #[serde(default = "defaults::pacing_ms")]
    pub pacing_ms: u64,

    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Message template with `{company}`, `{title}` and `{link}` placeholders
    #[serde(default = "defaults::message_template")]
    pub message_template: String,
}

impl TelegramConfig {
    /// Token and chat id, if both are set and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.bot_token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let chat = self.chat_id.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        Some((token, chat))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            pacing_ms: defaults::pacing_ms(),
            api_base: defaults::api_base(),
            message_template: defaults::message_template(),
        }
    }
}

/// One monitored recruiting page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source name, also the key of its seen-set
    pub name: String,

    /// Page to fetch
    pub url: String,

    /// Keywords for this source (falls back to `default_keywords`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    /// Name of a registered extraction strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extractor: Option<String>,

    /// Inline extraction strategy, takes precedence over `extractor`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategySpec>,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            keywords: None,
            extractor: None,
            strategy: None,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }
}

mod defaults {
    use super::SourceConfig;

    // Watcher defaults
    pub fn interval_minutes() -> u64 {
        60
    }
    pub fn notify_on_first_run() -> bool {
        true
    }
    pub fn state_file() -> String {
        "jobs_data.json".into()
    }

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Telegram defaults
    pub fn pacing_ms() -> u64 {
        1000
    }
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn message_template() -> String {
        "🎨 <b>New design job posted!</b>\n\n\
         🏢 <b>Company:</b> {company}\n\
         💼 <b>Title:</b> {title}\n\
         🔗 <b>Link:</b> <a href=\"{link}\">View details</a>"
            .into()
    }

    pub fn keywords() -> Vec<String> {
        [
            "design",
            "designer",
            "ui",
            "ux",
            "visual",
            "graphic",
            "product design",
            "设计",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    pub fn sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig::new(
                "Airbnb",
                "https://careers.airbnb.com/positions/?_offices=china",
            ),
            SourceConfig::new(
                "OpenAI",
                "https://openai.com/careers/search/?c=f6aa76fa-ec6f-4dd8-b3c7-531e313e3e63",
            ),
            SourceConfig::new(
                "Binance",
                "https://www.binance.com/en/careers/department?name=Product%20%26%20Design&team=Design&job=",
            ),
            SourceConfig::new(
                "Bitget",
                "https://hire-r1.mokahr.com/social-recruitment/bitget/100000079#/jobs?zhineng%5B0%5D=100004123",
            ),
            SourceConfig::new(
                "Bybit",
                "https://jobs.bybitglobal.com/social-recruitment/bybit/45685#/jobs?department%5B0%5D=1110472",
            ),
            SourceConfig::new("Ethena.fi", "https://x.com/ethena_labs/jobs"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_sources() {
        let mut config = Config::default();
        config.sources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let mut config = Config::default();
        config
            .sources
            .push(SourceConfig::new("Airbnb", "https://example.com/jobs"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = Config::default();
        config.sources = vec![SourceConfig::new("Broken", "not a url")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_keywords() {
        let mut config = Config::default();
        config.sources =
            vec![SourceConfig::new("Acme", "https://acme.test/jobs").with_keywords(["  "])];
        assert!(config.validate().is_err());
    }

    #[test]
    fn keywords_fall_back_to_defaults() {
        let config = Config::default();
        let own = SourceConfig::new("Acme", "https://acme.test").with_keywords(["brand"]);
        let shared = SourceConfig::new("Other", "https://other.test");
        assert_eq!(config.keywords_for(&own), ["brand".to_string()]);
        assert_eq!(config.keywords_for(&shared), config.default_keywords.as_slice());
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            default_keywords = ["design"]

            [watcher]
            notify_on_first_run = false

            [[sources]]
            name = "Acme"
            url = "https://acme.test/careers"
            extractor = "generic"
            "#,
        )
        .unwrap();

        assert!(!config.watcher.notify_on_first_run);
        assert_eq!(config.watcher.interval_minutes, 60);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].extractor.as_deref(), Some("generic"));
        assert_eq!(config.telegram.pacing_ms, 1000);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config.apply_env_with(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("123:abc".into()),
            "TELEGRAM_CHAT_ID" => Some("-100".into()),
            "CHECK_INTERVAL_MINUTES" => Some("15".into()),
            _ => None,
        });
        assert_eq!(config.telegram.credentials(), Some(("123:abc", "-100")));
        assert_eq!(config.watcher.interval_minutes, 15);
    }

    #[test]
    fn bad_interval_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_with(|key| (key == "CHECK_INTERVAL_MINUTES").then(|| "soon".into()));
        assert_eq!(config.watcher.interval_minutes, 60);
    }

    #[test]
    fn blank_credentials_are_unconfigured() {
        let mut telegram = TelegramConfig::default();
        assert!(!telegram.is_configured());
        telegram.bot_token = Some("token".into());
        telegram.chat_id = Some("   ".into());
        assert!(!telegram.is_configured());
    }
}
