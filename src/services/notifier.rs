// src/services/notifier.rs

//! Notification dispatch.
//!
//! One message per new job, sent sequentially to a single destination with
//! a fixed pause between messages. A failed message is logged and the rest
//! are still attempted; nothing is retried within a cycle.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{NewJob, TelegramConfig};

/// How the channel should interpret message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Html,
    Plain,
}

impl RenderMode {
    fn parse_mode(self) -> Option<&'static str> {
        match self {
            RenderMode::Html => Some("HTML"),
            RenderMode::Plain => None,
        }
    }
}

/// Transport that delivers a single message.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    async fn send(&self, destination: &str, text: &str, mode: RenderMode) -> Result<()>;
}

/// Telegram Bot API `sendMessage` transport.
pub struct TelegramChannel {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramChannel {
    pub fn new(client: Client, api_base: &str, bot_token: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token),
        }
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    async fn send(&self, destination: &str, text: &str, mode: RenderMode) -> Result<()> {
        let payload = SendMessage {
            chat_id: destination,
            text,
            parse_mode: mode.parse_mode(),
            disable_web_page_preview: false,
        };

        let response = self.client.post(&self.endpoint).json(&payload).send().await?;
        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(ApiResponse { description, .. }) => Err(AppError::notify(format!(
                "Telegram returned {status}: {}",
                description.unwrap_or_else(|| "no description".into())
            ))),
            None => Err(AppError::notify(format!(
                "Telegram returned {status} with an unreadable body"
            ))),
        }
    }
}

/// Outcome of one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Whether a channel and destination were configured
    pub configured: bool,
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchReport {
    /// True iff every message was delivered (trivially true with no jobs).
    pub fn succeeded(&self) -> bool {
        self.configured && self.failed == 0
    }
}

/// Renders new jobs and sends them through a channel.
pub struct Dispatcher {
    target: Option<(Arc<dyn NotifyChannel>, String)>,
    template: String,
    mode: RenderMode,
    pacing: Duration,
}

impl Dispatcher {
    pub fn new(
        channel: Arc<dyn NotifyChannel>,
        destination: impl Into<String>,
        template: impl Into<String>,
        pacing: Duration,
    ) -> Self {
        Self {
            target: Some((channel, destination.into())),
            template: template.into(),
            mode: RenderMode::Html,
            pacing,
        }
    }

    /// Dispatcher with no destination; every dispatch reports "not sent".
    pub fn unconfigured() -> Self {
        Self {
            target: None,
            template: String::new(),
            mode: RenderMode::Plain,
            pacing: Duration::ZERO,
        }
    }

    /// Telegram dispatcher from config, or an unconfigured one when the
    /// token or chat id is missing.
    pub fn from_config(config: &TelegramConfig, client: Client) -> Self {
        match config.credentials() {
            Some((token, chat_id)) => Self::new(
                Arc::new(TelegramChannel::new(client, &config.api_base, token)),
                chat_id,
                config.message_template.clone(),
                Duration::from_millis(config.pacing_ms),
            ),
            None => Self::unconfigured(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }

    /// Render a job with the configured template, escaping fields for HTML.
    pub fn render(&self, job: &NewJob) -> String {
        match self.mode {
            RenderMode::Html => NewJob {
                company: html_escape::encode_text(&job.company).into_owned(),
                title: html_escape::encode_text(&job.title).into_owned(),
                link: html_escape::encode_double_quoted_attribute(&job.link).into_owned(),
            }
            .format(&self.template),
            RenderMode::Plain => job.format(&self.template),
        }
    }

    /// Send one message per job, in order.
    pub async fn dispatch(&self, jobs: &[NewJob]) -> DispatchReport {
        let Some((channel, destination)) = &self.target else {
            log::warn!("Notification channel not configured; {} job(s) not sent", jobs.len());
            return DispatchReport::default();
        };

        let mut report = DispatchReport {
            configured: true,
            ..DispatchReport::default()
        };

        for (i, job) in jobs.iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            let text = self.render(job);
            match channel.send(destination, &text, self.mode).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!("Failed to notify {} / {}: {}", job.company, job.title, e);
                }
            }
        }

        if report.failed > 0 {
            log::warn!(
                "Partial delivery: {} of {} notification(s) sent",
                report.delivered,
                jobs.len()
            );
        }
        report
    }
}
