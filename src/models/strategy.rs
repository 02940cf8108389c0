// src/models/strategy.rs

//! Extraction policies, one per known page layout.
//!
//! Policies are plain data so they can live in `config.toml` next to the
//! source they describe. They are compiled into extractors by
//! [`crate::services::ExtractorRegistry`].

use serde::{Deserialize, Serialize};

/// Extraction policy for one page layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategySpec {
    /// Postings are hyperlinks
    Anchors(AnchorSpec),
    /// Postings are container elements, optionally wrapping a hyperlink
    Cards(CardSpec),
}

/// Gates and link policy shared by every strategy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPolicy {
    /// Candidates with fewer characters are dropped
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,

    /// Candidates equal to one of these (case-insensitive) are dropped
    #[serde(default)]
    pub blocked_exact: Vec<String>,

    /// Candidates containing one of these (case-insensitive) are dropped
    #[serde(default)]
    pub blocked_substrings: Vec<String>,

    /// Base for relative links; the fetched page URL when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Emitted titles are cut to this many characters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_title_len: Option<usize>,
}

fn default_min_text_len() -> usize {
    4
}

impl Default for TextPolicy {
    fn default() -> Self {
        Self {
            min_text_len: default_min_text_len(),
            blocked_exact: Vec::new(),
            blocked_substrings: Vec::new(),
            base_url: None,
            max_title_len: None,
        }
    }
}

/// Hyperlink-based layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnchorSpec {
    #[serde(flatten)]
    pub policy: TextPolicy,

    /// Restrict the search to this region when present on the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_selector: Option<String>,

    /// Nested elements searched for the title; the first one carrying a
    /// keyword wins, and the anchor's own text is used otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_title_selector: Option<String>,
}

/// Container-based layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardSpec {
    #[serde(flatten)]
    pub policy: TextPolicy,

    /// Candidate container elements
    pub card_selector: String,

    /// Regex the container's `class` attribute must match (case-insensitive)
    pub card_class_pattern: String,

    /// Nested title elements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_selector: Option<String>,

    /// Regex the nested title's `class` attribute must match (case-insensitive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_class_pattern: Option<String>,

    /// Length of the container text used as title when no nested title exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_title_len: Option<usize>,

    #[serde(default)]
    pub link_mode: LinkMode,
}

/// Where a card's link comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// The card itself if it is an anchor, else its first nested anchor
    #[default]
    Anchor,
    /// Always the fetched page URL
    PageUrl,
}

impl StrategySpec {
    /// Fallback used for sources without a bespoke layout.
    pub fn generic() -> Self {
        StrategySpec::Anchors(AnchorSpec {
            policy: TextPolicy {
                min_text_len: 4,
                blocked_exact: words(&["home", "careers", "jobs", "about us"]),
                max_title_len: Some(100),
                ..TextPolicy::default()
            },
            ..AnchorSpec::default()
        })
    }

    /// Built-in layouts keyed by lower-cased source name.
    pub fn builtins() -> Vec<(&'static str, StrategySpec)> {
        vec![
            (
                "airbnb",
                StrategySpec::Anchors(AnchorSpec {
                    policy: TextPolicy {
                        min_text_len: 5,
                        blocked_substrings: words(&["Reasonable Accommodation"]),
                        base_url: Some("https://careers.airbnb.com/".into()),
                        ..TextPolicy::default()
                    },
                    scope_selector: Some("main".into()),
                    nested_title_selector: None,
                }),
            ),
            (
                "openai",
                StrategySpec::Anchors(AnchorSpec {
                    policy: TextPolicy {
                        min_text_len: 5,
                        base_url: Some("https://openai.com/".into()),
                        ..TextPolicy::default()
                    },
                    scope_selector: None,
                    nested_title_selector: Some("h3, h4, span".into()),
                }),
            ),
            (
                "binance",
                StrategySpec::Cards(CardSpec {
                    policy: TextPolicy {
                        min_text_len: 5,
                        base_url: Some("https://www.binance.com".into()),
                        max_title_len: Some(100),
                        ..TextPolicy::default()
                    },
                    card_selector: "div, a".into(),
                    card_class_pattern: "job|card|item".into(),
                    title_selector: Some("h4, h5, div".into()),
                    title_class_pattern: Some("title".into()),
                    fallback_title_len: None,
                    link_mode: LinkMode::Anchor,
                }),
            ),
            (
                "bitget",
                StrategySpec::Cards(CardSpec {
                    policy: TextPolicy {
                        min_text_len: 5,
                        ..TextPolicy::default()
                    },
                    card_selector: "div".into(),
                    card_class_pattern: "job-item|item".into(),
                    title_selector: Some("div, span, h3".into()),
                    title_class_pattern: Some("title|name".into()),
                    fallback_title_len: Some(50),
                    link_mode: LinkMode::PageUrl,
                }),
            ),
            ("bybit", {
                let mut spec = StrategySpec::generic();
                if let StrategySpec::Anchors(anchors) = &mut spec {
                    anchors.policy.base_url = Some("https://jobs.bybitglobal.com/".into());
                }
                spec
            }),
        ]
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
