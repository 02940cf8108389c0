// src/services/extractors.rs

//! Per-source posting extraction.
//!
//! Every recruiting page lays out its listings differently. Each layout is
//! described by a [`StrategySpec`] and compiled once into an [`Extractor`];
//! the [`ExtractorRegistry`] picks the right one for a source and falls back
//! to a generic hyperlink scan for pages it knows nothing about.
//!
//! Extraction never fails. A missing nested element only affects the
//! candidate it belongs to, and a page without matches yields no postings.

use std::collections::{HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{
    AnchorSpec, CardSpec, Config, LinkMode, Posting, SourceConfig, StrategySpec, TextPolicy,
};
use crate::services::KeywordFilter;
use crate::utils::{element_text, resolve_url, truncate_graphemes};

/// Name under which the fallback strategy is registered.
pub const GENERIC: &str = "generic";

/// Inputs shared by every extraction call.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    /// Source name stamped on each posting
    pub source: &'a str,
    pub keywords: &'a KeywordFilter,
    /// Final URL of the fetched page
    pub page_url: &'a Url,
}

/// Turns a parsed page into postings, deduplicated by visible text.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Html, ctx: &ExtractContext<'_>) -> Vec<Posting>;
}

/// Compile a strategy into an extractor.
pub fn compile(spec: &StrategySpec) -> Result<Box<dyn Extractor>> {
    Ok(match spec {
        StrategySpec::Anchors(spec) => Box::new(AnchorExtractor::new(spec)?),
        StrategySpec::Cards(spec) => Box::new(CardExtractor::new(spec)?),
    })
}

/// Length, blocklist and link-base rules, compiled.
#[derive(Debug, Clone)]
struct TextGate {
    min_text_len: usize,
    blocked_exact: Vec<String>,
    blocked_substrings: Vec<String>,
    base_url: Option<Url>,
    max_title_len: Option<usize>,
}

impl TextGate {
    fn new(policy: &TextPolicy) -> Result<Self> {
        let fold = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let base_url = policy.base_url.as_deref().map(Url::parse).transpose()?;

        Ok(Self {
            min_text_len: policy.min_text_len,
            blocked_exact: fold(&policy.blocked_exact),
            blocked_substrings: fold(&policy.blocked_substrings),
            base_url,
            max_title_len: policy.max_title_len,
        })
    }

    /// Whether a candidate text passes the length and blocklist gates.
    fn admits(&self, text: &str) -> bool {
        if text.chars().count() < self.min_text_len {
            return false;
        }
        let folded = text.to_lowercase();
        if self.blocked_exact.iter().any(|b| *b == folded) {
            return false;
        }
        !self
            .blocked_substrings
            .iter()
            .any(|b| folded.contains(b.as_str()))
    }

    fn base<'a>(&'a self, page_url: &'a Url) -> &'a Url {
        self.base_url.as_ref().unwrap_or(page_url)
    }

    fn title(&self, text: &str) -> String {
        match self.max_title_len {
            Some(max) => truncate_graphemes(text, max),
            None => text.to_string(),
        }
    }
}

/// Extractor for pages that list postings as hyperlinks.
pub struct AnchorExtractor {
    gate: TextGate,
    anchors: Selector,
    scope: Option<Selector>,
    nested_title: Option<Selector>,
}

impl AnchorExtractor {
    pub fn new(spec: &AnchorSpec) -> Result<Self> {
        Ok(Self {
            gate: TextGate::new(&spec.policy)?,
            anchors: parse_selector("a[href]")?,
            scope: spec.scope_selector.as_deref().map(parse_selector).transpose()?,
            nested_title: spec
                .nested_title_selector
                .as_deref()
                .map(parse_selector)
                .transpose()?,
        })
    }

    /// Nested texts in document order, skipping empty ones.
    fn nested_texts(&self, anchor: &ElementRef<'_>) -> Vec<String> {
        match &self.nested_title {
            Some(sel) => anchor
                .select(sel)
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Filtering text and emitted title for an anchor.
    ///
    /// Filtering always sees the anchor's whole text, or the first nested
    /// text when the anchor has none. The title narrows to the first nested
    /// element that carries a keyword, so badges and locations stay out of it.
    fn anchor_text(&self, anchor: &ElementRef<'_>, keywords: &KeywordFilter) -> (String, String) {
        let nested = self.nested_texts(anchor);
        let text = element_text(anchor);
        let text = if text.is_empty() {
            nested.first().cloned().unwrap_or_default()
        } else {
            text
        };
        let title = nested
            .into_iter()
            .find(|t| keywords.matches(t))
            .unwrap_or_else(|| text.clone());
        (text, title)
    }
}

impl Extractor for AnchorExtractor {
    fn extract(&self, document: &Html, ctx: &ExtractContext<'_>) -> Vec<Posting> {
        let scope = self
            .scope
            .as_ref()
            .and_then(|sel| document.select(sel).next());
        let anchors: Vec<ElementRef<'_>> = match scope {
            Some(root) => root.select(&self.anchors).collect(),
            None => document.select(&self.anchors).collect(),
        };

        let base = self.gate.base(ctx.page_url);
        let mut seen = HashSet::new();
        let mut postings = Vec::new();

        for anchor in anchors {
            let (text, title) = self.anchor_text(&anchor, ctx.keywords);
            if !self.gate.admits(&text) || !ctx.keywords.matches(&text) {
                continue;
            }

            let href = anchor.value().attr("href").unwrap_or("");
            let link = resolve_url(base, href);
            let title = self.gate.title(&title);

            if seen.insert(text) {
                postings.push(Posting::new(ctx.source, title, link));
            }
        }
        postings
    }
}

/// Extractor for pages that list postings as container elements.
pub struct CardExtractor {
    gate: TextGate,
    cards: Selector,
    card_class: Regex,
    title: Option<Selector>,
    title_class: Option<Regex>,
    anchor: Selector,
    fallback_title_len: Option<usize>,
    link_mode: LinkMode,
}

impl CardExtractor {
    pub fn new(spec: &CardSpec) -> Result<Self> {
        Ok(Self {
            gate: TextGate::new(&spec.policy)?,
            cards: parse_selector(&spec.card_selector)?,
            card_class: parse_class_pattern(&spec.card_class_pattern)?,
            title: spec.title_selector.as_deref().map(parse_selector).transpose()?,
            title_class: spec
                .title_class_pattern
                .as_deref()
                .map(parse_class_pattern)
                .transpose()?,
            anchor: parse_selector("a[href]")?,
            fallback_title_len: spec.fallback_title_len,
            link_mode: spec.link_mode,
        })
    }

    fn nested_title(&self, card: &ElementRef<'_>) -> Option<String> {
        let sel = self.title.as_ref()?;
        card.select(sel)
            .filter(|el| match &self.title_class {
                Some(re) => el.value().attr("class").is_some_and(|c| re.is_match(c)),
                None => true,
            })
            .map(|el| element_text(&el))
            .find(|t| !t.is_empty())
    }

    fn link(&self, card: &ElementRef<'_>, base: &Url, page_url: &Url) -> String {
        match self.link_mode {
            LinkMode::PageUrl => page_url.to_string(),
            LinkMode::Anchor => {
                let href = if card.value().name() == "a" {
                    card.value().attr("href")
                } else {
                    card.select(&self.anchor)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                };
                resolve_url(base, href.unwrap_or(""))
            }
        }
    }
}

impl Extractor for CardExtractor {
    fn extract(&self, document: &Html, ctx: &ExtractContext<'_>) -> Vec<Posting> {
        let base = self.gate.base(ctx.page_url);
        let mut seen = HashSet::new();
        let mut postings = Vec::new();

        for card in document.select(&self.cards) {
            let class = card.value().attr("class").unwrap_or("");
            if !self.card_class.is_match(class) {
                continue;
            }

            let text = element_text(&card);
            if !self.gate.admits(&text) || !ctx.keywords.matches(&text) {
                continue;
            }

            let title = self.nested_title(&card).unwrap_or_else(|| match self.fallback_title_len {
                Some(len) => truncate_graphemes(&text, len),
                None => text.clone(),
            });
            if title.is_empty() || !seen.insert(title.clone()) {
                continue;
            }

            let link = self.link(&card, base, ctx.page_url);
            postings.push(Posting::new(ctx.source, self.gate.title(&title), link));
        }
        postings
    }
}

/// Named extraction strategies plus the generic fallback.
pub struct ExtractorRegistry {
    variants: HashMap<String, Box<dyn Extractor>>,
    inline: HashMap<String, Box<dyn Extractor>>,
    fallback: Box<dyn Extractor>,
}

impl ExtractorRegistry {
    /// Registry holding only the generic fallback.
    pub fn empty() -> Result<Self> {
        Ok(Self {
            variants: HashMap::new(),
            inline: HashMap::new(),
            fallback: compile(&StrategySpec::generic())?,
        })
    }

    /// Registry with the built-in layouts.
    pub fn with_builtins() -> Result<Self> {
        let mut registry = Self::empty()?;
        registry.register(GENERIC, &StrategySpec::generic())?;
        for (name, spec) in StrategySpec::builtins() {
            registry.register(name, &spec)?;
        }
        Ok(registry)
    }

    /// Registry with the built-in layouts and every source's inline strategy.
    ///
    /// Fails if a strategy does not compile or a source names an unknown one.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::with_builtins()?;
        for source in &config.sources {
            if let Some(spec) = &source.strategy {
                let extractor = compile(spec).map_err(|e| {
                    AppError::config(format!("Strategy for source {}: {e}", source.name))
                })?;
                registry.inline.insert(source.name.clone(), extractor);
            } else if let Some(name) = &source.extractor {
                if !registry.variants.contains_key(&name.to_lowercase()) {
                    return Err(AppError::config(format!(
                        "Source {} names unknown extractor '{}'",
                        source.name, name
                    )));
                }
            }
        }
        Ok(registry)
    }

    /// Register (or replace) a named strategy.
    pub fn register(&mut self, name: &str, spec: &StrategySpec) -> Result<()> {
        self.variants.insert(name.to_lowercase(), compile(spec)?);
        Ok(())
    }

    /// Extractor for a source: inline strategy, named strategy, strategy
    /// registered under the source's name, then the fallback.
    pub fn resolve(&self, source: &SourceConfig) -> &dyn Extractor {
        if let Some(extractor) = self.inline.get(&source.name) {
            return &**extractor;
        }
        let key = source
            .extractor
            .as_deref()
            .unwrap_or(&source.name)
            .to_lowercase();
        self.variants
            .get(&key)
            .map(|extractor| &**extractor)
            .unwrap_or(&*self.fallback)
    }

    /// Parse a page and extract the postings for a source.
    pub fn extract(
        &self,
        source: &SourceConfig,
        markup: &str,
        keywords: &KeywordFilter,
        page_url: &Url,
    ) -> Vec<Posting> {
        let document = Html::parse_document(markup);
        let ctx = ExtractContext {
            source: &source.name,
            keywords,
            page_url,
        };
        let postings = self.resolve(source).extract(&document, &ctx);
        log::debug!("{}: extracted {} candidate postings", source.name, postings.len());
        postings
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_class_pattern(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}
