// src/pipeline/check.rs

//! One check cycle over every configured source.
//!
//! Load state, then per source: fetch, extract, diff. Accumulated new jobs
//! are dispatched, and the state is saved exactly once at the end. Sources
//! are processed strictly one after another and a failing source is only
//! recorded in the summary. Callers must not run two cycles against the same
//! store at once.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Config, NewJob, SourceConfig};
use crate::pipeline::diff::diff;
use crate::services::{DispatchReport, Dispatcher, ExtractorRegistry, KeywordFilter, PageFetcher};
use crate::storage::{LoadStatus, StateStore};

/// Cycle behaviour switches.
#[derive(Debug, Clone, Copy)]
pub struct CycleOptions {
    /// Dispatch even when the cycle started without persisted state
    pub notify_on_first_run: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            notify_on_first_run: true,
        }
    }
}

/// A source with its keyword filter resolved.
#[derive(Debug, Clone)]
pub struct SourcePlan {
    pub source: SourceConfig,
    pub keywords: KeywordFilter,
}

impl SourcePlan {
    /// Resolve every configured source against the default keywords.
    pub fn from_config(config: &Config) -> Vec<SourcePlan> {
        config
            .sources
            .iter()
            .map(|source| SourcePlan {
                keywords: KeywordFilter::new(config.keywords_for(source)),
                source: source.clone(),
            })
            .collect()
    }
}

/// Per-source counts.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub found: usize,
    pub new: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened during a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceSummary>,
    pub new_jobs: Vec<NewJob>,
    /// `None` when dispatch was skipped for a first run
    #[serde(skip)]
    pub dispatch: Option<DispatchReport>,
    pub saved: bool,
}

impl CycleSummary {
    pub fn total_found(&self) -> usize {
        self.sources.iter().map(|s| s.found).sum()
    }

    pub fn total_new(&self) -> usize {
        self.new_jobs.len()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Run one check cycle.
///
/// Only an empty source list is an error; every other failure is logged and
/// recorded in the returned summary.
pub async fn run_check_cycle(
    plans: &[SourcePlan],
    registry: &ExtractorRegistry,
    fetcher: &dyn PageFetcher,
    dispatcher: &Dispatcher,
    store: &dyn StateStore,
    options: CycleOptions,
) -> Result<CycleSummary> {
    if plans.is_empty() {
        return Err(AppError::config("No sources configured"));
    }

    let started_at = Utc::now();
    let loaded = store.load_with_status().await;
    let first_run = loaded.status == LoadStatus::Missing;
    let mut state = loaded.state;

    let mut sources = Vec::with_capacity(plans.len());
    let mut new_jobs = Vec::new();

    for plan in plans {
        let name = &plan.source.name;
        let page = match fetcher.fetch(&plan.source).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("{name}: check failed - {e}");
                sources.push(SourceSummary {
                    source: name.clone(),
                    found: 0,
                    new: 0,
                    error: Some(e.to_string()),
                });
                continue;
            }
        };

        let candidates = registry.extract(&plan.source, &page.html, &plan.keywords, &page.base_url);
        let result = diff(name, &candidates, &mut state);
        log::info!(
            "{name}: found {} matching postings, {} new",
            candidates.len(),
            result.new_jobs.len()
        );

        sources.push(SourceSummary {
            source: name.clone(),
            found: candidates.len(),
            new: result.new_jobs.len(),
            error: None,
        });
        new_jobs.extend(result.new_jobs);
    }

    let dispatch = if new_jobs.is_empty() {
        log::info!("No new postings found");
        Some(DispatchReport {
            configured: dispatcher.is_configured(),
            ..DispatchReport::default()
        })
    } else if first_run && !options.notify_on_first_run {
        log::info!(
            "First run: recorded {} postings as baseline without notifying",
            new_jobs.len()
        );
        None
    } else {
        log::info!("Sending {} notification(s)", new_jobs.len());
        Some(dispatcher.dispatch(&new_jobs).await)
    };

    let saved = match store.save(&state).await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to save state: {e}. New postings may be notified again");
            false
        }
    };

    Ok(CycleSummary {
        started_at,
        finished_at: Utc::now(),
        sources,
        new_jobs,
        dispatch,
        saved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use url::Url;

    use crate::models::DedupState;
    use crate::services::{FetchedPage, NotifyChannel, RenderMode};
    use crate::storage::{LoadedState, LocalStorage};

    /// Fetcher double serving canned pages; unknown sources fail.
    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    impl StaticFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(name, html)| (name.to_string(), html.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, source: &SourceConfig) -> Result<FetchedPage> {
            let html = self
                .pages
                .get(&source.name)
                .cloned()
                .ok_or_else(|| AppError::fetch(&source.name, "timeout"))?;
            Ok(FetchedPage {
                html,
                base_url: Url::parse(&source.url)?,
            })
        }
    }

    #[derive(Default)]
    struct CountingChannel {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotifyChannel for CountingChannel {
        async fn send(&self, _destination: &str, text: &str, _mode: RenderMode) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    /// In-memory store double; saves fail when `read_only` is set.
    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<Option<DedupState>>,
        read_only: bool,
    }

    #[async_trait]
    impl StateStore for MemoryStore {
        async fn load_with_status(&self) -> LoadedState {
            match self.state.lock().unwrap().clone() {
                Some(state) => LoadedState {
                    state,
                    status: LoadStatus::Loaded,
                },
                None => LoadedState {
                    state: DedupState::new(),
                    status: LoadStatus::Missing,
                },
            }
        }

        async fn save(&self, state: &DedupState) -> Result<()> {
            if self.read_only {
                return Err(AppError::Io(std::io::Error::other("read-only")));
            }
            *self.state.lock().unwrap() = Some(state.clone());
            Ok(())
        }
    }

    const ACME_PAGE: &str = r#"
        <a href="/jobs/1">Senior Product Designer</a>
        <a href="/jobs/2">UX Researcher</a>
        <a href="/jobs/3">Backend Engineer</a>
    "#;

    fn plans(names: &[&str]) -> Vec<SourcePlan> {
        names
            .iter()
            .map(|name| SourcePlan {
                source: SourceConfig::new(*name, format!("https://{}.test/careers/", name.to_lowercase())),
                keywords: KeywordFilter::new(["design", "ux"]),
            })
            .collect()
    }

    fn dispatcher(channel: Arc<CountingChannel>) -> Dispatcher {
        Dispatcher::new(channel, "chat", "{company}: {title}", Duration::ZERO)
    }

    #[tokio::test]
    async fn test_first_cycle_then_quiet_cycle() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let registry = ExtractorRegistry::with_builtins().unwrap();
        let fetcher = StaticFetcher::new(&[("Acme", ACME_PAGE)]);
        let channel = Arc::new(CountingChannel::default());
        let dispatcher = dispatcher(channel.clone());
        let plans = plans(&["Acme"]);

        let first = run_check_cycle(&plans, &registry, &fetcher, &dispatcher, &store, CycleOptions::default())
            .await
            .unwrap();
        assert_eq!(first.total_found(), 2);
        assert_eq!(first.total_new(), 2);
        assert!(first.saved);
        assert_eq!(first.dispatch.map(|d| d.delivered), Some(2));
        assert_eq!(store.load().await.seen_count("Acme"), 2);

        let second = run_check_cycle(&plans, &registry, &fetcher, &dispatcher, &store, CycleOptions::default())
            .await
            .unwrap();
        assert_eq!(second.total_found(), 2);
        assert_eq!(second.total_new(), 0);
        assert_eq!(channel.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_only_new_posting_is_notified() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let registry = ExtractorRegistry::with_builtins().unwrap();
        let channel = Arc::new(CountingChannel::default());
        let dispatcher = dispatcher(channel.clone());
        let plans = plans(&["Acme"]);

        let before = StaticFetcher::new(&[("Acme", r#"<a href="/jobs/1">Product Designer</a>"#)]);
        run_check_cycle(&plans, &registry, &before, &dispatcher, &store, CycleOptions::default())
            .await
            .unwrap();

        let after = StaticFetcher::new(&[(
            "Acme",
            r#"<a href="/jobs/1">Product Designer</a><a href="/jobs/7">Brand Designer</a>"#,
        )]);
        let summary = run_check_cycle(&plans, &registry, &after, &dispatcher, &store, CycleOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.total_new(), 1);
        assert_eq!(summary.new_jobs[0].title, "Brand Designer");
        assert_eq!(summary.new_jobs[0].link, "https://acme.test/jobs/7");
        assert_eq!(
            channel.sent.lock().unwrap().last().map(String::as_str),
            Some("Acme: Brand Designer")
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_abort_other_sources() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let registry = ExtractorRegistry::with_builtins().unwrap();
        let fetcher = StaticFetcher::new(&[("Acme", ACME_PAGE)]);
        let dispatcher = dispatcher(Arc::new(CountingChannel::default()));

        let summary = run_check_cycle(
            &plans(&["Broken", "Acme"]),
            &registry,
            &fetcher,
            &dispatcher,
            &store,
            CycleOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(summary.failed_sources(), 1);
        assert!(summary.sources[0].error.is_some());
        assert_eq!(summary.sources[1].new, 2);
        assert!(summary.saved);
    }

    #[tokio::test]
    async fn test_new_jobs_follow_source_order() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let registry = ExtractorRegistry::with_builtins().unwrap();
        let fetcher = StaticFetcher::new(&[
            ("Zeta", r#"<a href="/z">Zeta Designer</a>"#),
            ("Acme", r#"<a href="/a">Acme Designer</a>"#),
        ]);
        let dispatcher = Dispatcher::unconfigured();

        let summary = run_check_cycle(
            &plans(&["Zeta", "Acme"]),
            &registry,
            &fetcher,
            &dispatcher,
            &store,
            CycleOptions::default(),
        )
        .await
        .unwrap();

        let companies: Vec<&str> = summary.new_jobs.iter().map(|j| j.company.as_str()).collect();
        assert_eq!(companies, vec!["Zeta", "Acme"]);
        assert_eq!(summary.dispatch.map(|d| d.succeeded()), Some(false));
        assert!(summary.saved);
    }

    #[tokio::test]
    async fn test_quiet_first_run_records_baseline() {
        let store = MemoryStore::default();
        let registry = ExtractorRegistry::with_builtins().unwrap();
        let fetcher = StaticFetcher::new(&[("Acme", ACME_PAGE)]);
        let channel = Arc::new(CountingChannel::default());
        let dispatcher = dispatcher(channel.clone());
        let options = CycleOptions {
            notify_on_first_run: false,
        };

        let summary = run_check_cycle(&plans(&["Acme"]), &registry, &fetcher, &dispatcher, &store, options)
            .await
            .unwrap();

        assert_eq!(summary.total_new(), 2);
        assert!(summary.dispatch.is_none());
        assert!(channel.sent.lock().unwrap().is_empty());
        assert_eq!(store.load().await.seen_count("Acme"), 2);
    }

    #[tokio::test]
    async fn test_save_failure_is_not_fatal() {
        let store = MemoryStore {
            read_only: true,
            ..MemoryStore::default()
        };
        let registry = ExtractorRegistry::with_builtins().unwrap();
        let fetcher = StaticFetcher::new(&[("Acme", ACME_PAGE)]);
        let channel = Arc::new(CountingChannel::default());
        let dispatcher = dispatcher(channel.clone());

        let summary = run_check_cycle(
            &plans(&["Acme"]),
            &registry,
            &fetcher,
            &dispatcher,
            &store,
            CycleOptions::default(),
        )
        .await
        .unwrap();

        assert!(!summary.saved);
        assert_eq!(channel.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_sources_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let registry = ExtractorRegistry::with_builtins().unwrap();
        let fetcher = StaticFetcher::new(&[]);

        let result = run_check_cycle(
            &[],
            &registry,
            &fetcher,
            &Dispatcher::unconfigured(),
            &store,
            CycleOptions::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::Config(_))));
        assert!(!store.state_path().exists());
    }

    #[test]
    fn test_plans_resolve_keywords() {
        let mut config = Config::default();
        config.sources = vec![
            SourceConfig::new("Own", "https://own.test").with_keywords(["Brand"]),
            SourceConfig::new("Shared", "https://shared.test"),
        ];
        let plans = SourcePlan::from_config(&config);
        assert_eq!(plans[0].keywords.keywords(), ["brand".to_string()]);
        assert!(plans[1].keywords.matches("Product Designer"));
    }
}
