//! Service layer for the job watcher.
//!
//! This module contains the business logic for:
//! - Keyword matching (`KeywordFilter`)
//! - Per-source posting extraction (`ExtractorRegistry`)
//! - Page fetching (`PageFetcher`, `HttpFetcher`)
//! - Notification delivery (`Dispatcher`, `TelegramChannel`)

pub mod extractors;
mod fetch;
mod keywords;
mod notifier;

pub use extractors::{ExtractContext, Extractor, ExtractorRegistry};
pub use fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use keywords::{KeywordFilter, matches};
pub use notifier::{DispatchReport, Dispatcher, NotifyChannel, RenderMode, TelegramChannel};
