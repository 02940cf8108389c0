// src/models/mod.rs

//! Domain models for the job watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod posting;
mod state;
mod strategy;

// Re-export all public types
pub use config::{Config, FetchConfig, SourceConfig, TelegramConfig, WatcherConfig};
pub use posting::{NewJob, Posting};
pub use state::{DedupState, Fingerprint};
pub use strategy::{AnchorSpec, CardSpec, LinkMode, StrategySpec, TextPolicy};
