//! Storage abstractions for the dedup state.
//!
//! The whole state is one JSON document mapping each source to the
//! fingerprints already notified:
//!
//! ```text
//! {
//!   "Airbnb": ["3f1c...", "9a0b..."],
//!   "Bitget": ["c44e..."]
//! }
//! ```
//!
//! It is loaded once per cycle and rewritten in full once per cycle.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DedupState;

// Re-export for convenience
pub use local::LocalStorage;

/// What `load` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// State read successfully
    Loaded,
    /// No state persisted yet
    Missing,
    /// State existed but could not be read or parsed
    Corrupt,
}

/// Loaded state plus how it was obtained.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: DedupState,
    pub status: LoadStatus,
}

/// Trait for dedup state backends.
///
/// Loading never fails: a missing or unreadable state yields an empty one.
/// Saving reports errors and leaves it to the caller to carry on.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load_with_status(&self) -> LoadedState;

    async fn load(&self) -> DedupState {
        self.load_with_status().await.state
    }

    async fn save(&self, state: &DedupState) -> Result<()>;
}
