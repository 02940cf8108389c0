//! Pipeline entry points for watcher operations.
//!
//! - `run_check_cycle`: Fetch every source, diff, notify and persist
//! - `run_validate`: Check configuration and extraction strategies
//! - `run_every`: Repeat cycles on an interval until shutdown

pub mod check;
pub mod diff;
pub mod fingerprint;
pub mod validate;
pub mod watch;

pub use check::{CycleOptions, CycleSummary, SourcePlan, SourceSummary, run_check_cycle};
pub use diff::{DiffResult, diff};
pub use fingerprint::fingerprint;
pub use validate::run_validate;
pub use watch::run_every;
