//! Storage abstractions for run outputs and cross-run state.
//!
//! ## Files
//!
//! ```text
//! output/
//! ├── campaigns.json           # Snapshot of the latest run
//! ├── state.json               # First/last-seen records (weekly mode)
//! ├── new_this_week.json       # Weekly report: newly discovered campaigns
//! └── expired_to_archive.json  # Weekly report: ids to archive
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Campaign, StateMap};

pub use local::LocalStorage;

/// Weekly report of newly discovered campaigns.
pub const NEW_ITEMS_FILE: &str = "new_this_week.json";
/// Weekly report of expired ids.
pub const EXPIRED_IDS_FILE: &str = "expired_to_archive.json";

/// Trait for campaign storage backends.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Overwrite the snapshot with the campaigns of this run.
    async fn write_snapshot(&self, items: &[Campaign]) -> Result<()>;

    /// Load persisted state. A missing file is an empty state.
    ///
    /// `now` fills timestamps missing from stored records.
    async fn load_state(&self, now: DateTime<Utc>) -> Result<StateMap>;

    /// Overwrite persisted state, stamped with `now`.
    async fn save_state(&self, state: &StateMap, now: DateTime<Utc>) -> Result<()>;

    /// Write a named report file next to the other outputs.
    async fn write_report(&self, file_name: &str, value: &serde_json::Value) -> Result<()>;
}
