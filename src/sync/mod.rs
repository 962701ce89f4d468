//! Downstream sync of campaigns to a workspace database.

pub mod notion;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Campaign;

pub use notion::{ArchiveOptions, NotionSink};

/// Counts reported by [`CampaignSink::upsert`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
    /// Items without an external id
    pub skipped: usize,
}

/// Destination for campaign records keyed by external id.
#[async_trait]
pub trait CampaignSink: Send + Sync {
    /// Create or update one record per campaign.
    async fn upsert(&self, items: &[Campaign]) -> Result<UpsertSummary>;

    /// Mark the records with these ids expired. Returns how many were found.
    async fn archive(&self, external_ids: &[String]) -> Result<usize>;
}
