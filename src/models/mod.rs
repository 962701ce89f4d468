// src/models/mod.rs

//! Domain models for the campaign crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod campaign;
mod config;
mod source;
mod state;

// Re-export all public types
pub use campaign::{Campaign, CampaignStatus, RawCandidate, RewardType};
pub use config::{Config, CrawlerConfig, PathsConfig, WeeklyConfig};
pub use source::{
    DEFAULT_EXCLUDE_KEYWORDS, DEFAULT_INCLUDE_KEYWORDS, MarkupSelectors, SourceConfig, SourceType,
};
pub(crate) use state::StoredStateEntity;
pub use state::{StateEntity, StateFile, StateMap, timestamp};
