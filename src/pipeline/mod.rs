//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Fetch, extract, deduplicate and filter campaigns
//! - `run_weekly`: Crawl, then reconcile against persisted state

pub mod crawl;
pub mod filter;
pub mod reconcile;
pub mod weekly;

pub use crawl::{collect, dedup, run_crawler};
pub use filter::{DeadlineFilter, filter_by_deadline};
pub use reconcile::{ReconcileOutcome, mark_archived, reconcile};
pub use weekly::run_weekly;
