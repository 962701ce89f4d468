// src/pipeline/crawl.rs

//! Campaign crawling pipeline.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};

use crate::error::Result;
use crate::models::{Campaign, SourceConfig, SourceType};
use crate::pipeline::filter::{DeadlineFilter, filter_by_deadline};
use crate::services;
use crate::storage::CampaignStore;
use crate::utils::http::Fetch;

/// Run the crawler: collect, deduplicate, filter, and write the snapshot.
///
/// Returns the campaigns that were written.
pub async fn run_crawler(
    sources: &[SourceConfig],
    fetcher: &dyn Fetch,
    storage: &dyn CampaignStore,
    filter: &DeadlineFilter,
    today: NaiveDate,
) -> Result<Vec<Campaign>> {
    let start_time = Utc::now();
    log::info!("Crawling {} sources", sources.len());

    let collected = collect(sources, fetcher).await;
    let collected_count = collected.len();
    let unique = dedup(collected);
    let unique_count = unique.len();
    let items = filter_by_deadline(unique, filter, today);

    storage.write_snapshot(&items).await?;

    log::info!(
        "Crawl finished in {}s: {} collected, {} unique, {} kept",
        (Utc::now() - start_time).num_seconds(),
        collected_count,
        unique_count,
        items.len()
    );
    Ok(items)
}

/// Fetch and extract every enabled source in order.
///
/// Fetch or parse failures are logged and the source skipped.
pub async fn collect(sources: &[SourceConfig], fetcher: &dyn Fetch) -> Vec<Campaign> {
    let mut campaigns = Vec::new();

    for source in sources {
        if source.disabled {
            log::debug!("Skipping disabled source {}", source.url);
            continue;
        }
        if source.url.trim().is_empty() {
            log::warn!("Skipping source without url (provider '{}')", source.provider);
            continue;
        }
        if source.source_type == SourceType::Unknown {
            log::warn!("Skipping {}: unknown source_type", source.url);
            continue;
        }
        let source = source.clone().with_default_keywords();

        let body = match fetcher.fetch(&source.url).await {
            Ok(body) => body,
            Err(e) if e.is_policy_blocked() => {
                log::info!("Skipping {}: {}", source.url, e);
                continue;
            }
            Err(e) => {
                log::warn!("Fetch failed {}: {}", source.url, e);
                continue;
            }
        };

        let candidates = match services::extract(&source, &body) {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("Parse failed {}: {}", source.url, e);
                continue;
            }
        };

        let before = campaigns.len();
        campaigns.extend(
            candidates
                .into_iter()
                .filter_map(|c| Campaign::from_candidate(c, &source.provider, &source.category)),
        );
        log::info!(
            "{} [{}]: {} campaigns",
            source.url,
            source.source_type.as_str(),
            campaigns.len() - before
        );
    }

    campaigns
}

/// Keep one campaign per external id.
///
/// A later duplicate replaces the earlier one but keeps its position.
pub fn dedup(items: Vec<Campaign>) -> Vec<Campaign> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Campaign> = Vec::with_capacity(items.len());

    for item in items {
        match index.get(&item.external_id) {
            Some(&pos) => unique[pos] = item,
            None => {
                index.insert(item.external_id.clone(), unique.len());
                unique.push(item);
            }
        }
    }
    unique
}
