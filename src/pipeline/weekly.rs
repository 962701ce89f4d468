//! Weekly incremental run: new campaigns and expired campaigns since the
//! last persisted state.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::SourceConfig;
use crate::pipeline::crawl::run_crawler;
use crate::pipeline::filter::DeadlineFilter;
use crate::pipeline::reconcile::{ReconcileOutcome, mark_archived, reconcile};
use crate::storage::{CampaignStore, EXPIRED_IDS_FILE, NEW_ITEMS_FILE};
use crate::sync::CampaignSink;
use crate::utils::http::Fetch;

/// Run the weekly flow.
///
/// Only campaigns with a future deadline are considered. Expired ids are
/// marked archived when the sink archived them or when there is no sink;
/// a failed archive call leaves them to be reported again next run.
pub async fn run_weekly(
    sources: &[SourceConfig],
    fetcher: &dyn Fetch,
    storage: &dyn CampaignStore,
    sink: Option<&dyn CampaignSink>,
    window_days: u32,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome> {
    let active = run_crawler(
        sources,
        fetcher,
        storage,
        &DeadlineFilter::active_only(),
        now.date_naive(),
    )
    .await?;

    let previous = storage.load_state(now).await?;
    let mut outcome = reconcile(&previous, &active, window_days, now);
    log::info!(
        "Weekly: {} new, {} expired, {} tracked",
        outcome.new_items.len(),
        outcome.expired_ids.len(),
        outcome.state.len()
    );
    if !outcome.has_changes() {
        storage.save_state(&outcome.state, now).await?;
        return Ok(outcome);
    }

    if !outcome.new_items.is_empty() {
        storage
            .write_report(NEW_ITEMS_FILE, &serde_json::to_value(&outcome.new_items)?)
            .await?;
    }
    if !outcome.expired_ids.is_empty() {
        storage
            .write_report(EXPIRED_IDS_FILE, &serde_json::to_value(&outcome.expired_ids)?)
            .await?;
    }

    let archive_ok = match sink {
        Some(sink) => {
            if !outcome.new_items.is_empty() {
                if let Err(e) = sink.upsert(&outcome.new_items).await {
                    log::error!("Upsert of new campaigns failed: {}", e);
                }
            }
            if outcome.expired_ids.is_empty() {
                true
            } else {
                match sink.archive(&outcome.expired_ids).await {
                    Ok(_) => true,
                    Err(e) => {
                        log::error!("Archive of expired campaigns failed: {}", e);
                        false
                    }
                }
            }
        }
        None => true,
    };

    if archive_ok {
        mark_archived(&mut outcome.state, &outcome.expired_ids);
    }
    storage.save_state(&outcome.state, now).await?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use crate::error::AppError;
    use crate::models::{Campaign, PathsConfig, SourceType};
    use crate::storage::LocalStorage;
    use crate::sync::UpsertSummary;

    struct StubFetcher(HashMap<String, String>);

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.0.get(url).cloned().ok_or_else(|| AppError::HttpStatus {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        upserted: Mutex<Vec<String>>,
        archived: Mutex<Vec<String>>,
        fail_archive: bool,
    }

    #[async_trait]
    impl CampaignSink for RecordingSink {
        async fn upsert(&self, items: &[Campaign]) -> Result<UpsertSummary> {
            let mut upserted = self.upserted.lock().unwrap();
            upserted.extend(items.iter().map(|c| c.external_id.clone()));
            Ok(UpsertSummary {
                created: items.len(),
                ..UpsertSummary::default()
            })
        }

        async fn archive(&self, external_ids: &[String]) -> Result<usize> {
            if self.fail_archive {
                return Err(AppError::sync("archive", "unavailable"));
            }
            self.archived.lock().unwrap().extend(external_ids.iter().cloned());
            Ok(external_ids.len())
        }
    }

    const API: &str = "https://bank.example/api";

    fn fetcher(body: &str) -> StubFetcher {
        StubFetcher(HashMap::from([(API.to_string(), body.to_string())]))
    }

    fn setup() -> (TempDir, LocalStorage, Vec<SourceConfig>) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(&PathsConfig {
            sources_file: dir.path().join("sources.json"),
            snapshot_file: dir.path().join("out/campaigns.json"),
            state_file: dir.path().join("out/state.json"),
            output_dir: dir.path().join("out"),
        });
        let mut source = SourceConfig::new(API, SourceType::Json);
        source.provider = "Example Bank".into();
        (dir, storage, vec![source])
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    const WEEK_ONE: &str = r#"{"items": [
        {"title": "口座開設キャンペーン", "url": "https://bank.example/c/1", "deadline": "2024-06-05"},
        {"title": "ポイント還元", "url": "https://bank.example/c/2", "deadline": "2024-07-01"},
        {"title": "新規入会特典", "url": "https://bank.example/c/3"}
    ]}"#;

    #[tokio::test]
    async fn test_weekly_without_sink() {
        let (dir, storage, sources) = setup();

        let first = run_weekly(&sources, &fetcher(WEEK_ONE), &storage, None, 7, at(2024, 6, 1))
            .await
            .unwrap();
        // undated campaigns are not tracked
        assert_eq!(first.new_items.len(), 2);
        assert!(first.expired_ids.is_empty());
        assert!(dir.path().join("out/new_this_week.json").exists());
        assert!(!dir.path().join("out/expired_to_archive.json").exists());

        // a week later the first campaign has expired and dropped off the page
        let second = run_weekly(&sources, &fetcher(WEEK_ONE), &storage, None, 7, at(2024, 6, 8))
            .await
            .unwrap();
        assert!(second.new_items.is_empty());
        assert_eq!(second.expired_ids.len(), 1);
        assert!(second.state[&second.expired_ids[0]].archived);
        assert!(dir.path().join("out/expired_to_archive.json").exists());

        let third = run_weekly(&sources, &fetcher(WEEK_ONE), &storage, None, 7, at(2024, 6, 9))
            .await
            .unwrap();
        assert!(third.expired_ids.is_empty());
    }

    #[tokio::test]
    async fn test_weekly_syncs_and_marks_archived() {
        let (_dir, storage, sources) = setup();
        let sink = RecordingSink::default();

        run_weekly(&sources, &fetcher(WEEK_ONE), &storage, Some(&sink), 7, at(2024, 6, 1))
            .await
            .unwrap();
        assert_eq!(sink.upserted.lock().unwrap().len(), 2);

        let second = run_weekly(&sources, &fetcher(WEEK_ONE), &storage, Some(&sink), 7, at(2024, 6, 8))
            .await
            .unwrap();
        assert_eq!(*sink.archived.lock().unwrap(), second.expired_ids);

        let state = storage.load_state(at(2024, 6, 8)).await.unwrap();
        assert!(state[&second.expired_ids[0]].archived);
    }

    #[tokio::test]
    async fn test_failed_archive_is_retried_next_run() {
        let (_dir, storage, sources) = setup();
        let sink = RecordingSink {
            fail_archive: true,
            ..RecordingSink::default()
        };

        run_weekly(&sources, &fetcher(WEEK_ONE), &storage, Some(&sink), 7, at(2024, 6, 1))
            .await
            .unwrap();
        let second = run_weekly(&sources, &fetcher(WEEK_ONE), &storage, Some(&sink), 7, at(2024, 6, 8))
            .await
            .unwrap();
        assert_eq!(second.expired_ids.len(), 1);
        assert!(!second.state[&second.expired_ids[0]].archived);

        let third = run_weekly(&sources, &fetcher(WEEK_ONE), &storage, Some(&sink), 7, at(2024, 6, 9))
            .await
            .unwrap();
        assert_eq!(third.expired_ids, second.expired_ids);
    }
}
