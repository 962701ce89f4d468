//! Local filesystem storage implementation.
//!
//! Every file is written atomically (temp file, then rename) as
//! pretty-printed UTF-8 JSON, creating parent directories as needed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Campaign, PathsConfig, StateFile, StateMap, StoredStateEntity};
use crate::storage::CampaignStore;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    snapshot_file: PathBuf,
    state_file: PathBuf,
    output_dir: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage writing to the configured locations.
    pub fn new(paths: &PathsConfig) -> Self {
        Self {
            snapshot_file: paths.snapshot_file.clone(),
            state_file: paths.state_file.clone(),
            output_dir: paths.output_dir.clone(),
        }
    }

    pub fn snapshot_file(&self) -> &Path {
        &self.snapshot_file
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        Self::write_bytes(path, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl CampaignStore for LocalStorage {
    async fn write_snapshot(&self, items: &[Campaign]) -> Result<()> {
        Self::write_json(&self.snapshot_file, items).await?;
        log::info!(
            "Wrote {} campaigns to {}",
            items.len(),
            self.snapshot_file.display()
        );
        Ok(())
    }

    async fn load_state(&self, now: DateTime<Utc>) -> Result<StateMap> {
        let Some(bytes) = Self::read_bytes(&self.state_file).await? else {
            log::info!("No state file at {}", self.state_file.display());
            return Ok(StateMap::new());
        };
        let state = parse_state(&bytes, now)?;
        log::debug!(
            "Loaded {} state entries from {}",
            state.len(),
            self.state_file.display()
        );
        Ok(state)
    }

    async fn save_state(&self, state: &StateMap, now: DateTime<Utc>) -> Result<()> {
        let file = StateFile {
            updated_at: now,
            items: state,
        };
        Self::write_json(&self.state_file, &file).await?;
        log::info!(
            "Saved {} state entries to {}",
            state.len(),
            self.state_file.display()
        );
        Ok(())
    }

    async fn write_report(&self, file_name: &str, value: &Value) -> Result<()> {
        let path = self.output_dir.join(file_name);
        Self::write_json(&path, value).await?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}

/// Parse a state file, accepting both the `{updated_at, items}` envelope and
/// the older shape where the top-level object is the item map.
fn parse_state(bytes: &[u8], now: DateTime<Utc>) -> Result<StateMap> {
    let raw: Value = serde_json::from_slice(bytes)?;
    let items = match raw {
        Value::Object(mut map) if map.contains_key("items") => {
            map.remove("items").unwrap_or_default()
        }
        other => other,
    };
    let Value::Object(items) = items else {
        return Err(AppError::validation("state items must be a JSON object"));
    };

    let mut state = StateMap::new();
    for (id, record) in items {
        if !record.is_object() {
            log::warn!("Skipping malformed state record {}", id);
            continue;
        }
        let stored: StoredStateEntity = serde_json::from_value(record)?;
        state.insert(id.clone(), stored.into_entity(id, now));
    }
    Ok(state)
}
