//! Notion database sink.
//!
//! Pages are matched on the `External ID` rich-text property. Requests use
//! bearer auth and a pinned API version.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{Campaign, CampaignStatus};
use crate::sync::{CampaignSink, UpsertSummary};

const BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

const TOKEN_ENV: &str = "NOTION_TOKEN";
const DATABASE_ENV: &str = "NOTION_DATABASE_ID";

/// What [`NotionSink::archive`] does to a matched page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Set `Status` to `Expired`
    pub set_status: bool,
    /// Move the page to the trash
    pub archive_page: bool,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            set_status: true,
            archive_page: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    id: String,
}

pub struct NotionSink {
    client: reqwest::Client,
    token: String,
    database_id: String,
    base_url: String,
    archive_options: ArchiveOptions,
}

impl NotionSink {
    pub fn new(token: impl Into<String>, database_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            database_id: database_id.into(),
            base_url: BASE_URL.to_string(),
            archive_options: ArchiveOptions::default(),
        }
    }

    /// Build a sink from `NOTION_TOKEN` and `NOTION_DATABASE_ID`.
    ///
    /// Returns `None` when either is unset or empty.
    pub fn from_env() -> Option<Self> {
        Self::from_values(std::env::var(TOKEN_ENV).ok(), std::env::var(DATABASE_ENV).ok())
    }

    fn from_values(token: Option<String>, database_id: Option<String>) -> Option<Self> {
        let token = token.filter(|t| !t.trim().is_empty())?;
        let database_id = database_id.filter(|d| !d.trim().is_empty())?;
        Some(Self::new(token, database_id))
    }

    pub fn with_archive_options(mut self, options: ArchiveOptions) -> Self {
        self.archive_options = options;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Declare every property the sink writes. Safe to repeat.
    pub async fn ensure_schema(&self) -> Result<()> {
        let url = format!("{}/databases/{}", self.base_url, self.database_id);
        self.send("ensure_schema", self.client.patch(&url), &schema_properties())
            .await?;
        log::info!("Notion database {} schema ensured", self.database_id);
        Ok(())
    }

    /// Find the page whose `External ID` equals `external_id`.
    async fn find_page(&self, external_id: &str) -> Result<Option<String>> {
        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        let body = json!({
            "filter": {
                "property": "External ID",
                "rich_text": { "equals": external_id },
            },
            "page_size": 1,
        });
        let value = self.send("query", self.client.post(&url), &body).await?;
        let response: QueryResponse = serde_json::from_value(value)?;
        Ok(response.results.into_iter().next().map(|p| p.id))
    }

    async fn update_page(&self, page_id: &str, body: &Value) -> Result<()> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        self.send("update_page", self.client.patch(&url), body).await?;
        Ok(())
    }

    async fn create_page(&self, properties: Value) -> Result<()> {
        let url = format!("{}/pages", self.base_url);
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": properties,
        });
        self.send("create_page", self.client.post(&url), &body).await?;
        Ok(())
    }

    /// Send a JSON request and return the JSON response.
    async fn send(
        &self,
        context: &str,
        request: reqwest::RequestBuilder,
        body: &Value,
    ) -> Result<Value> {
        let resp = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let url = resp.url().to_string();
            let message = resp.text().await.unwrap_or_default();
            log::warn!("Notion {} failed ({}): {}", context, status, message);
            return Err(AppError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl CampaignSink for NotionSink {
    async fn upsert(&self, items: &[Campaign]) -> Result<UpsertSummary> {
        let now = Utc::now();
        let mut summary = UpsertSummary::default();

        for item in items {
            if item.external_id.is_empty() {
                summary.skipped += 1;
                continue;
            }
            let properties = page_properties(item, now);
            match self.find_page(&item.external_id).await? {
                Some(page_id) => {
                    self.update_page(&page_id, &json!({ "properties": properties }))
                        .await?;
                    summary.updated += 1;
                }
                None => {
                    self.create_page(properties).await?;
                    summary.created += 1;
                }
            }
        }

        log::info!(
            "Notion upsert: {} created, {} updated, {} skipped",
            summary.created,
            summary.updated,
            summary.skipped
        );
        Ok(summary)
    }

    async fn archive(&self, external_ids: &[String]) -> Result<usize> {
        let Some(body) = archive_body(&self.archive_options) else {
            return Ok(0);
        };

        let mut archived = 0;
        for id in external_ids {
            let Some(page_id) = self.find_page(id).await? else {
                log::debug!("No Notion page for {}", id);
                continue;
            };
            self.update_page(&page_id, &body).await?;
            archived += 1;
        }

        log::info!("Notion archive: {} of {} pages", archived, external_ids.len());
        Ok(archived)
    }
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

/// Page properties for one campaign, checked at `now`.
fn page_properties(item: &Campaign, now: DateTime<Utc>) -> Value {
    let status = CampaignStatus::from_deadline(item.deadline.as_deref(), now.date_naive());
    let deadline = match item.deadline.as_deref().filter(|d| !d.is_empty()) {
        Some(d) => json!({ "date": { "start": d } }),
        None => json!({ "date": null }),
    };
    let reward_type = match item.reward_type {
        Some(kind) => json!({ "select": { "name": kind.as_str() } }),
        None => json!({ "select": null }),
    };

    json!({
        "Name": { "title": [{ "text": { "content": item.name } }] },
        "Provider": rich_text(&item.provider),
        "Category": rich_text(&item.category),
        "Reward Type": reward_type,
        "Reward Value": rich_text(item.reward_value.as_deref().unwrap_or("")),
        "Deadline": deadline,
        "Source URL": { "url": item.source_url },
        "External ID": rich_text(&item.external_id),
        "LastChecked": { "date": { "start": now.to_rfc3339_opts(SecondsFormat::Secs, true) } },
        "Status": { "select": { "name": status.label() } },
    })
}

/// Update body for an archived page, or `None` when there is nothing to do.
fn archive_body(options: &ArchiveOptions) -> Option<Value> {
    let mut body = serde_json::Map::new();
    if options.set_status {
        body.insert(
            "properties".into(),
            json!({ "Status": { "select": { "name": CampaignStatus::Expired.label() } } }),
        );
    }
    if options.archive_page {
        body.insert("archived".into(), Value::Bool(true));
    }
    (!body.is_empty()).then_some(Value::Object(body))
}

fn select_options(names: &[&str]) -> Value {
    let options: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
    json!({ "select": { "options": options } })
}

/// Database property declarations matching [`page_properties`].
fn schema_properties() -> Value {
    json!({
        "properties": {
            "Name": { "title": {} },
            "Provider": { "rich_text": {} },
            "Category": { "rich_text": {} },
            "Reward Type": select_options(&["points", "cash"]),
            "Reward Value": { "rich_text": {} },
            "Deadline": { "date": {} },
            "Source URL": { "url": {} },
            "External ID": { "rich_text": {} },
            "LastChecked": { "date": {} },
            "Status": select_options(&[
                CampaignStatus::Active.label(),
                CampaignStatus::NeedsReview.label(),
                CampaignStatus::Expired.label(),
            ]),
        }
    })
}
