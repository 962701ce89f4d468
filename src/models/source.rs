// src/models/source.rs

//! Crawl source definitions loaded from the sources file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

/// Keywords that mark a listing as a promotion when a source gives none.
pub const DEFAULT_INCLUDE_KEYWORDS: &[&str] = &[
    "新規",
    "口座開設",
    "キャンペーン",
    "ポイント",
    "キャッシュバック",
    "還元",
    "入会",
    "登録",
    "特典",
    "プレゼント",
    "クーポン",
];

/// Keywords that mark a listing as ended or lottery-only.
pub const DEFAULT_EXCLUDE_KEYWORDS: &[&str] = &["終了", "終了しました", "抽選のみ"];

/// Document format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    /// HTML page scraped with CSS selectors
    #[default]
    Html,
    /// RSS or Atom feed
    Rss,
    /// JSON endpoint
    Json,
    /// Anything else; skipped at run time
    Unknown,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Html => "html",
            SourceType::Rss => "rss",
            SourceType::Json => "json",
            SourceType::Unknown => "unknown",
        }
    }
}

impl From<String> for SourceType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "html" | "markup" => SourceType::Html,
            "rss" | "atom" | "feed" => SourceType::Rss,
            "json" | "structured" => SourceType::Json,
            _ => SourceType::Unknown,
        }
    }
}

impl From<SourceType> for String {
    fn from(t: SourceType) -> Self {
        t.as_str().to_string()
    }
}

/// CSS selectors for an HTML source. All are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkupSelectors {
    /// Selector for each listing; every `<a>` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,

    /// Title element within a listing; the listing itself when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Link element within a listing; the listing itself when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Deadline element within a listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Reward element within a listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
}

/// One configured crawl target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page, feed or endpoint URL
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub source_type: SourceType,

    /// Provider label copied onto every campaign
    #[serde(default, deserialize_with = "null_as_default")]
    pub provider: String,

    /// Category label copied onto every campaign
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub selectors: MarkupSelectors,

    /// Dot path to the item array, e.g. `data.items` or `results.0.list`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_title_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_link_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_deadline_key: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub include_keywords: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub exclude_keywords: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled: bool,
}

impl SourceConfig {
    /// Create an enabled source with no selectors or keywords.
    pub fn new(url: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            url: url.into(),
            source_type,
            provider: String::new(),
            category: String::new(),
            selectors: MarkupSelectors::default(),
            json_path: None,
            json_title_key: None,
            json_link_key: None,
            json_deadline_key: None,
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            disabled: false,
        }
    }

    /// Load the source list from a JSON file.
    ///
    /// Anything other than a JSON array is a configuration error.
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse_all(&content)
    }

    /// Parse a source list from JSON text.
    pub fn parse_all(content: &str) -> Result<Vec<Self>> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if !value.is_array() {
            return Err(AppError::config("sources file must be a JSON list"));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Fill in the built-in keyword lists where the source has none.
    pub fn with_default_keywords(mut self) -> Self {
        if self.include_keywords.is_empty() {
            self.include_keywords = DEFAULT_INCLUDE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect();
        }
        if self.exclude_keywords.is_empty() {
            self.exclude_keywords = DEFAULT_EXCLUDE_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect();
        }
        self
    }

    pub fn json_path(&self) -> &str {
        self.json_path.as_deref().filter(|s| !s.is_empty()).unwrap_or("items")
    }

    pub fn json_title_key(&self) -> &str {
        self.json_title_key.as_deref().filter(|s| !s.is_empty()).unwrap_or("title")
    }

    pub fn json_link_key(&self) -> &str {
        self.json_link_key.as_deref().filter(|s| !s.is_empty()).unwrap_or("url")
    }

    pub fn json_deadline_key(&self) -> &str {
        self.json_deadline_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("deadline")
    }

    /// Check one source for problems that would make it unusable.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::validation("source url is empty"));
        }
        url::Url::parse(&self.url)?;
        if self.source_type == SourceType::Unknown {
            return Err(AppError::validation(format!(
                "unknown source_type for {}",
                self.url
            )));
        }
        Ok(())
    }
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_source() {
        let sources = SourceConfig::parse_all(r#"[{"url": "https://example.com/"}]"#).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source_type, SourceType::Html);
        assert!(!sources[0].disabled);
        assert!(sources[0].include_keywords.is_empty());
        assert_eq!(sources[0].json_path(), "items");
        assert_eq!(sources[0].json_link_key(), "url");
    }

    #[test]
    fn test_source_type_is_case_insensitive() {
        let sources = SourceConfig::parse_all(
            r#"[
                {"url": "https://a.example/feed", "source_type": "RSS"},
                {"url": "https://a.example/api", "source_type": "Json"},
                {"url": "https://a.example/x", "source_type": "pdf"}
            ]"#,
        )
        .unwrap();
        assert_eq!(sources[0].source_type, SourceType::Rss);
        assert_eq!(sources[1].source_type, SourceType::Json);
        assert_eq!(sources[2].source_type, SourceType::Unknown);
    }

    #[test]
    fn test_null_values_read_as_absent() {
        let sources = SourceConfig::parse_all(
            r#"[{
                "url": "https://a.example/",
                "source_type": null,
                "provider": null,
                "category": null,
                "selectors": null,
                "include_keywords": null,
                "exclude_keywords": null,
                "disabled": null
            }]"#,
        )
        .unwrap();
        let src = &sources[0];
        assert_eq!(src.source_type, SourceType::Html);
        assert_eq!(src.provider, "");
        assert_eq!(src.category, "");
        assert!(src.selectors.list.is_none());
        assert!(src.include_keywords.is_empty());
        assert!(src.exclude_keywords.is_empty());
        assert!(!src.disabled);
    }

    #[test]
    fn test_non_list_is_config_error() {
        let err = SourceConfig::parse_all(r#"{"url": "https://example.com/"}"#).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_selectors_and_keys() {
        let sources = SourceConfig::parse_all(
            r#"[{
                "url": "https://bank.example/campaigns",
                "provider": "Example Bank",
                "category": "bank",
                "selectors": {"list": "li.campaign", "title": "h3", "date": ".period"},
                "json_path": "data.items",
                "include_keywords": ["キャンペーン"]
            }]"#,
        )
        .unwrap();
        let src = &sources[0];
        assert_eq!(src.selectors.list.as_deref(), Some("li.campaign"));
        assert_eq!(src.selectors.link, None);
        assert_eq!(src.json_path(), "data.items");
        assert_eq!(src.include_keywords, vec!["キャンペーン".to_string()]);
    }

    #[test]
    fn test_default_keywords_only_fill_empty_lists() {
        let mut src = SourceConfig::new("https://example.com", SourceType::Html);
        src.include_keywords = vec!["セール".into()];
        let src = src.with_default_keywords();
        assert_eq!(src.include_keywords, vec!["セール".to_string()]);
        assert_eq!(src.exclude_keywords.len(), DEFAULT_EXCLUDE_KEYWORDS.len());
    }

    #[test]
    fn test_bundled_sources_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/configs/sources.json");
        let sources = SourceConfig::load_all(path).unwrap();
        assert_eq!(sources.len(), 4);
        assert!(sources.iter().all(|s| s.validate().is_ok()));
        assert!(sources[3].disabled);
        assert_eq!(sources[2].json_link_key(), "detail_url");
    }

    #[test]
    fn test_missing_sources_file_is_config_error() {
        let err = SourceConfig::load_all("does/not/exist.json").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate() {
        assert!(SourceConfig::new("https://example.com", SourceType::Rss).validate().is_ok());
        assert!(SourceConfig::new("", SourceType::Rss).validate().is_err());
        assert!(SourceConfig::new("not a url", SourceType::Html).validate().is_err());
        assert!(
            SourceConfig::new("https://example.com", SourceType::Unknown)
                .validate()
                .is_err()
        );
    }
}
