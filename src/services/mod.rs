// src/services/mod.rs

//! Format extractors that turn a fetched document into candidate listings.
//!
//! Each source format has its own pure function taking the source
//! definition and the document body; [`extract`] dispatches on the
//! source type.

pub mod feed;
pub mod html;
pub mod json;

use crate::error::{AppError, Result};
use crate::models::{RawCandidate, SourceConfig, SourceType};

/// Extract candidates from `body` according to the source's type.
pub fn extract(source: &SourceConfig, body: &str) -> Result<Vec<RawCandidate>> {
    match source.source_type {
        SourceType::Html => html::extract(source, body),
        SourceType::Rss => feed::extract(source, body),
        SourceType::Json => json::extract(source, body),
        SourceType::Unknown => Err(AppError::validation(format!(
            "no extractor for source {}",
            source.url
        ))),
    }
}

/// Keep `text` when it contains an include keyword (or there are none) and
/// contains no exclude keyword.
pub fn match_keywords(text: &str, include: &[String], exclude: &[String]) -> bool {
    if !include.is_empty() && !include.iter().any(|k| text.contains(k.as_str())) {
        return false;
    }
    !exclude.iter().any(|k| text.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_match_keywords_empty_lists_keep_everything() {
        assert!(match_keywords("anything", &[], &[]));
        assert!(match_keywords("", &[], &[]));
    }

    #[test]
    fn test_match_keywords_include() {
        let include = kw(&["キャンペーン", "ポイント"]);
        assert!(match_keywords("春のキャンペーン", &include, &[]));
        assert!(!match_keywords("お知らせ", &include, &[]));
    }

    #[test]
    fn test_match_keywords_exclude_wins() {
        let include = kw(&["キャンペーン"]);
        let exclude = kw(&["終了"]);
        assert!(!match_keywords("キャンペーンは終了しました", &include, &exclude));
        assert!(!match_keywords("終了", &[], &exclude));
    }

    #[test]
    fn test_extract_dispatches_by_type() {
        let mut source = SourceConfig::new("https://api.example.com/list", SourceType::Json);
        let body = r#"{"items": [{"title": "ポイント還元", "url": "https://a.example/1"}]}"#;
        assert_eq!(extract(&source, body).unwrap().len(), 1);

        source.source_type = SourceType::Unknown;
        assert!(extract(&source, body).is_err());
    }
}
