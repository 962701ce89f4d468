// src/services/feed.rs

//! RSS and Atom feed extraction.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{AppError, Result};
use crate::models::{RawCandidate, SourceConfig};
use crate::services::match_keywords;
use crate::utils::text::{extract_reward_value, normalize_text, parse_date_jp};

/// Child elements read from an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"pubDate" | b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    title: String,
    link: String,
    published: String,
    updated: String,
}

impl Entry {
    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
        }
    }

    /// Take an Atom-style `href` when no link has been read yet.
    fn take_href(&mut self, e: &BytesStart) -> Result<()> {
        if !self.link.is_empty() {
            return Ok(());
        }
        let rel = e.try_get_attribute("rel").map_err(AppError::feed)?;
        if let Some(rel) = rel {
            if rel.unescape_value().map_err(AppError::feed)? != "alternate" {
                return Ok(());
            }
        }
        if let Some(href) = e.try_get_attribute("href").map_err(AppError::feed)? {
            self.link = href.unescape_value().map_err(AppError::feed)?.into_owned();
        }
        Ok(())
    }
}

/// Extract candidates from an RSS or Atom document.
///
/// Every `item` or `entry` element is read regardless of nesting depth.
/// Entries without a link are skipped and the publication date stands in
/// for the deadline.
pub fn extract(source: &SourceConfig, body: &str) -> Result<Vec<RawCandidate>> {
    let xml = scrub_html_entities(body);
    let entries = read_entries(&xml)?;

    let candidates = entries
        .into_iter()
        .filter_map(|entry| {
            let title = normalize_text(&entry.title);
            let link = normalize_text(&entry.link);
            if link.is_empty()
                || !match_keywords(&title, &source.include_keywords, &source.exclude_keywords)
            {
                return None;
            }

            let date = if entry.published.trim().is_empty() {
                &entry.updated
            } else {
                &entry.published
            };
            let reward = extract_reward_value(&title);
            Some(RawCandidate {
                deadline: parse_date_jp(date),
                reward_value: reward.as_ref().map(|(value, _)| value.clone()),
                reward_type: reward.map(|(_, kind)| kind),
                title,
                url: link,
            })
        })
        .collect();
    Ok(candidates)
}

fn read_entries(xml: &str) -> Result<Vec<Entry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<Entry> = None;
    // Open elements below the current entry
    let mut depth = 0usize;
    let mut capture: Option<Field> = None;

    loop {
        match reader.read_event().map_err(AppError::feed)? {
            Event::Start(e) => {
                let name = e.local_name();
                match current.as_mut() {
                    None => {
                        if matches!(name.as_ref(), b"item" | b"entry") {
                            current = Some(Entry::default());
                            depth = 0;
                        }
                    }
                    Some(entry) => {
                        depth += 1;
                        if depth == 1 {
                            capture = Field::from_name(name.as_ref())
                                .filter(|f| entry.slot(*f).is_empty());
                            if capture == Some(Field::Link) {
                                entry.take_href(&e)?;
                            }
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    if depth == 0 && e.local_name().as_ref() == b"link" {
                        entry.take_href(&e)?;
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(entry), Some(field)) = (current.as_mut(), capture) {
                    if depth == 1 {
                        entry.slot(field).push_str(&t.unescape().map_err(AppError::feed)?);
                    }
                }
            }
            Event::CData(c) => {
                if let (Some(entry), Some(field)) = (current.as_mut(), capture) {
                    if depth == 1 {
                        entry
                            .slot(field)
                            .push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
            }
            Event::End(_) => {
                if current.is_some() {
                    if depth == 0 {
                        entries.extend(current.take());
                    } else {
                        if depth == 1 {
                            capture = None;
                        }
                        depth -= 1;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Replace HTML entities that XML does not define.
fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
        .replace("&yen;", "¥")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RewardType, SourceType};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Bank News</title>
    <link>https://bank.example/</link>
    <item>
      <title><![CDATA[新規入会で最大5,000ポイント]]></title>
      <link>https://bank.example/c/1?a=1&amp;b=2</link>
      <pubDate>Sat, 01 Jun 2024 10:00:00 +0900</pubDate>
    </item>
    <item>
      <title>リンクのないキャンペーン</title>
      <pubDate>Sat, 01 Jun 2024 10:00:00 +0900</pubDate>
    </item>
    <item>
      <title>メンテナンスのお知らせ&nbsp;</title>
      <link>https://bank.example/n/2</link>
    </item>
    <item>
      <title>口座開設キャンペーン</title>
      <link> https://bank.example/c/3 </link>
    </item>
  </channel>
</rss>"#;

    fn source() -> SourceConfig {
        SourceConfig::new("https://bank.example/feed", SourceType::Rss).with_default_keywords()
    }

    #[test]
    fn test_extract_rss_items() {
        let items = extract(&source(), RSS).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "新規入会で最大5,000ポイント");
        assert_eq!(items[0].url, "https://bank.example/c/1?a=1&b=2");
        assert_eq!(items[0].deadline.as_deref(), Some("2024-06-01"));
        assert_eq!(items[0].reward_value.as_deref(), Some("最大5,000ポイント"));
        assert_eq!(items[0].reward_type, Some(RewardType::Points));

        assert_eq!(items[1].url, "https://bank.example/c/3");
        assert_eq!(items[1].deadline, None);
    }

    #[test]
    fn test_channel_link_is_not_an_item() {
        let src = SourceConfig::new("https://bank.example/feed", SourceType::Rss);
        let items = extract(&src, RSS).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|c| c.url != "https://bank.example/"));
        assert_eq!(items[1].title, "メンテナンスのお知らせ");
    }

    #[test]
    fn test_extract_atom_entries() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Card offers</title>
  <link href="https://card.example/"/>
  <entry>
    <title>入会特典 3000円キャッシュバック</title>
    <link rel="self" href="https://card.example/feed/1"/>
    <link href="https://card.example/offers/1"/>
    <updated>2024-06-10T00:00:00Z</updated>
  </entry>
  <entry>
    <title>登録キャンペーン</title>
    <link rel="alternate" href="https://card.example/offers/2"/>
    <published>2024-06-20T09:00:00+09:00</published>
    <updated>2024-06-21T00:00:00Z</updated>
  </entry>
</feed>"#;
        let items = extract(&source(), atom).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://card.example/offers/1");
        assert_eq!(items[0].deadline.as_deref(), Some("2024-06-10"));
        assert_eq!(items[0].reward_type, Some(RewardType::Cash));
        assert_eq!(items[1].url, "https://card.example/offers/2");
        assert_eq!(items[1].deadline.as_deref(), Some("2024-06-20"));
    }

    #[test]
    fn test_items_at_any_depth() {
        let rdf = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel><title>x</title></channel>
  <item><title>特典のご案内</title><link>https://shop.example/1</link></item>
</rdf:RDF>"#;
        let items = extract(&source(), rdf).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://shop.example/1");
    }

    #[test]
    fn test_malformed_feed_is_error() {
        let err = extract(&source(), "<rss><channel><item></channel></rss>").unwrap_err();
        assert!(matches!(err, AppError::Feed(_)));
    }
}
