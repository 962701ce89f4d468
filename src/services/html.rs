// src/services/html.rs

//! Listing extraction from HTML pages using CSS selectors.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{RawCandidate, SourceConfig};
use crate::services::match_keywords;
use crate::utils::resolve_url;
use crate::utils::text::{extract_reward_value, normalize_text, parse_date_jp};

/// Sub-selectors applied inside each listing node.
struct ItemSelectors {
    title: Option<Selector>,
    link: Option<Selector>,
    date: Option<Selector>,
    reward: Option<Selector>,
}

/// Extract candidates from an HTML page.
///
/// Listings come from the `list` selector, or every `<a>` when none is set.
/// Title and link default to the listing node itself.
pub fn extract(source: &SourceConfig, body: &str) -> Result<Vec<RawCandidate>> {
    let selectors = &source.selectors;
    let list_sel = parse_selector(selectors.list.as_deref().unwrap_or("a"))?;
    let item_sel = ItemSelectors {
        title: parse_optional(selectors.title.as_deref())?,
        link: parse_optional(selectors.link.as_deref())?,
        date: parse_optional(selectors.date.as_deref())?,
        reward: parse_optional(selectors.reward.as_deref())?,
    };

    let base_url = Url::parse(&source.url).ok();
    let document = Html::parse_document(body);

    let candidates = document
        .select(&list_sel)
        .filter_map(|node| parse_item(node, &item_sel, source, base_url.as_ref()))
        .collect();
    Ok(candidates)
}

fn parse_item(
    node: ElementRef,
    sel: &ItemSelectors,
    source: &SourceConfig,
    base_url: Option<&Url>,
) -> Option<RawCandidate> {
    let title_el = pick(node, sel.title.as_ref());
    let link_el = pick(node, sel.link.as_ref())?;

    let title = title_el.map_or_else(String::new, |el| normalize_text(&joined_text(el, "")));
    let href = link_el.value().attr("href").filter(|h| !h.is_empty())?;
    let url = match base_url {
        Some(base) => resolve_url(base, href),
        None => href.to_string(),
    };

    let node_text = normalize_text(&joined_text(node, " "));
    let include = &source.include_keywords;
    let exclude = &source.exclude_keywords;
    // Fall back to the whole listing when the title alone does not qualify
    if !match_keywords(&title, include, exclude) && !match_keywords(&node_text, include, exclude) {
        return None;
    }

    // A missing date element falls back to the listing text, a missing
    // reward element to the title
    let date_text = sub_text(node, sel.date.as_ref()).unwrap_or(node_text);
    let reward_text = sub_text(node, sel.reward.as_ref()).unwrap_or_else(|| title.clone());

    let reward = extract_reward_value(&reward_text);
    Some(RawCandidate {
        title,
        url,
        deadline: parse_date_jp(&date_text),
        reward_value: reward.as_ref().map(|(value, _)| value.clone()),
        reward_type: reward.map(|(_, kind)| kind),
    })
}

/// The first match of `selector` inside `node`, or `node` itself when no
/// selector is configured.
fn pick<'a>(node: ElementRef<'a>, selector: Option<&Selector>) -> Option<ElementRef<'a>> {
    match selector {
        Some(s) => node.select(s).next(),
        None => Some(node),
    }
}

/// Normalized text of the first match of `selector`, if any.
fn sub_text(node: ElementRef, selector: Option<&Selector>) -> Option<String> {
    selector
        .and_then(|s| node.select(s).next())
        .map(|el| normalize_text(&joined_text(el, " ")))
}

/// Trimmed, non-empty text nodes of `el` joined with `sep`.
fn joined_text(el: ElementRef, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_optional(s: Option<&str>) -> Result<Option<Selector>> {
    s.filter(|s| !s.trim().is_empty()).map(parse_selector).transpose()
}
