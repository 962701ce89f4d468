// src/services/json.rs

//! Listing extraction from JSON API responses.

use serde_json::Value;

use crate::error::Result;
use crate::models::{RawCandidate, SourceConfig};
use crate::services::match_keywords;
use crate::utils::text::{extract_reward_value, normalize_text, parse_date_jp};

/// Extract candidates from a JSON document.
///
/// The item array is found by walking `json_path`; a missing path or a
/// non-array value yields no candidates.
pub fn extract(source: &SourceConfig, body: &str) -> Result<Vec<RawCandidate>> {
    let data: Value = serde_json::from_str(body)?;
    let Some(Value::Array(items)) = lookup_path(&data, source.json_path()) else {
        return Ok(Vec::new());
    };

    let title_key = source.json_title_key();
    let link_key = source.json_link_key();
    let deadline_key = source.json_deadline_key();

    let candidates = items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let title = normalize_text(&obj.get(title_key).map(value_text).unwrap_or_default());
            let link = obj
                .get(link_key)
                .filter(|v| is_truthy(v))
                .map(value_text)
                .unwrap_or_default();
            if link.is_empty()
                || !match_keywords(&title, &source.include_keywords, &source.exclude_keywords)
            {
                return None;
            }

            let deadline = obj
                .get(deadline_key)
                .filter(|v| is_truthy(v))
                .and_then(|v| parse_date_jp(&value_text(v)));
            let reward = extract_reward_value(&title);
            Some(RawCandidate {
                title,
                url: link,
                deadline,
                reward_value: reward.as_ref().map(|(value, _)| value.clone()),
                reward_type: reward.map(|(_, kind)| kind),
            })
        })
        .collect();
    Ok(candidates)
}

/// Walk a dot-separated path of object keys and array indices.
///
/// Empty segments are ignored; negative indices count from the end.
pub fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(data, |cur, part| match cur {
            Value::Array(arr) => {
                let idx: i64 = part.parse().ok()?;
                let idx = if idx < 0 {
                    arr.len().checked_sub(idx.unsigned_abs() as usize)?
                } else {
                    idx as usize
                };
                arr.get(idx)
            }
            Value::Object(map) => map.get(part),
            _ => None,
        })
}

/// Text form of a scalar; strings are taken verbatim.
fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
