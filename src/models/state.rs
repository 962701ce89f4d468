//! Persistent cross-run state records.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::text::parse_iso_date;

/// State entities keyed by external id.
pub type StateMap = BTreeMap<String, StateEntity>;

/// First/last-seen record for one campaign fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateEntity {
    pub external_id: String,
    pub name: String,
    pub provider: String,
    pub deadline: Option<String>,
    pub source_url: String,
    #[serde(with = "timestamp")]
    pub first_seen: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_seen: DateTime<Utc>,
    #[serde(default)]
    pub archived: bool,
}

impl StateEntity {
    /// Deadline as a calendar date, if present and well formed.
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        self.deadline.as_deref().and_then(parse_iso_date)
    }
}

/// On-disk envelope of the state file.
#[derive(Debug, Clone, Serialize)]
pub struct StateFile<'a> {
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    pub items: &'a StateMap,
}

/// Loose view of a stored record; every field may be missing in older files.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StoredStateEntity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub first_seen: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub archived: Option<bool>,
}

impl StoredStateEntity {
    /// Resolve missing or unreadable fields against the load time.
    pub(crate) fn into_entity(self, external_id: String, now: DateTime<Utc>) -> StateEntity {
        StateEntity {
            external_id,
            name: self.name.unwrap_or_default(),
            provider: self.provider.unwrap_or_default(),
            deadline: self.deadline,
            source_url: self.source_url.unwrap_or_default(),
            first_seen: self
                .first_seen
                .as_deref()
                .and_then(timestamp::parse)
                .unwrap_or(now),
            last_seen: self
                .last_seen
                .as_deref()
                .and_then(timestamp::parse)
                .unwrap_or(now),
            archived: self.archived.unwrap_or(false),
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ` timestamps.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format(FORMAT).to_string()
    }

    /// Parse the state format, falling back to any RFC 3339 timestamp.
    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(s, FORMAT)
            .map(|naive| naive.and_utc())
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            })
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_round_trip_format() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        assert_eq!(timestamp::format(&dt), "2024-06-01T09:30:00Z");
        assert_eq!(timestamp::parse("2024-06-01T09:30:00Z"), Some(dt));
        assert_eq!(timestamp::parse("2024-06-01T18:30:00+09:00"), Some(dt));
        assert_eq!(timestamp::parse("yesterday"), None);
    }

    #[test]
    fn test_stored_entity_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let stored: StoredStateEntity =
            serde_json::from_str(r#"{"name": "A", "first_seen": "2024-05-01T00:00:00Z"}"#)
                .unwrap();
        let entity = stored.into_entity("p:abc".into(), now);

        assert_eq!(entity.external_id, "p:abc");
        assert_eq!(entity.name, "A");
        assert_eq!(entity.provider, "");
        assert_eq!(
            entity.first_seen,
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(entity.last_seen, now);
        assert!(!entity.archived);
    }
}
