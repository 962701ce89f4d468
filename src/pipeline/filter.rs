// src/pipeline/filter.rs

//! Deadline-based filtering of collected campaigns.

use chrono::{Days, NaiveDate};

use crate::models::Campaign;

/// Deadline filter options for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadlineFilter {
    /// Keep only deadlines within `[today, today + N]`.
    pub valid_within_days: Option<u32>,
    /// Drop campaigns without a readable deadline.
    pub require_deadline: bool,
}

impl DeadlineFilter {
    /// Filter used by `--active-only`: any future deadline, no window.
    pub fn active_only() -> Self {
        Self {
            valid_within_days: None,
            require_deadline: true,
        }
    }

    /// Whether a campaign with the given deadline survives.
    ///
    /// An unreadable deadline counts as no deadline.
    pub fn keeps(&self, deadline: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (deadline, self.valid_within_days) {
            (None, Some(_)) => false,
            (None, None) => !self.require_deadline,
            (Some(d), Some(days)) => {
                let end = today
                    .checked_add_days(Days::new(u64::from(days)))
                    .unwrap_or(NaiveDate::MAX);
                today <= d && d <= end
            }
            (Some(d), None) => d >= today,
        }
    }
}

/// Apply `filter` to `items`, preserving order.
pub fn filter_by_deadline(
    items: Vec<Campaign>,
    filter: &DeadlineFilter,
    today: NaiveDate,
) -> Vec<Campaign> {
    items
        .into_iter()
        .filter(|c| filter.keeps(c.deadline_date(), today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn campaign(id: &str, deadline: Option<&str>) -> Campaign {
        Campaign {
            name: id.to_string(),
            provider: "P".into(),
            category: "bank".into(),
            reward_type: None,
            reward_value: None,
            deadline: deadline.map(String::from),
            source_url: format!("https://example.com/{id}"),
            external_id: format!("p:{id}"),
        }
    }

    fn ids(items: &[Campaign]) -> Vec<&str> {
        items.iter().map(|c| c.name.as_str()).collect()
    }

    fn sample() -> Vec<Campaign> {
        vec![
            campaign("soon", Some("2024-06-05")),
            campaign("later", Some("2024-06-09")),
            campaign("past", Some("2024-05-31")),
            campaign("none", None),
            campaign("today", Some("2024-06-01")),
            campaign("edge", Some("2024-06-08")),
            campaign("garbled", Some("next week")),
        ]
    }

    #[test]
    fn test_window_filter() {
        let filter = DeadlineFilter {
            valid_within_days: Some(7),
            require_deadline: false,
        };
        let kept = filter_by_deadline(sample(), &filter, date(2024, 6, 1));
        assert_eq!(ids(&kept), vec!["soon", "today", "edge"]);
    }

    #[test]
    fn test_no_flags_drops_only_past() {
        let kept = filter_by_deadline(sample(), &DeadlineFilter::default(), date(2024, 6, 1));
        assert_eq!(
            ids(&kept),
            vec!["soon", "later", "none", "today", "edge", "garbled"]
        );
    }

    #[test]
    fn test_require_deadline_only() {
        let kept = filter_by_deadline(sample(), &DeadlineFilter::active_only(), date(2024, 6, 1));
        assert_eq!(ids(&kept), vec!["soon", "later", "today", "edge"]);
    }

    #[test]
    fn test_zero_day_window_keeps_today_only() {
        let filter = DeadlineFilter {
            valid_within_days: Some(0),
            require_deadline: true,
        };
        let kept = filter_by_deadline(sample(), &filter, date(2024, 6, 1));
        assert_eq!(ids(&kept), vec!["today"]);
    }
}
