//! Campaign data structures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::text::{make_external_id, normalize_text, parse_iso_date};

/// Coarse reward category derived from the unit of the reward text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    /// Loyalty points (`P`, `ポイント`)
    Points,
    /// Cash (`円`)
    Cash,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardType::Points => "points",
            RewardType::Cash => "cash",
        }
    }
}

/// A listing straight out of an extractor, before identity is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub url: String,
    /// ISO `YYYY-MM-DD`
    pub deadline: Option<String>,
    pub reward_value: Option<String>,
    pub reward_type: Option<RewardType>,
}

/// A normalized, fingerprinted campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Campaign {
    pub name: String,
    pub provider: String,
    pub category: String,
    pub reward_type: Option<RewardType>,
    pub reward_value: Option<String>,
    /// ISO `YYYY-MM-DD`
    pub deadline: Option<String>,
    pub source_url: String,
    pub external_id: String,
}

impl Campaign {
    /// Build a campaign from an extracted candidate and its source labels.
    ///
    /// Returns `None` when the normalized title is empty.
    pub fn from_candidate(candidate: RawCandidate, provider: &str, category: &str) -> Option<Self> {
        let name = normalize_text(&candidate.title);
        if name.is_empty() {
            return None;
        }
        let external_id = make_external_id(
            provider,
            &name,
            &candidate.url,
            candidate.reward_value.as_deref(),
        );

        Some(Self {
            name,
            provider: provider.to_string(),
            category: category.to_string(),
            reward_type: candidate.reward_type,
            reward_value: candidate.reward_value,
            deadline: candidate.deadline,
            source_url: candidate.url,
            external_id,
        })
    }

    /// Deadline as a calendar date, if present and well formed.
    pub fn deadline_date(&self) -> Option<NaiveDate> {
        self.deadline.as_deref().and_then(parse_iso_date)
    }
}

/// Downstream status label derived from the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Active,
    NeedsReview,
    Expired,
}

impl CampaignStatus {
    /// `Active` when the deadline is today or later, otherwise `NeedsReview`.
    pub fn from_deadline(deadline: Option<&str>, today: NaiveDate) -> Self {
        match deadline.and_then(parse_iso_date) {
            Some(d) if d >= today => CampaignStatus::Active,
            _ => CampaignStatus::NeedsReview,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "Active",
            CampaignStatus::NeedsReview => "Needs Review",
            CampaignStatus::Expired => "Expired",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str) -> RawCandidate {
        RawCandidate {
            title: title.to_string(),
            url: "https://example.com/c/1".to_string(),
            deadline: Some("2024-06-30".to_string()),
            reward_value: Some("最大500ポイント".to_string()),
            reward_type: Some(RewardType::Points),
        }
    }

    #[test]
    fn test_from_candidate_normalizes_name() {
        let c = Campaign::from_candidate(candidate("  新規入会\n キャンペーン "), "Example", "card")
            .unwrap();
        assert_eq!(c.name, "新規入会 キャンペーン");
        assert_eq!(c.provider, "Example");
        assert_eq!(c.category, "card");
        assert!(c.external_id.starts_with("example:"));
        assert_eq!(
            c.deadline_date(),
            NaiveDate::from_ymd_opt(2024, 6, 30)
        );
    }

    #[test]
    fn test_from_candidate_rejects_blank_title() {
        assert!(Campaign::from_candidate(candidate(" \n\t "), "Example", "card").is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let c = Campaign::from_candidate(candidate("ポイント還元"), "Example", "card").unwrap();
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["reward_type"], "points");
        assert_eq!(value["deadline"], "2024-06-30");
        assert_eq!(value["source_url"], "https://example.com/c/1");
    }

    #[test]
    fn test_status_from_deadline() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            CampaignStatus::from_deadline(Some("2024-06-01"), today),
            CampaignStatus::Active
        );
        assert_eq!(
            CampaignStatus::from_deadline(Some("2024-05-31"), today),
            CampaignStatus::NeedsReview
        );
        assert_eq!(
            CampaignStatus::from_deadline(None, today),
            CampaignStatus::NeedsReview
        );
    }
}
