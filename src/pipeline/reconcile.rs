//! Incremental reconciliation of a run against persisted state.
//!
//! Computes which campaigns are newly discovered and which previously seen
//! campaigns have passed their deadline and should be archived downstream.

use std::collections::HashMap;

use chrono::{DateTime, Days, Utc};

use crate::models::{Campaign, StateEntity, StateMap};

/// Result of reconciling one run against the previous state.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Campaigns seen for the first time, in run order
    pub new_items: Vec<Campaign>,
    /// Unarchived entities whose deadline is before today
    pub expired_ids: Vec<String>,
    /// Updated state to persist
    pub state: StateMap,
}

impl ReconcileOutcome {
    /// Check if there is anything to report or sync.
    pub fn has_changes(&self) -> bool {
        !self.new_items.is_empty() || !self.expired_ids.is_empty()
    }
}

/// Reconcile `current` against `previous` at time `now`.
///
/// `previous` is left untouched. Entities present in the run get their
/// last-seen time and descriptive fields refreshed; entities not in the
/// state are added with first-seen = last-seen = `now`. Expiry is judged on
/// the refreshed deadline whether or not the entity reappeared.
pub fn reconcile(
    previous: &StateMap,
    current: &[Campaign],
    window_days: u32,
    now: DateTime<Utc>,
) -> ReconcileOutcome {
    let today = now.date_naive();
    let current_map: HashMap<&str, &Campaign> =
        current.iter().map(|c| (c.external_id.as_str(), c)).collect();

    let mut state = previous.clone();
    let mut expired_ids = Vec::new();

    for (id, entity) in state.iter_mut() {
        if let Some(item) = current_map.get(id.as_str()) {
            entity.last_seen = now;
            entity.deadline = item.deadline.clone();
            entity.name = item.name.clone();
            entity.provider = item.provider.clone();
            entity.source_url = item.source_url.clone();
        }

        if !entity.archived && entity.deadline_date().is_some_and(|d| d < today) {
            expired_ids.push(id.clone());
        }
    }

    let window_start = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(today);
    let mut new_items = Vec::new();

    for item in current {
        if state.contains_key(&item.external_id) {
            continue;
        }
        // Duplicate ids take the last occurrence at the first position
        let item = current_map
            .get(item.external_id.as_str())
            .copied()
            .unwrap_or(item);
        let entity = StateEntity {
            external_id: item.external_id.clone(),
            name: item.name.clone(),
            provider: item.provider.clone(),
            deadline: item.deadline.clone(),
            source_url: item.source_url.clone(),
            first_seen: now,
            last_seen: now,
            archived: false,
        };
        if entity.first_seen.date_naive() >= window_start {
            new_items.push(item.clone());
        }
        state.insert(item.external_id.clone(), entity);
    }

    ReconcileOutcome {
        new_items,
        expired_ids,
        state,
    }
}

/// Flag `ids` as archived so they are not reported as expired again.
pub fn mark_archived(state: &mut StateMap, ids: &[String]) {
    for id in ids {
        if let Some(entity) = state.get_mut(id) {
            entity.archived = true;
        }
    }
}
