//! Date-based derivations: evidence staleness, policy review health, and
//! owner display names.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days ahead of a review date that still count as "due soon".
pub const REVIEW_SOON_DAYS: i64 = 30;

/// Display name for snapshots without an owner.
pub const UNASSIGNED: &str = "Unassigned";

/// A control is stale when its freshness date lies strictly before `today`.
///
/// Comparison is date-only: a freshness date equal to today is fresh.
#[must_use]
pub fn is_stale(freshness_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    freshness_date.is_some_and(|d| d < today)
}

/// Whole days from `now` until midnight UTC of `date`, rounded up.
#[must_use]
pub fn days_until(date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let target = date.and_time(NaiveTime::MIN).and_utc();
    let millis = (target - now).num_milliseconds();
    let day = 86_400_000_i64;
    // ceil for both signs
    if millis >= 0 {
        (millis + day - 1) / day
    } else {
        -((-millis) / day)
    }
}

/// Review health of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Review date already passed.
    Past,
    /// Review due within [`REVIEW_SOON_DAYS`].
    Soon,
    Healthy,
    /// No review date recorded.
    #[serde(alias = "none")]
    NoDate,
}

impl ReviewState {
    #[must_use]
    pub fn classify(review_date: Option<NaiveDate>, now: DateTime<Utc>) -> Self {
        review_date.map_or(Self::NoDate, |date| {
            let days = days_until(date, now);
            if days < 0 {
                Self::Past
            } else if days <= REVIEW_SOON_DAYS {
                Self::Soon
            } else {
                Self::Healthy
            }
        })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Past => "past",
            Self::Soon => "soon",
            Self::Healthy => "healthy",
            Self::NoDate => "no_date",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display name from a free-text owner such as `"Jane Doe (jane@corp.io)"`.
///
/// Text before the first parenthesis is kept and trimmed. Blank or absent
/// owners render as [`UNASSIGNED`].
#[must_use]
pub fn owner_display_name(owner: Option<&str>) -> String {
    let Some(owner) = owner.map(str::trim).filter(|o| !o.is_empty()) else {
        return UNASSIGNED.to_string();
    };
    match owner.split_once('(') {
        Some((name, _)) if !name.trim().is_empty() => name.trim().to_string(),
        _ => owner.to_string(),
    }
}
