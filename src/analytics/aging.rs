//! Aging analysis for open tickets.
//!
//! Age is measured in whole days from submission to an injected `now`.
//! Only open-class tickets are aged. Tickets without a usable submission
//! date are counted as "unknown age" instead of landing in a bucket, and
//! tickets submitted after `now` are clamped to age 0 and counted as
//! anomalies.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::AgeStats;
use crate::records::{Priority, Ticket};

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// Fixed age ranges, inclusive lower bound, exclusive upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AgeBucket {
    UnderOneWeek,
    OneToTwoWeeks,
    TwoWeeksToMonth,
    OneToTwoMonths,
    OverTwoMonths,
}

impl AgeBucket {
    /// All buckets in definition order.
    pub const ALL: [AgeBucket; 5] = [
        Self::UnderOneWeek,
        Self::OneToTwoWeeks,
        Self::TwoWeeksToMonth,
        Self::OneToTwoMonths,
        Self::OverTwoMonths,
    ];

    pub fn for_age(days: i64) -> Self {
        match days {
            ..7 => Self::UnderOneWeek,
            7..14 => Self::OneToTwoWeeks,
            14..30 => Self::TwoWeeksToMonth,
            30..60 => Self::OneToTwoMonths,
            _ => Self::OverTwoMonths,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UnderOneWeek => "0-6 days",
            Self::OneToTwoWeeks => "7-13 days",
            Self::TwoWeeksToMonth => "14-29 days",
            Self::OneToTwoMonths => "30-59 days",
            Self::OverTwoMonths => "60+ days",
        }
    }

    /// `(lower, upper)` day bounds; `upper` is `None` for the open-ended bucket.
    pub fn bounds(self) -> (i64, Option<i64>) {
        match self {
            Self::UnderOneWeek => (0, Some(7)),
            Self::OneToTwoWeeks => (7, Some(14)),
            Self::TwoWeeksToMonth => (14, Some(30)),
            Self::OneToTwoMonths => (30, Some(60)),
            Self::OverTwoMonths => (60, None),
        }
    }
}

// ---------------------------------------------------------------------------
// Age
// ---------------------------------------------------------------------------

/// A ticket's age relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    pub days: i64,
    /// Submission was after `now`; `days` was clamped to 0.
    pub future_dated: bool,
}

/// Whole days between submission and `now`, floored. `None` when the ticket
/// has no submission date.
pub fn age_days(ticket: &Ticket, now: NaiveDateTime) -> Option<Age> {
    let submitted = ticket.submitted_at?;
    let elapsed = now.signed_duration_since(submitted);
    if elapsed < chrono::Duration::zero() {
        return Some(Age {
            days: 0,
            future_dated: true,
        });
    }
    Some(Age {
        days: elapsed.num_days(),
        future_dated: false,
    })
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Statistics for one age bucket. Stats are `None` for an empty bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketRow {
    pub bucket: AgeBucket,
    pub label: &'static str,
    pub count: usize,
    pub mean_age: Option<f64>,
    pub median_age: Option<f64>,
    pub max_age: Option<i64>,
}

/// Age statistics for one priority.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityAgingRow {
    pub priority: Priority,
    pub count: usize,
    pub mean_age: f64,
    pub median_age: f64,
    pub max_age: i64,
}

/// Output of [`bucket_summary`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgingSummary {
    /// One row per bucket in definition order, even when every count is 0.
    pub buckets: Vec<BucketRow>,
    /// Open-class tickets seen.
    pub open_total: usize,
    /// Open tickets without a usable submission date.
    pub unknown_age: usize,
    /// Open tickets dated after `now`, counted in the first bucket.
    pub future_dated: usize,
}

/// Split input into aged open tickets plus counters.
fn aged_open<'a, I>(records: I, now: NaiveDateTime) -> (Vec<(&'a Ticket, Age)>, usize, usize)
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut aged = Vec::new();
    let mut open_total = 0;
    let mut unknown = 0;
    for ticket in records.into_iter().filter(|t| t.is_open()) {
        open_total += 1;
        match age_days(ticket, now) {
            Some(age) => aged.push((ticket, age)),
            None => unknown += 1,
        }
    }
    (aged, open_total, unknown)
}

/// Bucket open tickets by age.
///
/// Every open ticket is counted exactly once: either in a bucket or in
/// `unknown_age`. Closed tickets are ignored entirely.
pub fn bucket_summary<'a, I>(records: I, now: NaiveDateTime) -> AgingSummary
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let (aged, open_total, unknown_age) = aged_open(records, now);
    let future_dated = aged.iter().filter(|(_, age)| age.future_dated).count();

    let buckets = AgeBucket::ALL
        .iter()
        .map(|&bucket| {
            let days: Vec<i64> = aged
                .iter()
                .filter(|(_, age)| AgeBucket::for_age(age.days) == bucket)
                .map(|(_, age)| age.days)
                .collect();
            let stats = AgeStats::from_days(&days);
            BucketRow {
                bucket,
                label: bucket.label(),
                count: days.len(),
                mean_age: stats.map(|s| s.mean),
                median_age: stats.map(|s| s.median),
                max_age: stats.map(|s| s.max),
            }
        })
        .collect();

    AgingSummary {
        buckets,
        open_total,
        unknown_age,
        future_dated,
    }
}

/// Age statistics of open tickets per priority, High → Low then others.
/// Tickets of unknown age are left out.
pub fn priority_summary<'a, I>(records: I, now: NaiveDateTime) -> Vec<PriorityAgingRow>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let (aged, _, _) = aged_open(records, now);

    let mut groups: Vec<(Priority, Vec<i64>)> = Vec::new();
    for (ticket, age) in aged {
        match groups.iter_mut().find(|(p, _)| *p == ticket.priority) {
            Some((_, days)) => days.push(age.days),
            None => groups.push((ticket.priority.clone(), vec![age.days])),
        }
    }
    groups.sort_by(|(a, _), (b, _)| a.rank().cmp(&b.rank()).then_with(|| a.label().cmp(b.label())));

    groups
        .into_iter()
        .filter_map(|(priority, days)| {
            AgeStats::from_days(&days).map(|stats| PriorityAgingRow {
                priority,
                count: days.len(),
                mean_age: stats.mean,
                median_age: stats.median,
                max_age: stats.max,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
