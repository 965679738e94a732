//! Predicate filtering over tickets.
//!
//! A [`PredicateSet`] is a conjunction of optional predicates. Unset
//! predicates match everything, so the default set is the identity filter.
//! Date bounds are inclusive and compare calendar dates, ignoring time of
//! day; undated tickets fail any active date bound.
//!
//! [`Period`] resolves the dashboard's relative week windows ("current
//! week", "last week"...) against an injected `now`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::analytics::cost::week_start;
use crate::records::{Field, Origin, Priority, Status, Ticket, UNSPECIFIED, fold_key};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("unknown filter '{0}'")]
    UnknownKey(String),
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("unknown period '{0}' (expected current-week, last-week, last-2-weeks or last-4-weeks)")]
    InvalidPeriod(String),
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Active filters. `None` means "All".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub origin: Option<Origin>,
    /// Exact customer name; `"Unspecified"` selects tickets without one.
    pub customer: Option<String>,
    /// Case-insensitive substring searched across every text field.
    pub search: Option<String>,
    /// Named period the date bounds came from, if any.
    pub period: Option<Period>,
}

/// `"All"` and blank strings disable a predicate.
fn choice(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, FilterError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| FilterError::InvalidDate(value.to_string()))
}

impl PredicateSet {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Set one predicate from a string key/value pair, as given on the
    /// command line or in a query string. `"All"` or an empty value clears
    /// the predicate.
    ///
    /// `period` needs `now` to resolve; pass the same clock the views use.
    pub fn set(&mut self, key: &str, value: &str, now: NaiveDateTime) -> Result<(), FilterError> {
        let value = choice(value);
        match fold_key(key).as_str() {
            "from" | "datefrom" => {
                self.date_from = value.map(parse_date).transpose()?;
                self.period = None;
            }
            "to" | "dateto" => {
                self.date_to = value.map(parse_date).transpose()?;
                self.period = None;
            }
            "status" => self.status = value.map(Status::parse),
            "priority" => self.priority = value.map(Priority::parse),
            "origin" | "externalorinternal" => self.origin = value.map(Origin::parse),
            "customer" => self.customer = value.map(str::to_string),
            "search" | "q" => self.search = value.map(str::to_string),
            "period" => {
                if let Some(raw) = value {
                    let period = Period::parse(raw)
                        .ok_or_else(|| FilterError::InvalidPeriod(raw.to_string()))?;
                    *self = self.clone().with_period(period, now);
                }
            }
            _ => return Err(FilterError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Replace the date bounds with a period's window.
    pub fn with_period(mut self, period: Period, now: NaiveDateTime) -> Self {
        let (from, to) = period.date_range(now);
        self.date_from = Some(from);
        self.date_to = Some(to);
        self.period = Some(period);
        self
    }

    /// The active date window: the named period if one was set, otherwise
    /// a custom period when both bounds are present.
    pub fn window(&self) -> Option<Period> {
        self.period.or(match (self.date_from, self.date_to) {
            (Some(from), Some(to)) => Some(Period::Custom(from, to)),
            _ => None,
        })
    }

    pub fn has_date_bound(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        if self.has_date_bound() {
            let Some(date) = ticket.submitted_date() else {
                return false;
            };
            if self.date_from.is_some_and(|from| date < from)
                || self.date_to.is_some_and(|to| date > to)
            {
                return false;
            }
        }
        if self.status.as_ref().is_some_and(|s| !same_label(s.label(), ticket.status.label())) {
            return false;
        }
        if self.priority.as_ref().is_some_and(|p| !same_label(p.label(), ticket.priority.label())) {
            return false;
        }
        if self.origin.as_ref().is_some_and(|o| !same_label(o.label(), ticket.origin.label())) {
            return false;
        }
        if self
            .customer
            .as_deref()
            .is_some_and(|c| c != ticket.customer_label())
        {
            return false;
        }
        if let Some(needle) = &self.search {
            return search_matches(ticket, needle);
        }
        true
    }
}

/// Categorical equality ignoring case, spacing and punctuation, so free-form
/// values like `Awaiting Parts` match `awaiting-parts`.
fn same_label(a: &str, b: &str) -> bool {
    a == b || fold_key(a) == fold_key(b)
}

/// Case-insensitive substring match over all text the ticket carries.
fn search_matches(ticket: &Ticket, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

    contains(&ticket.id)
        || contains(ticket.status.label())
        || contains(ticket.priority.label())
        || contains(ticket.origin.label())
        || ticket.customer.as_deref().is_some_and(contains)
        || ticket.issue_type.as_deref().is_some_and(contains)
        || ticket.extra.iter().any(|(_, value)| contains(value))
}

/// Tickets matching every active predicate, in input order.
pub fn apply(records: &[Ticket], predicates: &PredicateSet) -> Vec<Ticket> {
    if predicates.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|t| predicates.matches(t))
        .cloned()
        .collect()
}

/// Sorted distinct values of a field, excluding missing values. Used to
/// build filter choices (`"All"` plus these).
pub fn distinct_options(records: &[Ticket], field: Field) -> Vec<String> {
    let mut values: Vec<String> = records
        .iter()
        .map(|t| field.value(t))
        .filter(|v| *v != UNSPECIFIED)
        .map(str::to_string)
        .collect();
    values.sort();
    values.dedup();
    values
}

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

/// Relative date windows. Weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Monday of this week through today.
    CurrentWeek,
    /// Monday through Sunday of the previous week.
    LastWeek,
    /// Monday two weeks before this week's Monday through today.
    LastTwoWeeks,
    /// Monday four weeks before this week's Monday through today.
    LastFourWeeks,
    /// Explicit inclusive date range.
    Custom(NaiveDate, NaiveDate),
}

impl Period {
    pub fn parse(raw: &str) -> Option<Self> {
        match fold_key(raw).as_str() {
            "currentweek" | "thisweek" | "week" => Some(Self::CurrentWeek),
            "lastweek" | "previousweek" => Some(Self::LastWeek),
            "last2weeks" | "lasttwoweeks" => Some(Self::LastTwoWeeks),
            "last4weeks" | "lastfourweeks" => Some(Self::LastFourWeeks),
            _ => None,
        }
    }

    /// Inclusive `(from, to)` calendar dates for this period.
    pub fn date_range(self, now: NaiveDateTime) -> (NaiveDate, NaiveDate) {
        let today = now.date();
        let monday = week_start(today);
        match self {
            Self::CurrentWeek => (monday, today),
            Self::LastWeek => (monday - Duration::days(7), monday - Duration::days(1)),
            Self::LastTwoWeeks => (monday - Duration::days(14), today),
            Self::LastFourWeeks => (monday - Duration::days(28), today),
            Self::Custom(from, to) => (from, to),
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::CurrentWeek => "Current Week".to_string(),
            Self::LastWeek => "Last Week".to_string(),
            Self::LastTwoWeeks => "Last 2 Weeks".to_string(),
            Self::LastFourWeeks => "Last 4 Weeks".to_string(),
            Self::Custom(from, to) => format!("{from} to {to}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
