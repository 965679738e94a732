//! Derived-metrics layer shared by every dashboard view.
//!
//! Each submodule is a set of pure functions over borrowed tickets:
//! - **tally**: status / priority counts and joint group-by rollups
//! - **aging**: open-ticket age buckets and per-priority age statistics
//! - **cost**: rework vs. avoided cost by category or time period
//! - **customer**: per-customer counts, costs and risk score
//! - **pareto**: issue-type ranking with the 80/20 "vital few" cut
//! - **summary**: headline KPIs for the filtered set
//!
//! Aggregators accept any `IntoIterator<Item = &Ticket>`, so callers can pass
//! a `&RecordSet`, a `&[Ticket]`, or an iterator adapter such as
//! `records.iter().filter(|t| t.is_open())`. Zero input rows always yield an
//! empty table, never an error.

pub mod aging;
pub mod cost;
pub mod customer;
pub mod pareto;
pub mod summary;
pub mod tally;

use std::fmt;

use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Ratios
// ---------------------------------------------------------------------------

/// A derived ratio whose denominator may be zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Value(f64),
    /// Denominator was zero. Displays as `N/A`, serializes as JSON `null`.
    Undefined,
}

impl Ratio {
    pub fn of(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Self::Undefined
        } else {
            Self::Value(numerator / denominator)
        }
    }

    /// `numerator / denominator * 100`.
    pub fn percent(numerator: f64, denominator: f64) -> Self {
        match Self::of(numerator, denominator) {
            Self::Value(v) => Self::Value(v * 100.0),
            Self::Undefined => Self::Undefined,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Undefined => None,
        }
    }

    pub fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{:.2}", v),
            Self::Undefined => f.write_str("N/A"),
        }
    }
}

impl Serialize for Ratio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::Undefined => serializer.serialize_none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// `count / total * 100`, 0.0 when `total` is zero.
pub fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

/// Round to one decimal place for display.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Summary statistics over a list of integer day counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgeStats {
    pub mean: f64,
    pub median: f64,
    pub max: i64,
}

impl AgeStats {
    /// `None` for an empty list.
    pub fn from_days(days: &[i64]) -> Option<Self> {
        if days.is_empty() {
            return None;
        }
        let mut sorted = days.to_vec();
        sorted.sort_unstable();

        let n = sorted.len();
        let mean = sorted.iter().sum::<i64>() as f64 / n as f64;
        let median = if n % 2 == 1 {
            sorted[n / 2] as f64
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) as f64 / 2.0
        };

        Some(Self {
            mean,
            median,
            max: sorted[n - 1],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
