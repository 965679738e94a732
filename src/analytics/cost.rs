//! Rework cost and cost-avoided rollups.
//!
//! Groups by any categorical field or by calendar period of submission.
//! Missing or invalid amounts were already coerced to 0 by the normalizer;
//! each row reports how many of its tickets had a coerced amount so views
//! can mark the sums as partial.

use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::Ratio;
use crate::records::{Field, Ticket};

/// Rollup grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Field(Field),
    /// Calendar week of submission, starting Monday.
    Week,
    /// Calendar month of submission.
    Month,
}

impl GroupBy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "week" | "weekly" => Some(Self::Week),
            "month" | "monthly" => Some(Self::Month),
            other => Field::parse(other).map(Self::Field),
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            Self::Field(f) => f.header(),
            Self::Week => "Week Of",
            Self::Month => "Month",
        }
    }

    fn is_period(self) -> bool {
        matches!(self, Self::Week | Self::Month)
    }

    /// Group key for a ticket. Period groupings return `None` for undated
    /// tickets, which are left out of the rollup.
    fn key(self, ticket: &Ticket) -> Option<String> {
        match self {
            Self::Field(f) => Some(f.value(ticket).to_string()),
            Self::Week => ticket
                .submitted_date()
                .map(|d| week_start(d).format("%Y-%m-%d").to_string()),
            Self::Month => ticket.submitted_date().map(|d| d.format("%Y-%m").to_string()),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

// ---------------------------------------------------------------------------
// Rollup
// ---------------------------------------------------------------------------

/// Cost totals for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRow {
    pub group_key: String,
    pub ticket_count: usize,
    pub total_rework_cost: f64,
    pub total_cost_avoided: f64,
    /// `total_cost_avoided - total_rework_cost`.
    pub net_value: f64,
    pub avg_rework_per_ticket: Ratio,
    pub avg_avoided_per_ticket: Ratio,
    /// Tickets whose rework cost or cost avoided was coerced to 0.
    pub coerced: usize,
}

impl CostRow {
    fn new(group_key: String) -> Self {
        Self {
            group_key,
            ticket_count: 0,
            total_rework_cost: 0.0,
            total_cost_avoided: 0.0,
            net_value: 0.0,
            avg_rework_per_ticket: Ratio::Undefined,
            avg_avoided_per_ticket: Ratio::Undefined,
            coerced: 0,
        }
    }

    fn add(&mut self, ticket: &Ticket) {
        self.ticket_count += 1;
        self.total_rework_cost += ticket.rework_cost;
        self.total_cost_avoided += ticket.cost_avoided;
        if ticket.flags.cost() {
            self.coerced += 1;
        }
    }

    fn finish(mut self) -> Self {
        let n = self.ticket_count as f64;
        self.net_value = self.total_cost_avoided - self.total_rework_cost;
        self.avg_rework_per_ticket = Ratio::of(self.total_rework_cost, n);
        self.avg_avoided_per_ticket = Ratio::of(self.total_cost_avoided, n);
        self
    }

    pub fn is_partial(&self) -> bool {
        self.coerced > 0
    }
}

/// Sum costs per group.
///
/// Categorical groupings are ordered by descending rework cost, then key.
/// Period groupings are ordered chronologically.
pub fn rollup<'a, I>(records: I, group_by: GroupBy) -> Vec<CostRow>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut groups: HashMap<String, CostRow> = HashMap::new();
    for ticket in records {
        let Some(key) = group_by.key(ticket) else {
            continue;
        };
        groups
            .entry(key)
            .or_insert_with_key(|k| CostRow::new(k.clone()))
            .add(ticket);
    }

    let mut rows: Vec<CostRow> = groups.into_values().map(CostRow::finish).collect();
    if group_by.is_period() {
        rows.sort_by(|a, b| a.group_key.cmp(&b.group_key));
    } else {
        rows.sort_by(|a, b| {
            b.total_rework_cost
                .total_cmp(&a.total_rework_cost)
                .then_with(|| a.group_key.cmp(&b.group_key))
        });
    }
    rows
}

/// Grand totals across all input tickets, as a row keyed `"Total"`.
///
/// Averages are undefined for empty input.
pub fn totals<'a, I>(records: I) -> CostRow
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut row = CostRow::new("Total".to_string());
    for ticket in records {
        row.add(ticket);
    }
    row.finish()
}

/// Cost avoided per unit of rework cost. Undefined when there was no
/// rework cost.
pub fn cost_efficiency<'a, I>(records: I) -> Ratio
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let total = totals(records);
    Ratio::of(total.total_cost_avoided, total.total_rework_cost)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
