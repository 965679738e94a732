//! Pareto (80/20) ranking of issue types.
//!
//! Issue types are ranked by descending count. Equal counts keep the order
//! in which the issue type first appeared in the input, because that order
//! decides which category crosses the threshold first.

use std::collections::HashMap;

use serde::Serialize;

use super::pct;
use crate::records::Ticket;

/// Cumulative share at which the "vital few" prefix ends.
pub const DEFAULT_THRESHOLD_PCT: f64 = 80.0;

/// Absorbs float noise when comparing cumulative shares to the threshold.
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoRow {
    pub issue_type: String,
    pub count: usize,
    pub pct_of_total: f64,
    pub cumulative_pct: f64,
    /// Part of the minimal prefix whose cumulative share reaches the threshold.
    pub vital_few: bool,
}

/// Rank with the default 80% threshold.
pub fn rank<'a, I>(records: I) -> Vec<ParetoRow>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    rank_with_threshold(records, DEFAULT_THRESHOLD_PCT)
}

pub fn rank_with_threshold<'a, I>(records: I, threshold_pct: f64) -> Vec<ParetoRow>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    // First-occurrence order is kept by the Vec; the index only finds slots.
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    for ticket in records {
        let issue = ticket.issue_type_label();
        match slots.get(issue) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(issue, counts.len());
                counts.push((issue, 1));
            }
        }
    }

    // Stable: equal counts stay in first-occurrence order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let mut running = 0;
    let mut reached = false;

    counts
        .into_iter()
        .map(|(issue, count)| {
            running += count;
            let cumulative_pct = pct(running, total);
            let vital_few = !reached;
            reached = reached || cumulative_pct + EPSILON >= threshold_pct;
            ParetoRow {
                issue_type: issue.to_string(),
                count,
                pct_of_total: pct(count, total),
                cumulative_pct,
                vital_few,
            }
        })
        .collect()
}

/// Issue types in the vital-few prefix.
pub fn vital_few(rows: &[ParetoRow]) -> Vec<&str> {
    rows.iter()
        .filter(|r| r.vital_few)
        .map(|r| r.issue_type.as_str())
        .collect()
}
