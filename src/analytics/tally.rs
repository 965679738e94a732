//! Status / priority tallies and joint group-by rollups.

use std::collections::HashMap;

use serde::Serialize;

use super::{Ratio, pct};
use crate::records::{Field, Ticket};

// ---------------------------------------------------------------------------
// Tally
// ---------------------------------------------------------------------------

/// Count of one category value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
    /// Share of the whole input, `count / total * 100`.
    pub pct: f64,
}

/// Distinct-value counts for one field.
///
/// Entries are ordered by descending count, ties by label.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tally {
    pub field: Option<&'static str>,
    pub total: usize,
    pub entries: Vec<CategoryCount>,
}

impl Tally {
    /// Count for a label, 0 if absent.
    pub fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map_or(0, |e| e.count)
    }
}

/// Count each distinct value of `field`. Missing values are counted under
/// `"Unspecified"`.
pub fn tally<'a, I>(records: I, field: Field) -> Tally
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    let mut total = 0;
    for ticket in records {
        *counts.entry(field.value(ticket)).or_default() += 1;
        total += 1;
    }

    let mut entries: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
            pct: pct(count, total),
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));

    Tally {
        field: Some(field.header()),
        total,
        entries,
    }
}

// ---------------------------------------------------------------------------
// Group rollup
// ---------------------------------------------------------------------------

/// One combination of key values with its counts and sums.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    /// Key values in the order the key fields were requested.
    pub keys: Vec<String>,
    pub count: usize,
    pub total_rework_cost: f64,
    pub total_quantity: u64,
    /// Share of the whole input, not of the group.
    pub pct: f64,
    /// Tickets in this group whose rework cost or quantity was defaulted.
    pub coerced: usize,
}

impl GroupRow {
    /// True if any summed value in this row came from a defaulted field.
    pub fn is_partial(&self) -> bool {
        self.coerced > 0
    }
}

/// Group by the combination of `key_fields` values actually present.
///
/// Rows are ordered by descending count, then lexicographically by key.
pub fn group_rollup<'a, I>(records: I, key_fields: &[Field]) -> Vec<GroupRow>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut groups: HashMap<Vec<&'a str>, GroupRow> = HashMap::new();
    let mut total = 0;

    for ticket in records {
        total += 1;
        let key: Vec<&str> = key_fields.iter().map(|f| f.value(ticket)).collect();
        let row = groups.entry(key).or_insert_with_key(|key| GroupRow {
            keys: key.iter().map(|s| s.to_string()).collect(),
            count: 0,
            total_rework_cost: 0.0,
            total_quantity: 0,
            pct: 0.0,
            coerced: 0,
        });
        row.count += 1;
        row.total_rework_cost += ticket.rework_cost;
        row.total_quantity = row.total_quantity.saturating_add(ticket.quantity_affected);
        if ticket.flags.rework_cost || ticket.flags.quantity_affected {
            row.coerced += 1;
        }
    }

    let mut rows: Vec<GroupRow> = groups
        .into_values()
        .map(|mut row| {
            row.pct = pct(row.count, total);
            row
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keys.cmp(&b.keys)));
    rows
}

// ---------------------------------------------------------------------------
// Status overview
// ---------------------------------------------------------------------------

/// Key fields of [`StatusOverview::open_breakdown`].
pub const OPEN_BREAKDOWN_FIELDS: [Field; 2] = [Field::Status, Field::Priority];

/// Everything the status tracker view shows.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOverview {
    pub by_status: Tally,
    pub open_count: usize,
    /// Open tickets as a percentage of all tickets.
    pub open_rate: Ratio,
    pub open_by_priority: Tally,
    pub open_by_origin: Tally,
    /// Open tickets grouped by status × priority.
    pub open_breakdown: Vec<GroupRow>,
}

/// Build the status overview.
///
/// `by_status` and `open_rate` cover every ticket. The priority, origin and
/// breakdown tallies cover open tickets only, so their percentages are
/// shares of the open subset.
pub fn status_overview(records: &[Ticket]) -> StatusOverview {
    let open: Vec<&Ticket> = records.iter().filter(|t| t.is_open()).collect();

    StatusOverview {
        by_status: tally(records, Field::Status),
        open_count: open.len(),
        open_rate: Ratio::percent(open.len() as f64, records.len() as f64),
        open_by_priority: tally(open.iter().copied(), Field::Priority),
        open_by_origin: tally(open.iter().copied(), Field::Origin),
        open_breakdown: group_rollup(open.iter().copied(), &OPEN_BREAKDOWN_FIELDS),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Priority, Status};

    fn ticket(id: &str, status: Status, priority: Priority, cost: f64) -> Ticket {
        Ticket {
            status,
            priority,
            rework_cost: cost,
            quantity_affected: 10,
            ..Ticket::new(id)
        }
    }

    fn sample() -> Vec<Ticket> {
        vec![
            ticket("1", Status::Open, Priority::High, 100.0),
            ticket("2", Status::Open, Priority::Low, 50.0),
            ticket("3", Status::Closed, Priority::High, 25.0),
            ticket("4", Status::InProgress, Priority::High, 10.0),
            ticket("5", Status::Unspecified, Priority::Unspecified, 0.0),
        ]
    }

    #[test]
    fn tally_counts_and_orders() {
        let t = tally(&sample(), Field::Status);
        assert_eq!(t.total, 5);
        assert_eq!(t.entries[0].label, "Open");
        assert_eq!(t.entries[0].count, 2);
        assert_eq!(t.entries[0].pct, 40.0);
        // Ties ordered by label.
        let rest: Vec<&str> = t.entries[1..].iter().map(|e| e.label.as_str()).collect();
        assert_eq!(rest, vec!["Closed", "In Progress", "Unspecified"]);
    }

    #[test]
    fn tally_empty_input() {
        let t = tally(&Vec::<Ticket>::new(), Field::Priority);
        assert_eq!(t.total, 0);
        assert!(t.entries.is_empty());
    }

    #[test]
    fn group_rollup_sums_and_sorts() {
        let rows = group_rollup(&sample(), &[Field::Status, Field::Priority]);
        assert_eq!(rows.len(), 5);
        // All groups have count 1, so order is purely lexicographic by key.
        assert_eq!(rows[0].keys, vec!["Closed", "High"]);
        assert_eq!(rows[1].keys, vec!["In Progress", "High"]);
        assert_eq!(rows[2].keys, vec!["Open", "High"]);
        assert_eq!(rows[2].total_rework_cost, 100.0);
        assert_eq!(rows[2].pct, 20.0);
    }

    #[test]
    fn group_rollup_by_status_partitions_input() {
        let records = sample();
        let rows = group_rollup(&records, &[Field::Status]);
        let sum: usize = rows.iter().map(|r| r.count).sum();
        assert_eq!(sum, records.len());
        assert_eq!(rows[0].keys, vec!["Open"]);
        assert_eq!(rows[0].total_quantity, 20);
    }

    #[test]
    fn group_rollup_quantity_saturates() {
        let mut records = sample();
        records[0].quantity_affected = u64::MAX;
        let rows = group_rollup(&records, &[Field::Status]);
        assert_eq!(rows[0].keys, vec!["Open"]);
        assert_eq!(rows[0].total_quantity, u64::MAX);
    }

    #[test]
    fn group_rollup_marks_partial_groups() {
        let mut records = sample();
        records[0].flags.rework_cost = true;
        let rows = group_rollup(&records, &[Field::Status]);
        let open = rows.iter().find(|r| r.keys == ["Open"]).unwrap();
        assert!(open.is_partial());
        assert_eq!(open.coerced, 1);
    }

    #[test]
    fn status_overview_restricts_breakdowns_to_open() {
        let overview = status_overview(&sample());
        assert_eq!(overview.by_status.total, 5);
        assert_eq!(overview.open_count, 4);
        assert_eq!(overview.open_rate, Ratio::Value(80.0));
        assert_eq!(overview.open_by_priority.count("High"), 2);
        assert_eq!(overview.open_by_priority.total, 4);
        // Shares of the open subset, not of all five tickets.
        let high = overview.open_by_priority.entries.iter().find(|e| e.label == "High").unwrap();
        assert_eq!(high.pct, 50.0);
        assert_eq!(overview.open_breakdown[0].pct, 25.0);
        assert!(overview.open_breakdown.iter().all(|r| r.keys[0] != "Closed"));
    }

    #[test]
    fn status_overview_of_nothing() {
        let overview = status_overview(&[]);
        assert_eq!(overview.open_count, 0);
        assert!(overview.open_rate.is_undefined());
        assert!(overview.open_breakdown.is_empty());
    }
}
