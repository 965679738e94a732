//! Per-customer rollups.

use std::collections::HashMap;

use serde::Serialize;

use crate::records::{Priority, Ticket};

/// Weight of each open ticket in the risk score.
const OPEN_WEIGHT: f64 = 2.0;
/// Extra weight of each open high-priority ticket.
const HIGH_OPEN_WEIGHT: f64 = 3.0;
/// Rework cost per risk point.
const COST_PER_POINT: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRow {
    pub customer: String,
    pub ticket_count: usize,
    pub open_count: usize,
    pub high_priority_open: usize,
    pub total_rework_cost: f64,
    pub total_cost_avoided: f64,
    pub risk_score: f64,
}

impl CustomerRow {
    fn new(customer: String) -> Self {
        Self {
            customer,
            ticket_count: 0,
            open_count: 0,
            high_priority_open: 0,
            total_rework_cost: 0.0,
            total_cost_avoided: 0.0,
            risk_score: 0.0,
        }
    }
}

/// `open × 2 + open high-priority × 3 + rework cost / 1000`.
pub fn risk_score(open_count: usize, high_priority_open: usize, rework_cost: f64) -> f64 {
    open_count as f64 * OPEN_WEIGHT
        + high_priority_open as f64 * HIGH_OPEN_WEIGHT
        + rework_cost / COST_PER_POINT
}

/// Group tickets by customer; missing customers are grouped under
/// `"Unspecified"`.
///
/// Ordered by descending ticket count, ties by customer name.
pub fn rollup<'a, I>(records: I) -> Vec<CustomerRow>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let mut groups: HashMap<&'a str, CustomerRow> = HashMap::new();
    for ticket in records {
        let row = groups
            .entry(ticket.customer_label())
            .or_insert_with_key(|name| CustomerRow::new(name.to_string()));
        row.ticket_count += 1;
        row.total_rework_cost += ticket.rework_cost;
        row.total_cost_avoided += ticket.cost_avoided;
        if ticket.is_open() {
            row.open_count += 1;
            if ticket.priority == Priority::High {
                row.high_priority_open += 1;
            }
        }
    }

    let mut rows: Vec<CustomerRow> = groups
        .into_values()
        .map(|mut row| {
            row.risk_score = risk_score(row.open_count, row.high_priority_open, row.total_rework_cost);
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        b.ticket_count
            .cmp(&a.ticket_count)
            .then_with(|| a.customer.cmp(&b.customer))
    });
    rows
}

/// Top `n` customers by risk score, ties by ticket count then name.
pub fn highest_risk(rows: &[CustomerRow], n: usize) -> Vec<CustomerRow> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| b.ticket_count.cmp(&a.ticket_count))
            .then_with(|| a.customer.cmp(&b.customer))
    });
    ranked.truncate(n);
    ranked
}
