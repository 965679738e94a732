//! Headline KPIs for a (filtered) ticket set.

use chrono::NaiveDate;
use serde::Serialize;

use super::Ratio;
use crate::records::{DataQuality, Ticket};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub open: usize,
    pub closed: usize,
    /// Open tickets as a percentage of all tickets.
    pub open_rate: Ratio,
    pub total_rework_cost: f64,
    pub total_cost_avoided: f64,
    pub net_value: f64,
    pub total_quantity: u64,
    pub first_submitted: Option<NaiveDate>,
    pub last_submitted: Option<NaiveDate>,
    pub quality: DataQuality,
}

pub fn summarize<'a, I>(records: I) -> Summary
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let tickets: Vec<&Ticket> = records.into_iter().collect();

    let open = tickets.iter().filter(|t| t.is_open()).count();
    let total_rework_cost: f64 = tickets.iter().map(|t| t.rework_cost).sum();
    let total_cost_avoided: f64 = tickets.iter().map(|t| t.cost_avoided).sum();
    let dates = tickets.iter().filter_map(|t| t.submitted_date());

    Summary {
        total: tickets.len(),
        open,
        closed: tickets.len() - open,
        open_rate: Ratio::percent(open as f64, tickets.len() as f64),
        total_rework_cost,
        total_cost_avoided,
        net_value: total_cost_avoided - total_rework_cost,
        total_quantity: tickets
            .iter()
            .map(|t| t.quantity_affected)
            .fold(0, u64::saturating_add),
        first_submitted: dates.clone().min(),
        last_submitted: dates.max(),
        quality: DataQuality::from_records(tickets.iter().copied()),
    }
}
