//! Deterministic sample data for demos and smoke tests.
//!
//! Rows use the same headers as the production sheet and deliberately
//! include the messes real exports have: blank customers, `N/A` costs and
//! an unparseable date.

use chrono::{Duration, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::Value;

use super::{DataSource, SourceError};
use crate::records::RawRow;

const STATUSES: &[&str] = &["Open", "In Progress", "Pending Review", "On Hold", "Closed", "Closed", "Closed"];
const PRIORITIES: &[&str] = &["High", "Medium", "Medium", "Low"];
const ORIGINS: &[&str] = &["External", "Internal"];
const CUSTOMERS: &[&str] = &["Acme Cannabis", "Green Leaf Co", "Summit Farms", "Northern Lights", ""];
const ISSUE_TYPES: &[&str] = &[
    "Print Defect",
    "Print Defect",
    "Print Defect",
    "Dimensional",
    "Dimensional",
    "Material Contamination",
    "Packaging Damage",
    "Labeling Error",
    "Color Mismatch",
];
const EMPLOYEES: &[&str] = &["J. Rivera", "A. Chen", "M. Okafor", "S. Patel"];

/// Uniform pick from a non-empty constant table.
fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct SampleSource {
    count: usize,
    /// Latest possible submission date; rows spread over the 120 days before.
    anchor: NaiveDate,
    seed: u64,
}

impl Default for SampleSource {
    fn default() -> Self {
        Self::new(150, Local::now().date_naive())
    }
}

impl SampleSource {
    pub fn new(count: usize, anchor: NaiveDate) -> Self {
        Self {
            count,
            anchor,
            seed: 42,
        }
    }

    pub fn rows(&self) -> Vec<RawRow> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..self.count)
            .map(|i| {
                let submitted = self.anchor - Duration::days(rng.gen_range(0..120));
                let mut row = RawRow::new();
                let mut put = |key: &str, value: String| {
                    row.insert(key.to_string(), Value::String(value));
                };

                put("NC Number", format!("NC-{:04}", 1001 + i));
                put(
                    "Date Submitted",
                    if i % 53 == 52 {
                        "pending".to_string()
                    } else {
                        format!("{} {:02}:{:02}:00", submitted.format("%m/%d/%Y"), rng.gen_range(7..17), rng.gen_range(0..60))
                    },
                );
                put("Status", pick(&mut rng, STATUSES).to_string());
                put("Priority", pick(&mut rng, PRIORITIES).to_string());
                put("External Or Internal", pick(&mut rng, ORIGINS).to_string());
                put("Customer", pick(&mut rng, CUSTOMERS).to_string());
                put("Issue Type", pick(&mut rng, ISSUE_TYPES).to_string());
                put("Employee Responsible", pick(&mut rng, EMPLOYEES).to_string());
                put(
                    "Cost of Rework",
                    if i % 31 == 30 {
                        "N/A".to_string()
                    } else {
                        format!("${}.{:02}", rng.gen_range(50..2550), rng.gen_range(0..100))
                    },
                );
                put("Cost Avoided", format!("{}.00", rng.gen_range(0..4000)));
                put("Total Quantity Affected", rng.gen_range(1..=5000u64).to_string());
                row
            })
            .collect()
    }
}

impl DataSource for SampleSource {
    fn fetch(&mut self) -> Result<Vec<RawRow>, SourceError> {
        Ok(self.rows())
    }

    fn describe(&self) -> String {
        format!("sample:{} rows", self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::normalize;

    #[test]
    fn sample_is_deterministic() {
        let anchor = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let a = SampleSource::new(20, anchor).rows();
        let b = SampleSource::new(20, anchor).rows();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn sample_cells_stay_in_range() {
        let anchor = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let set = normalize(&SampleSource::new(150, anchor).rows()).unwrap();
        let earliest = anchor - Duration::days(119);
        for t in set.iter() {
            assert!(t.submitted_date().is_none_or(|d| d >= earliest));
            assert!((1..=5000).contains(&t.quantity_affected));
            assert!(t.cost_avoided < 4000.0);
            assert!(t.flags.rework_cost || (50.0..2550.0).contains(&t.rework_cost));
        }
    }

    #[test]
    fn sample_normalizes_with_some_coercions() {
        let anchor = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let set = normalize(&SampleSource::new(150, anchor).rows()).unwrap();
        assert_eq!(set.len(), 150);
        let bad_cost = set.iter().filter(|t| t.flags.rework_cost).count();
        let bad_date = set.iter().filter(|t| t.flags.submitted_at).count();
        assert_eq!(bad_cost, 4);
        assert_eq!(bad_date, 2);
        assert!(set.iter().all(|t| t.submitted_date().is_none_or(|d| d <= anchor)));
    }
}
