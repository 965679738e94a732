//! Flat-file export of tickets and derived tables.
//!
//! Every view is first flattened into a [`Table`] (header row plus string
//! cells in declared column order), then serialized with the `csv` writer.
//! Currency cells are plain decimals with two fraction digits and no
//! thousands separators; undefined ratios are written as `N/A`.

use std::io::Write;

use crate::analytics::aging::{AgingSummary, PriorityAgingRow};
use crate::analytics::cost::{CostRow, GroupBy};
use crate::analytics::customer::CustomerRow;
use crate::analytics::pareto::ParetoRow;
use crate::analytics::summary::Summary;
use crate::analytics::tally::{GroupRow, Tally};
use crate::records::{Field, Ticket};
use crate::utils::{format_timestamp, plain_currency};

/// Column order for ticket exports, matching the source sheet headers.
pub const TICKET_HEADERS: [&str; 10] = [
    "NC Number",
    "Date Submitted",
    "Status",
    "Priority",
    "External Or Internal",
    "Customer",
    "Issue Type",
    "Cost of Rework",
    "Cost Avoided",
    "Total Quantity Affected",
];

/// A header row plus rows of already-formatted cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the header row and all rows as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Write several tables as consecutive CSV sections separated by a blank
/// line. A single table is written exactly as [`Table::write_csv`] would.
pub fn write_tables<W: Write>(tables: &[Table], mut writer: W) -> Result<(), csv::Error> {
    for (i, table) in tables.iter().enumerate() {
        if i > 0 {
            writer.write_all(b"\n")?;
        }
        table.write_csv(&mut writer)?;
    }
    Ok(())
}

pub fn tables_to_csv(tables: &[Table]) -> Result<String, csv::Error> {
    let mut buf = Vec::new();
    write_tables(tables, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Ticket rows under the sheet headers, followed by every unmodelled source
/// column in first-seen order. Missing cells are left empty.
pub fn tickets<'a, I>(records: I) -> Table
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let records: Vec<&Ticket> = records.into_iter().collect();
    let mut extra_columns: Vec<&str> = Vec::new();
    for (column, _) in records.iter().flat_map(|t| &t.extra) {
        if !extra_columns.contains(&column.as_str()) {
            extra_columns.push(column);
        }
    }

    let mut table = Table::new(TICKET_HEADERS.iter().copied().chain(extra_columns.iter().copied()));
    for t in &records {
        let mut cells = vec![
            t.id.clone(),
            format_timestamp(t.submitted_at),
            t.status.to_string(),
            t.priority.to_string(),
            t.origin.to_string(),
            t.customer.clone().unwrap_or_default(),
            t.issue_type.clone().unwrap_or_default(),
            plain_currency(t.rework_cost),
            plain_currency(t.cost_avoided),
            t.quantity_affected.to_string(),
        ];
        cells.extend(
            extra_columns
                .iter()
                .map(|column| t.extra_value(column).unwrap_or_default().to_string()),
        );
        table.push(cells);
    }
    table
}

pub fn tally(tally: &Tally) -> Table {
    let mut table = Table::new([tally.field.unwrap_or("Value"), "Count", "Percent"]);
    for entry in &tally.entries {
        table.push(vec![
            entry.label.clone(),
            entry.count.to_string(),
            format!("{:.1}", entry.pct),
        ]);
    }
    table
}

pub fn group_rows(rows: &[GroupRow], key_fields: &[Field]) -> Table {
    let headers = key_fields
        .iter()
        .map(|f| f.header())
        .chain(["Count", "Total Rework Cost", "Total Quantity Affected", "Percent"]);
    let mut table = Table::new(headers);
    for row in rows {
        let mut cells = row.keys.clone();
        cells.extend([
            row.count.to_string(),
            plain_currency(row.total_rework_cost),
            row.total_quantity.to_string(),
            format!("{:.1}", row.pct),
        ]);
        table.push(cells);
    }
    table
}

pub fn aging(summary: &AgingSummary) -> Table {
    let mut table = Table::new(["Age Bucket", "Count", "Mean Age", "Median Age", "Max Age"]);
    for row in &summary.buckets {
        table.push(vec![
            row.label.to_string(),
            row.count.to_string(),
            optional(row.mean_age.map(|d| format!("{d:.1}"))),
            optional(row.median_age.map(|d| format!("{d:.1}"))),
            optional(row.max_age.map(|d| d.to_string())),
        ]);
    }
    table
}

pub fn priority_aging(rows: &[PriorityAgingRow]) -> Table {
    let mut table = Table::new(["Priority", "Count", "Mean Age", "Median Age", "Max Age"]);
    for row in rows {
        table.push(vec![
            row.priority.to_string(),
            row.count.to_string(),
            format!("{:.1}", row.mean_age),
            format!("{:.1}", row.median_age),
            row.max_age.to_string(),
        ]);
    }
    table
}

pub fn cost(rows: &[CostRow], group_by: GroupBy) -> Table {
    let mut table = Table::new([
        group_by.header(),
        "Tickets",
        "Total Rework Cost",
        "Total Cost Avoided",
        "Net Value",
        "Avg Rework per Ticket",
        "Avg Avoided per Ticket",
    ]);
    for row in rows {
        table.push(vec![
            row.group_key.clone(),
            row.ticket_count.to_string(),
            plain_currency(row.total_rework_cost),
            plain_currency(row.total_cost_avoided),
            plain_currency(row.net_value),
            row.avg_rework_per_ticket.to_string(),
            row.avg_avoided_per_ticket.to_string(),
        ]);
    }
    table
}

pub fn customers(rows: &[CustomerRow]) -> Table {
    let mut table = Table::new([
        "Customer",
        "Tickets",
        "Open",
        "High Priority Open",
        "Total Rework Cost",
        "Total Cost Avoided",
        "Risk Score",
    ]);
    for row in rows {
        table.push(vec![
            row.customer.clone(),
            row.ticket_count.to_string(),
            row.open_count.to_string(),
            row.high_priority_open.to_string(),
            plain_currency(row.total_rework_cost),
            plain_currency(row.total_cost_avoided),
            format!("{:.2}", row.risk_score),
        ]);
    }
    table
}

pub fn pareto(rows: &[ParetoRow]) -> Table {
    let mut table = Table::new([
        "Issue Type",
        "Count",
        "Percent of Total",
        "Cumulative Percent",
        "Vital Few",
    ]);
    for row in rows {
        table.push(vec![
            row.issue_type.clone(),
            row.count.to_string(),
            format!("{:.1}", row.pct_of_total),
            format!("{:.1}", row.cumulative_pct),
            if row.vital_few { "yes" } else { "no" }.to_string(),
        ]);
    }
    table
}

/// Headline KPIs as a two-column metric/value table.
pub fn summary(summary: &Summary) -> Table {
    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    let mut table = Table::new(["Metric", "Value"]);
    for (metric, value) in [
        ("Total Tickets", summary.total.to_string()),
        ("Open", summary.open.to_string()),
        ("Closed", summary.closed.to_string()),
        ("Open Rate", summary.open_rate.to_string()),
        ("Total Rework Cost", plain_currency(summary.total_rework_cost)),
        ("Total Cost Avoided", plain_currency(summary.total_cost_avoided)),
        ("Net Value", plain_currency(summary.net_value)),
        ("Total Quantity Affected", summary.total_quantity.to_string()),
        ("First Submitted", date(summary.first_submitted)),
        ("Last Submitted", date(summary.last_submitted)),
        ("Rows With Coerced Values", summary.quality.coerced_rows.to_string()),
    ] {
        table.push(vec![metric.to_string(), value]);
    }
    table
}

fn optional(cell: Option<String>) -> String {
    cell.unwrap_or_else(|| "N/A".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{self, Ratio};
    use crate::records::{CoercionFlags, Priority, Status};
    use chrono::NaiveDate;

    fn ticket(id: &str, customer: Option<&str>, cost: f64) -> Ticket {
        Ticket {
            submitted_at: NaiveDate::from_ymd_opt(2024, 6, 3).and_then(|d| d.and_hms_opt(9, 30, 0)),
            status: Status::Open,
            priority: Priority::High,
            customer: customer.map(str::to_string),
            issue_type: Some("Print Defect".into()),
            rework_cost: cost,
            quantity_affected: 1200,
            ..Ticket::new(id)
        }
    }

    #[test]
    fn ticket_export_uses_sheet_headers_and_plain_currency() {
        let records = vec![ticket("NC-1", Some("Acme, Inc."), 1234.5), ticket("NC-2", None, 0.0)];
        let csv = tickets(&records).to_csv().unwrap();
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some(TICKET_HEADERS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("NC-1,2024-06-03 09:30:00,Open,High,Unspecified,\"Acme, Inc.\",Print Defect,1234.50,0.00,1200")
        );
        assert_eq!(
            lines.next(),
            Some("NC-2,2024-06-03 09:30:00,Open,High,Unspecified,,Print Defect,0.00,0.00,1200")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn ticket_export_appends_extra_columns_in_first_seen_order() {
        let mut first = ticket("NC-1", None, 10.0);
        first.extra = vec![("Defect Summary".into(), "Smudged ink".into())];
        let mut second = ticket("NC-2", None, 20.0);
        second.extra = vec![
            ("Employee Responsible".into(), "A. Chen".into()),
            ("Defect Summary".into(), "Torn label".into()),
        ];
        let third = ticket("NC-3", None, 30.0);

        let table = tickets(&[first, second, third]);
        assert_eq!(table.headers.len(), TICKET_HEADERS.len() + 2);
        assert_eq!(&table.headers[10..], ["Defect Summary", "Employee Responsible"]);
        assert_eq!(&table.rows[0][10..], ["Smudged ink", ""]);
        assert_eq!(&table.rows[1][10..], ["Torn label", "A. Chen"]);
        assert_eq!(&table.rows[2][10..], ["", ""]);
    }

    #[test]
    fn sections_are_separated_by_a_blank_line() {
        let mut first = Table::new(["A"]);
        first.push(vec!["1".into()]);
        let second = Table::new(["B", "C"]);
        assert_eq!(tables_to_csv(&[first.clone()]).unwrap(), first.to_csv().unwrap());
        assert_eq!(tables_to_csv(&[first, second]).unwrap(), "A\n1\n\nB,C\n");
    }

    #[test]
    fn priority_aging_formats_stats() {
        let rows = vec![PriorityAgingRow {
            priority: Priority::High,
            count: 2,
            mean_age: 4.5,
            median_age: 4.5,
            max_age: 7,
        }];
        let table = priority_aging(&rows);
        assert_eq!(table.headers[0], "Priority");
        assert_eq!(table.rows[0], vec!["High", "2", "4.5", "4.5", "7"]);
    }

    #[test]
    fn empty_views_still_have_headers() {
        let csv = pareto(&[]).to_csv().unwrap();
        assert_eq!(csv, "Issue Type,Count,Percent of Total,Cumulative Percent,Vital Few\n");
    }

    #[test]
    fn undefined_ratios_export_as_na() {
        let row = CostRow {
            group_key: "Empty".into(),
            ticket_count: 0,
            total_rework_cost: 0.0,
            total_cost_avoided: 0.0,
            net_value: 0.0,
            avg_rework_per_ticket: Ratio::Undefined,
            avg_avoided_per_ticket: Ratio::Value(12.5),
            coerced: 0,
        };
        let table = cost(&[row], GroupBy::Month);
        assert_eq!(table.headers[0], "Month");
        assert_eq!(table.rows[0][5], "N/A");
        assert_eq!(table.rows[0][6], "12.50");
    }

    #[test]
    fn pareto_export_marks_vital_few() {
        let records: Vec<Ticket> = ["A", "A", "B"]
            .iter()
            .enumerate()
            .map(|(i, issue)| Ticket {
                issue_type: Some(issue.to_string()),
                ..Ticket::new(i.to_string())
            })
            .collect();
        let table = pareto(&analytics::pareto::rank(&records));
        assert_eq!(table.rows[0], vec!["A", "2", "66.7", "66.7", "yes"]);
        assert_eq!(table.rows[1], vec!["B", "1", "33.3", "100.0", "yes"]);
    }

    #[test]
    fn group_rows_prefix_key_headers() {
        let records = vec![Ticket {
            flags: CoercionFlags {
                rework_cost: true,
                ..CoercionFlags::default()
            },
            ..ticket("NC-1", None, 0.0)
        }];
        let fields = [Field::Status, Field::Priority];
        let rows = analytics::tally::group_rollup(&records, &fields);
        let table = group_rows(&rows, &fields);
        assert_eq!(&table.headers[..3], ["Status", "Priority", "Count"]);
        assert_eq!(table.rows[0], vec!["Open", "High", "1", "0.00", "1200", "100.0"]);
    }
}
