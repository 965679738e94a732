//! Dashboard views: one payload per dashboard screen.
//!
//! Each view is computed from the filtered tickets only. The same payload
//! backs `--format json` and the web API; [`View::tables`] flattens it for
//! CSV output and exports.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::analytics::aging::{self, AgingSummary, PriorityAgingRow};
use crate::analytics::cost::{self, CostRow, GroupBy};
use crate::analytics::customer::{self, CustomerRow};
use crate::analytics::pareto::{self, ParetoRow};
use crate::analytics::summary::{self, Summary};
use crate::analytics::tally::{self, OPEN_BREAKDOWN_FIELDS, StatusOverview, Tally};
use crate::analytics::Ratio;
use crate::export::{self, Table};
use crate::filter::Period;
use crate::records::{DataQuality, Field, Ticket};

/// How many customers the risk list shows.
const RISK_LIST_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Summary,
    Status,
    Aging,
    Cost(GroupBy),
    Customers,
    Pareto,
    Tickets,
}

impl View {
    /// Parse a view name; `group_by` only applies to `cost` and defaults to
    /// issue type.
    pub fn parse(name: &str, group_by: Option<&str>) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "summary" | "overview" => Some(Self::Summary),
            "status" => Some(Self::Status),
            "aging" => Some(Self::Aging),
            "cost" | "costs" => {
                let group_by = match group_by {
                    Some(raw) => GroupBy::parse(raw)?,
                    None => GroupBy::Field(Field::IssueType),
                };
                Some(Self::Cost(group_by))
            }
            "customers" | "customer" => Some(Self::Customers),
            "pareto" => Some(Self::Pareto),
            "tickets" | "records" => Some(Self::Tickets),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Status => "status",
            Self::Aging => "aging",
            Self::Cost(_) => "cost",
            Self::Customers => "customers",
            Self::Pareto => "pareto",
            Self::Tickets => "tickets",
        }
    }

    /// Compute the view's payload.
    pub fn build(self, ctx: &ViewContext<'_>) -> ViewData {
        let records = ctx.records;
        match self {
            Self::Summary => ViewData::Summary(summary::summarize(records)),
            Self::Status => ViewData::Status(StatusView {
                overview: tally::status_overview(records),
                by_priority: tally::tally(records, Field::Priority),
                by_origin: tally::tally(records, Field::Origin),
            }),
            Self::Aging => ViewData::Aging(AgingView {
                now: ctx.now,
                buckets: aging::bucket_summary(records, ctx.now),
                by_priority: aging::priority_summary(records, ctx.now),
            }),
            Self::Cost(group_by) => ViewData::Cost(CostView {
                grouping: group_by,
                group_by: group_by.header(),
                rows: cost::rollup(records, group_by),
                totals: cost::totals(records),
                cost_efficiency: cost::cost_efficiency(records),
            }),
            Self::Customers => {
                let rows = customer::rollup(records);
                ViewData::Customers(CustomersView {
                    highest_risk: customer::highest_risk(&rows, RISK_LIST_LEN),
                    rows,
                })
            }
            Self::Pareto => {
                let rows = pareto::rank_with_threshold(records, ctx.pareto_threshold);
                ViewData::Pareto(ParetoView {
                    threshold_pct: ctx.pareto_threshold,
                    vital_few: pareto::vital_few(&rows).into_iter().map(str::to_string).collect(),
                    rows,
                })
            }
            Self::Tickets => ViewData::Tickets(records.to_vec()),
        }
    }

    /// The payload wrapped with record count and data-quality footnote.
    pub fn payload(self, ctx: &ViewContext<'_>) -> ViewPayload {
        let quality = DataQuality::from_records(ctx.records);
        ViewPayload {
            view: self.name(),
            period: ctx.period.map(Period::label),
            records: ctx.records.len(),
            footnote: quality.footnote(),
            quality,
            data: self.build(ctx),
        }
    }

    /// The view's primary table.
    pub fn table(self, ctx: &ViewContext<'_>) -> Table {
        self.build(ctx).table()
    }

    /// The primary table followed by any secondary sections, for CSV output
    /// and export.
    pub fn tables(self, ctx: &ViewContext<'_>) -> Vec<Table> {
        self.build(ctx).tables()
    }
}

/// Inputs every view needs besides its own parameters.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    /// Already filtered.
    pub records: &'a [Ticket],
    pub now: NaiveDateTime,
    /// Date window the records were filtered to, if any.
    pub period: Option<Period>,
    pub pareto_threshold: f64,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub overview: StatusOverview,
    pub by_priority: Tally,
    pub by_origin: Tally,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgingView {
    pub now: NaiveDateTime,
    pub buckets: AgingSummary,
    pub by_priority: Vec<PriorityAgingRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostView {
    #[serde(skip)]
    pub grouping: GroupBy,
    pub group_by: &'static str,
    pub rows: Vec<CostRow>,
    pub totals: CostRow,
    pub cost_efficiency: Ratio,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomersView {
    pub rows: Vec<CustomerRow>,
    pub highest_risk: Vec<CustomerRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParetoView {
    pub threshold_pct: f64,
    pub rows: Vec<ParetoRow>,
    pub vital_few: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ViewData {
    Summary(Summary),
    Status(StatusView),
    Aging(AgingView),
    Cost(CostView),
    Customers(CustomersView),
    Pareto(ParetoView),
    Tickets(Vec<Ticket>),
}

impl ViewData {
    pub fn table(&self) -> Table {
        match self {
            Self::Summary(s) => export::summary(s),
            Self::Status(s) => export::tally(&s.overview.by_status),
            Self::Aging(a) => export::aging(&a.buckets),
            Self::Cost(c) => {
                let mut table = export::cost(&c.rows, c.grouping);
                table.rows.extend(export::cost(std::slice::from_ref(&c.totals), c.grouping).rows);
                table
            }
            Self::Customers(c) => export::customers(&c.rows),
            Self::Pareto(p) => export::pareto(&p.rows),
            Self::Tickets(t) => export::tickets(t),
        }
    }

    /// Primary table first. Status adds the open status × priority
    /// breakdown; aging adds per-priority age stats.
    pub fn tables(&self) -> Vec<Table> {
        let mut tables = vec![self.table()];
        match self {
            Self::Status(s) => {
                tables.push(export::group_rows(&s.overview.open_breakdown, &OPEN_BREAKDOWN_FIELDS));
            }
            Self::Aging(a) => tables.push(export::priority_aging(&a.by_priority)),
            _ => {}
        }
        tables
    }
}

/// JSON envelope for a view.
#[derive(Debug, Clone, Serialize)]
pub struct ViewPayload {
    pub view: &'static str,
    /// Label of the active date window, `null` when unbounded.
    pub period: Option<String>,
    pub records: usize,
    pub quality: DataQuality,
    pub footnote: Option<String>,
    pub data: ViewData,
}
