//! CLI command implementations for the ncdash views and maintenance commands.
//!
//! Provides subcommand handlers for:
//! - `ncdash summary|status|aging|cost|customers|pareto|tickets`: one view each
//! - `ncdash export <view> [--output FILE]`: CSV of a view or the ticket list
//! - `ncdash refresh`: drop the fetch cache and reload
//! - `ncdash events`: recent entries from the event log
//! - `ncdash health`: config files, data source, event log
//! - `ncdash config show|init|set|reset`: configuration management
//! - `ncdash serve`: the JSON API

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use colored::Colorize;

use crate::analytics::aging::AgingSummary;
use crate::analytics::cost::GroupBy;
use crate::analytics::summary::Summary;
use crate::analytics::tally::Tally;
use crate::config;
use crate::dashboard::views::{AgingView, CostView, CustomersView, ParetoView, StatusView, ViewData};
use crate::dashboard::{Dashboard, View, ViewContext};
use crate::export::{self, Table};
use crate::filter::{self, PredicateSet};
use crate::logging::{EventEntry, EventLog};
use crate::records::{DataQuality, Ticket};
use crate::records::normalize::parse_datetime;
use crate::utils::{
    format_currency, format_days, format_number, format_percentage, format_ratio_currency,
    format_ratio_pct, format_timestamp, truncate,
};
use crate::web;

/// Tickets shown by the `tickets` table before eliding the rest.
const TICKET_TABLE_LIMIT: usize = 50;

/// Output format for view commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("csv") => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Everything a view command needs besides the dashboard itself.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub predicates: PredicateSet,
    pub now: NaiveDateTime,
    /// Overrides `pareto.threshold_pct` for this run.
    pub threshold: Option<f64>,
    pub format: OutputFormat,
}

/// Resolve `--now`, defaulting to the local clock.
pub fn parse_now(raw: Option<&str>) -> Result<NaiveDateTime> {
    match raw {
        Some(raw) => parse_datetime(raw).with_context(|| format!("invalid --now '{raw}'")),
        None => Ok(Local::now().naive_local()),
    }
}

/// Build predicates from `(flag, value)` pairs. Unset flags are skipped.
pub fn build_predicates(flags: &[(&str, Option<&str>)], now: NaiveDateTime) -> Result<PredicateSet> {
    let mut predicates = PredicateSet::default();
    for (key, value) in flags {
        if let Some(value) = value {
            predicates
                .set(key, value, now)
                .with_context(|| format!("invalid --{key}"))?;
        }
    }
    Ok(predicates)
}

/// One-line description of the active filters.
pub fn describe_filters(p: &PredicateSet) -> String {
    if p.is_empty() {
        return "all tickets".to_string();
    }
    let mut parts = Vec::new();
    match (p.window(), p.date_from, p.date_to) {
        (Some(period), _, _) => parts.push(period.label()),
        (None, Some(from), _) => parts.push(format!("from {from}")),
        (None, _, Some(to)) => parts.push(format!("through {to}")),
        (None, None, None) => {}
    }
    if let Some(status) = &p.status {
        parts.push(format!("status={status}"));
    }
    if let Some(priority) = &p.priority {
        parts.push(format!("priority={priority}"));
    }
    if let Some(origin) = &p.origin {
        parts.push(format!("origin={origin}"));
    }
    if let Some(customer) = &p.customer {
        parts.push(format!("customer={customer}"));
    }
    if let Some(search) = &p.search {
        parts.push(format!("search=\"{search}\""));
    }
    parts.join(", ")
}

// ---------------------------------------------------------------------------
// ncdash <view>
// ---------------------------------------------------------------------------

/// Load, filter and print one view.
pub fn run_view(dashboard: &mut Dashboard, view: View, opts: &ViewOptions) -> Result<()> {
    let records = dashboard.load()?;
    let filtered = filter::apply(records.as_slice(), &opts.predicates);
    let ctx = ViewContext {
        records: &filtered,
        now: opts.now,
        period: opts.predicates.window(),
        pareto_threshold: opts
            .threshold
            .unwrap_or(dashboard.config().pareto.threshold_pct),
    };

    match opts.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&view.payload(&ctx))?);
        }
        OutputFormat::Csv => print!("{}", export::tables_to_csv(&view.tables(&ctx))?),
        OutputFormat::Table => {
            if filtered.is_empty() {
                println!(
                    "{}",
                    format!("No tickets match {} ({} loaded).", describe_filters(&opts.predicates), records.len())
                        .yellow()
                );
                return Ok(());
            }
            print_view_table(view, &ctx, &opts.predicates);
        }
    }

    Ok(())
}

fn print_view_table(view: View, ctx: &ViewContext<'_>, predicates: &PredicateSet) {
    let title = match view {
        View::Summary => "NC Summary".to_string(),
        View::Status => "Status & Priority".to_string(),
        View::Aging => "Aging of Open Tickets".to_string(),
        View::Cost(group_by) => format!("Cost by {group_by}"),
        View::Customers => "Customer Rollup".to_string(),
        View::Pareto => "Pareto of Issue Types".to_string(),
        View::Tickets => "Tickets".to_string(),
    };
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {}",
        format!("{} tickets · {}", ctx.records.len(), describe_filters(predicates)).dimmed()
    );
    println!();

    match view.build(ctx) {
        ViewData::Summary(s) => print_summary(&s),
        ViewData::Status(s) => print_status(&s),
        ViewData::Aging(a) => print_aging(&a),
        ViewData::Cost(c) => print_cost(&c),
        ViewData::Customers(c) => print_customers(&c),
        ViewData::Pareto(p) => print_pareto(&p),
        ViewData::Tickets(t) => print_tickets(&t),
    }

    let quality = DataQuality::from_records(ctx.records);
    if let Some(note) = quality.footnote() {
        println!();
        println!("  {} {}", "Note:".yellow(), note.dimmed());
    }
}

fn print_summary(s: &Summary) {
    let range = match (s.first_submitted, s.last_submitted) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "N/A".to_string(),
    };
    println!("  {} {}", "Tickets:          ".bold(), format_number(s.total as u64));
    println!(
        "  {} {} ({} of total)",
        "Open:             ".bold(),
        format_number(s.open as u64),
        format_ratio_pct(s.open_rate)
    );
    println!("  {} {}", "Closed:           ".bold(), format_number(s.closed as u64));
    println!("  {} {}", "Rework cost:      ".bold(), format_currency(s.total_rework_cost));
    println!("  {} {}", "Cost avoided:     ".bold(), format_currency(s.total_cost_avoided));
    println!("  {} {}", "Net value:        ".bold(), colorize_amount(s.net_value));
    println!("  {} {}", "Quantity affected:".bold(), format_number(s.total_quantity));
    println!("  {} {}", "Submitted:        ".bold(), range);
}

fn print_tally(title: &str, tally: &Tally) {
    println!("{}", title.bold().cyan());
    println!("  {:<24} {:>8} {:>8}", tally.field.unwrap_or("Value"), "Count", "Share");
    println!("  {}", "-".repeat(42));
    for (i, entry) in tally.entries.iter().enumerate() {
        let line = format!(
            "  {:<24} {:>8} {:>8}",
            truncate(&entry.label, 24),
            entry.count,
            format_percentage(entry.pct)
        );
        print_striped(i, &line);
    }
    println!();
}

fn print_status(s: &StatusView) {
    print_tally("By Status", &s.overview.by_status);
    println!(
        "  {} {} ({})",
        "Open tickets:".bold(),
        s.overview.open_count,
        format_ratio_pct(s.overview.open_rate)
    );
    println!();
    print_tally("By Priority", &s.by_priority);
    print_tally("By Origin", &s.by_origin);

    if !s.overview.open_breakdown.is_empty() {
        println!("{}", "Open by Status × Priority".bold().cyan());
        println!(
            "  {:<16} {:<10} {:>6} {:>14} {:>10}",
            "Status", "Priority", "Count", "Rework", "Quantity"
        );
        println!("  {}", "-".repeat(60));
        for (i, row) in s.overview.open_breakdown.iter().enumerate() {
            let key = |n: usize| row.keys.get(n).map(String::as_str).unwrap_or("");
            let line = format!(
                "  {:<16} {:<10} {:>6} {:>14} {:>10}{}",
                truncate(key(0), 16),
                truncate(key(1), 10),
                row.count,
                format_currency(row.total_rework_cost),
                format_number(row.total_quantity),
                partial_marker(row.is_partial()),
            );
            print_striped(i, &line);
        }
    }
}

fn print_aging(a: &AgingView) {
    print_buckets(&a.buckets);

    if !a.by_priority.is_empty() {
        println!();
        println!("{}", "Open Age by Priority".bold().cyan());
        println!(
            "  {:<12} {:>6} {:>10} {:>10} {:>8}",
            "Priority", "Count", "Mean", "Median", "Max"
        );
        println!("  {}", "-".repeat(50));
        for (i, row) in a.by_priority.iter().enumerate() {
            let line = format!(
                "  {:<12} {:>6} {:>10.1} {:>10.1} {:>8}",
                row.priority.to_string(),
                row.count,
                row.mean_age,
                row.median_age,
                row.max_age
            );
            print_striped(i, &line);
        }
    }
}

fn print_buckets(summary: &AgingSummary) {
    println!(
        "  {:<14} {:>6} {:>10} {:>10} {:>8}",
        "Age (days)", "Count", "Mean", "Median", "Max"
    );
    println!("  {}", "-".repeat(52));
    for (i, row) in summary.buckets.iter().enumerate() {
        let line = format!(
            "  {:<14} {:>6} {:>10} {:>10} {:>8}",
            row.label,
            row.count,
            format_days(row.mean_age),
            format_days(row.median_age),
            row.max_age.map_or_else(|| "N/A".to_string(), |d| d.to_string()),
        );
        print_striped(i, &line);
    }
    println!();
    println!("  {} {}", "Open tickets:".bold(), summary.open_total);
    if summary.unknown_age > 0 {
        println!(
            "  {}",
            format!("{} open tickets have no usable submission date", summary.unknown_age).yellow()
        );
    }
    if summary.future_dated > 0 {
        println!(
            "  {}",
            format!("{} open tickets are dated in the future", summary.future_dated).yellow()
        );
    }
}

fn print_cost(c: &CostView) {
    let width = match c.grouping {
        GroupBy::Week | GroupBy::Month => 12,
        GroupBy::Field(_) => 24,
    };
    println!(
        "  {:<width$} {:>7} {:>14} {:>14} {:>14} {:>12}",
        c.group_by, "Tickets", "Rework", "Avoided", "Net", "Avg Rework"
    );
    println!("  {}", "-".repeat(width + 66));
    for (i, row) in c.rows.iter().enumerate() {
        let line = format!(
            "  {:<width$} {:>7} {:>14} {:>14} {:>14} {:>12}{}",
            truncate(&row.group_key, width),
            row.ticket_count,
            format_currency(row.total_rework_cost),
            format_currency(row.total_cost_avoided),
            format_currency(row.net_value),
            format_ratio_currency(row.avg_rework_per_ticket),
            partial_marker(row.is_partial()),
        );
        print_striped(i, &line);
    }
    println!("  {}", "-".repeat(width + 66));
    let t = &c.totals;
    let total = format!(
        "  {:<width$} {:>7} {:>14} {:>14} {:>14} {:>12}",
        "Total",
        t.ticket_count,
        format_currency(t.total_rework_cost),
        format_currency(t.total_cost_avoided),
        format_currency(t.net_value),
        format_ratio_currency(t.avg_rework_per_ticket),
    );
    println!("{}", total.bold());
    println!();
    println!(
        "  {} {}",
        "Cost efficiency (avoided / rework):".bold(),
        c.cost_efficiency
    );
}

fn print_customers(c: &CustomersView) {
    println!(
        "  {:<24} {:>7} {:>6} {:>9} {:>14} {:>8}",
        "Customer", "Tickets", "Open", "High Open", "Rework", "Risk"
    );
    println!("  {}", "-".repeat(74));
    for (i, row) in c.rows.iter().enumerate() {
        let line = format!(
            "  {:<24} {:>7} {:>6} {:>9} {:>14} {:>8.2}",
            truncate(&row.customer, 24),
            row.ticket_count,
            row.open_count,
            row.high_priority_open,
            format_currency(row.total_rework_cost),
            row.risk_score,
        );
        print_striped(i, &line);
    }

    if !c.highest_risk.is_empty() {
        println!();
        println!("{}", "Highest Risk".bold().cyan());
        for row in &c.highest_risk {
            println!(
                "  {} {:<24} {}",
                "•".red(),
                truncate(&row.customer, 24),
                format!("risk {:.2}, {} open", row.risk_score, row.open_count).dimmed()
            );
        }
    }
}

fn print_pareto(p: &ParetoView) {
    println!(
        "  {:<28} {:>6} {:>8} {:>11}",
        "Issue Type", "Count", "Share", "Cumulative"
    );
    println!("  {}", "-".repeat(56));
    for row in &p.rows {
        let line = format!(
            "  {:<28} {:>6} {:>8} {:>11}",
            truncate(&row.issue_type, 28),
            row.count,
            format_percentage(row.pct_of_total),
            format_percentage(row.cumulative_pct),
        );
        if row.vital_few {
            println!("{}", line.bold());
        } else {
            println!("{}", line.dimmed());
        }
    }
    println!();
    println!(
        "  {} {} of {} issue types reach {}",
        "Vital few:".bold(),
        p.vital_few.len(),
        p.rows.len(),
        format_percentage(p.threshold_pct)
    );
}

fn print_tickets(tickets: &[Ticket]) {
    println!(
        "  {:<10} {:<19} {:<14} {:<8} {:<18} {:<20} {:>12}",
        "NC", "Submitted", "Status", "Priority", "Customer", "Issue Type", "Rework"
    );
    println!("  {}", "-".repeat(107));
    for (i, t) in tickets.iter().take(TICKET_TABLE_LIMIT).enumerate() {
        let line = format!(
            "  {:<10} {:<19} {:<14} {:<8} {:<18} {:<20} {:>12}",
            truncate(&t.id, 10),
            format_timestamp(t.submitted_at),
            truncate(t.status.label(), 14),
            truncate(t.priority.label(), 8),
            truncate(t.customer_label(), 18),
            truncate(t.issue_type_label(), 20),
            format_currency(t.rework_cost),
        );
        print_striped(i, &line);
    }
    if tickets.len() > TICKET_TABLE_LIMIT {
        println!(
            "  {}",
            format!(
                "… {} more (use --format csv or `ncdash export tickets` for all)",
                tickets.len() - TICKET_TABLE_LIMIT
            )
            .dimmed()
        );
    }
}

// ---------------------------------------------------------------------------
// ncdash export
// ---------------------------------------------------------------------------

/// Write a view's table as CSV to `output`, or stdout when `None`.
pub fn run_export(dashboard: &mut Dashboard, view: View, opts: &ViewOptions, output: Option<&Path>) -> Result<()> {
    let records = dashboard.load()?;
    let filtered = filter::apply(records.as_slice(), &opts.predicates);
    let ctx = ViewContext {
        records: &filtered,
        now: opts.now,
        period: opts.predicates.window(),
        pareto_threshold: opts
            .threshold
            .unwrap_or(dashboard.config().pareto.threshold_pct),
    };
    let tables = view.tables(&ctx);
    let rows: usize = tables.iter().map(Table::len).sum();

    match output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            export::write_tables(&tables, file)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{} Exported {} rows to {}",
                "✓".green().bold(),
                rows,
                path.display()
            );
        }
        None => print!("{}", export::tables_to_csv(&tables)?),
    }

    dashboard
        .log()
        .export(&dashboard.describe(), view.name(), rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// ncdash refresh
// ---------------------------------------------------------------------------

/// Drop cached rows and reload from the source.
pub fn run_refresh(dashboard: &mut Dashboard) -> Result<()> {
    dashboard.refresh();
    let records = dashboard.load()?;
    let quality = DataQuality::from_records(&records);
    println!(
        "{} Reloaded {} tickets from {}",
        "✓".green().bold(),
        format_number(records.len() as u64),
        dashboard.describe()
    );
    if let Some(note) = quality.footnote() {
        println!("  {}", note.dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ncdash events
// ---------------------------------------------------------------------------

/// Show the most recent event log entries.
pub fn run_events(log: &EventLog, limit: usize, format: OutputFormat) -> Result<()> {
    let entries = log.read_recent(limit);

    if entries.is_empty() {
        println!("{}", "No events logged yet.".yellow());
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Csv => print_events_csv(&entries)?,
        OutputFormat::Table => print_events_table(&entries),
    }
    Ok(())
}

fn print_events_table(entries: &[EventEntry]) {
    println!("{}", "Recent Events".bold().cyan());
    println!("{}", "=".repeat(60));
    println!(
        "  {:<20} {:<8} {:>6} {:>7}  {}",
        "Time", "Event", "Rows", "Coerced", "Source / Detail"
    );
    println!("  {}", "-".repeat(58));
    for (i, e) in entries.iter().enumerate() {
        let when = e.timestamp.get(..19).unwrap_or(e.timestamp.as_str()).replace('T', " ");
        let detail = match &e.detail {
            Some(d) => format!("{} · {}", e.source, d),
            None => e.source.clone(),
        };
        let line = format!(
            "  {:<20} {:<8} {:>6} {:>7}  {}",
            when,
            e.event.to_string(),
            e.rows,
            e.coerced_rows,
            truncate(&detail, 40)
        );
        print_striped(i, &line);
    }
}

fn print_events_csv(entries: &[EventEntry]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    wtr.write_record(["timestamp", "event", "source", "rows", "coerced_rows", "detail"])?;
    for e in entries {
        wtr.write_record([
            e.timestamp.clone(),
            e.event.to_string(),
            e.source.clone(),
            e.rows.to_string(),
            e.coerced_rows.to_string(),
            e.detail.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// ncdash health
// ---------------------------------------------------------------------------

/// Check config files, the data source and the event log.
pub fn run_health() -> Result<()> {
    println!("{}", "ncdash Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.ncdash/config.toml found"
        } else {
            "not found (run `ncdash config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".ncdash.toml found"
        } else {
            "none (optional)"
        },
    );

    match Dashboard::from_config(cfg.clone()) {
        Ok(mut dashboard) => {
            let described = dashboard.describe();
            match dashboard.load() {
                Ok(records) => {
                    let quality = DataQuality::from_records(&records);
                    print_health_item(
                        "Data source",
                        true,
                        &format!("{described}: {} tickets", records.len()),
                    );
                    print_health_item(
                        "Data quality",
                        quality.is_clean(),
                        &quality.footnote().unwrap_or_else(|| "no coerced values".to_string()),
                    );
                }
                Err(e) => print_health_item("Data source", false, &format!("{e:#}")),
            }
        }
        Err(e) => print_health_item("Data source", false, &format!("{e:#}")),
    }

    print_health_item(
        "Pareto threshold",
        true,
        &format_percentage(cfg.pareto.threshold_pct),
    );

    let log = EventLog::from_config(&cfg.logging);
    match log.path() {
        Some(path) if path.exists() => print_health_item(
            "Event log",
            true,
            &format!("{} entries", log.read_recent(usize::MAX).len()),
        ),
        Some(_) => print_health_item("Event log", true, "no log file yet"),
        None => print_health_item("Event log", false, "disabled (set logging.enabled = true)"),
    }

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<20} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// ncdash config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective ncdash Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source_line(global_exists, "~/.ncdash/config.toml");
    print_source_line(project_exists, ".ncdash.toml");
    println!("  {} {}", "·".dimmed(), "NCDASH_* environment variables".dimmed());

    Ok(())
}

fn print_source_line(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.ncdash/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!("{} Config written to {}", "✓".green().bold(), path.display());
    println!("  {}", "Point source.path or source.url at your NC sheet.".dimmed());
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!("{} Config reset to defaults at {}", "✓".green().bold(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// ncdash serve
// ---------------------------------------------------------------------------

pub fn run_serve(dashboard: Dashboard, addr: &str) -> Result<()> {
    web::serve(dashboard, addr)
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Alternate normal and dimmed rows.
fn print_striped(i: usize, line: &str) {
    if i % 2 == 0 {
        println!("{line}");
    } else {
        println!("{}", line.dimmed());
    }
}

/// Flag rows whose sums include coerced values.
fn partial_marker(partial: bool) -> &'static str {
    if partial { " *" } else { "" }
}

fn colorize_amount(amount: f64) -> colored::ColoredString {
    let text = format_currency(amount);
    if amount < 0.0 { text.red() } else { text.green() }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Status;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 12)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str_opt(None), OutputFormat::Table);
        assert_eq!(OutputFormat::from_str_opt(Some("json")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str_opt(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::from_str_opt(Some("unknown")),
            OutputFormat::Table
        );
    }

    #[test]
    fn test_build_predicates_skips_unset_flags() {
        let predicates = build_predicates(
            &[("status", Some("open")), ("priority", None), ("period", Some("last-week"))],
            now(),
        )
        .unwrap();
        assert_eq!(predicates.status, Some(Status::Open));
        assert_eq!(predicates.priority, None);
        assert_eq!(predicates.date_from, NaiveDate::from_ymd_opt(2024, 6, 3));

        assert!(build_predicates(&[("from", Some("06/01/2024"))], now()).is_err());
    }

    #[test]
    fn test_describe_filters() {
        assert_eq!(describe_filters(&PredicateSet::default()), "all tickets");

        let predicates = build_predicates(
            &[("from", Some("2024-06-01")), ("status", Some("Closed")), ("search", Some("ink"))],
            now(),
        )
        .unwrap();
        assert_eq!(
            describe_filters(&predicates),
            "from 2024-06-01, status=Closed, search=\"ink\""
        );

        let predicates = build_predicates(&[("period", Some("last-week"))], now()).unwrap();
        assert_eq!(describe_filters(&predicates), "Last Week");

        let predicates = build_predicates(&[("from", Some("2024-06-01")), ("to", Some("2024-06-07"))], now()).unwrap();
        assert_eq!(describe_filters(&predicates), "2024-06-01 to 2024-06-07");
    }

    #[test]
    fn test_parse_now() {
        assert_eq!(parse_now(Some("2024-06-12 08:00")).unwrap(), now());
        assert!(parse_now(Some("tomorrow")).is_err());
        assert!(parse_now(None).is_ok());
    }

    #[test]
    fn test_partial_marker() {
        assert_eq!(partial_marker(true), " *");
        assert_eq!(partial_marker(false), "");
    }
}
