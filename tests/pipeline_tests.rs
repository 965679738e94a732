/// End-to-end tests: file source → normalizer → filters → views → export.
use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ncdash::config::NcdashConfig;
use ncdash::dashboard::{Dashboard, View, ViewContext};
use ncdash::filter::{self, PredicateSet};
use ncdash::logging::{EventKind, EventLog};
use ncdash::source::{CachedSource, CsvFileSource, DataSource, JsonFileSource};

const SHEET: &str = "\
NC Number,Date Submitted,Status,Priority,External Or Internal,Customer,Issue Type,Cost of Rework,Cost Avoided,Total Quantity Affected,Defect Summary
NC-1001,06/24/2024 08:15:00,Open,High,External,Acme Cannabis,Print Defect,\"$1,250.00\",300,500,Smudged ink on lid
NC-1002,06/03/2024 10:00:00,In Progress,Medium,Internal,,Dimensional,N/A,0,20,Lid too tight
NC-1003,05/20/2024,Closed,Low,External,Green Leaf Co,Print Defect,200.50,1000,100,Faded print
NC-1004,,On Hold,High,External,Acme Cannabis,Labeling Error,75,0,5,Wrong batch label
NC-1005,06/26/2024 14:00:00,Open,Low,Internal,Summit Farms,Print Defect,0,0,1,
";

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 28)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap()
}

fn write_sheet(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("nc_data.csv");
    fs::write(&path, SHEET).unwrap();
    path
}

fn dashboard(dir: &Path) -> Dashboard {
    let source = CsvFileSource::new(write_sheet(dir));
    Dashboard::new(NcdashConfig::default(), Box::new(source))
        .with_log(EventLog::at(dir.join("events.jsonl")))
}

fn ctx(records: &[ncdash::records::Ticket]) -> ViewContext<'_> {
    ViewContext {
        records,
        now: now(),
        period: None,
        pareto_threshold: 80.0,
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

#[test]
fn csv_sheet_loads_with_quality_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut dash = dashboard(dir.path());
    let records = dash.load().unwrap();

    assert_eq!(records.len(), 5);
    let first = records.get("NC-1001").unwrap();
    assert_eq!(first.rework_cost, 1250.0);
    assert_eq!(first.extra_value("defect summary"), Some("Smudged ink on lid"));

    let reworked = records.get("NC-1002").unwrap();
    assert_eq!(reworked.rework_cost, 0.0);
    assert!(reworked.flags.rework_cost);
    assert!(records.get("NC-1004").unwrap().submitted_at.is_none());

    let events = dash.log().read_recent(5);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, EventKind::Load);
    assert_eq!(events[0].rows, 5);
    assert_eq!(events[0].coerced_rows, 2);
}

#[test]
fn json_and_csv_sources_agree() {
    let dir = tempfile::tempdir().unwrap();
    let json = serde_json::json!([
        {"NC Number": "NC-1", "Status": "Open", "Cost of Rework": 12.5, "Issue Type": "Dimensional"},
        {"NC Number": "NC-2", "Status": "Closed", "Cost of Rework": null}
    ]);
    let json_path = dir.path().join("rows.json");
    fs::write(&json_path, json.to_string()).unwrap();
    let csv_path = dir.path().join("rows.csv");
    fs::write(&csv_path, "NC Number,Status,Cost of Rework,Issue Type\nNC-1,Open,12.50,Dimensional\nNC-2,Closed,,\n").unwrap();

    let from_json = ncdash::records::normalize(&JsonFileSource::new(&json_path).fetch().unwrap()).unwrap();
    let from_csv = ncdash::records::normalize(&CsvFileSource::new(&csv_path).fetch().unwrap()).unwrap();
    assert_eq!(from_json.as_slice(), from_csv.as_slice());
}

#[test]
fn missing_id_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "Status,Priority\nOpen,High\n").unwrap();
    let mut dash = Dashboard::new(NcdashConfig::default(), Box::new(CsvFileSource::new(&path)))
        .with_log(EventLog::disabled());
    let err = dash.load().unwrap_err();
    assert!(format!("{err:#}").contains("NC Number") || format!("{err:#}").contains("id"));
}

#[test]
fn missing_file_reports_an_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let log = EventLog::at(dir.path().join("events.jsonl"));
    let source = CsvFileSource::new(dir.path().join("missing.csv"));
    let mut dash = Dashboard::new(NcdashConfig::default(), Box::new(source)).with_log(log);

    assert!(dash.load().is_err());
    assert_eq!(dash.log().read_recent(1)[0].event, EventKind::Error);
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[test]
fn filtered_views_only_see_matching_tickets() {
    let dir = tempfile::tempdir().unwrap();
    let records = dashboard(dir.path()).load().unwrap();

    let mut predicates = PredicateSet::default();
    predicates.set("origin", "External", now()).unwrap();
    let external = filter::apply(records.as_slice(), &predicates);
    assert_eq!(external.len(), 3);

    let payload = serde_json::to_value(View::Pareto.payload(&ctx(&external))).unwrap();
    assert_eq!(payload["records"], 3);
    assert_eq!(payload["data"]["rows"][0]["issue_type"], "Print Defect");
    assert_eq!(payload["data"]["rows"][0]["count"], 2);
}

#[test]
fn aging_view_reports_unknown_ages() {
    let dir = tempfile::tempdir().unwrap();
    let records = dashboard(dir.path()).load().unwrap();
    let payload = serde_json::to_value(View::Aging.payload(&ctx(records.as_slice()))).unwrap();

    // Open-class: 1001 (4 days), 1002 (25 days), 1004 (undated), 1005 (1 day).
    let buckets = &payload["data"]["buckets"];
    assert_eq!(buckets["open_total"], 4);
    assert_eq!(buckets["unknown_age"], 1);
    assert_eq!(buckets["buckets"][0]["count"], 2);
    assert_eq!(buckets["buckets"][2]["count"], 1);
}

#[test]
fn weekly_cost_skips_undated_tickets() {
    let dir = tempfile::tempdir().unwrap();
    let records = dashboard(dir.path()).load().unwrap();
    let view = View::parse("cost", Some("week")).unwrap();
    let table = view.table(&ctx(records.as_slice()));

    assert_eq!(table.headers[0], "Week Of");
    let weeks: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
    assert!(weeks.contains(&"2024-06-24"));
    assert!(weeks.contains(&"2024-06-03"));
    assert!(weeks.contains(&"2024-05-20"));
    assert_eq!(weeks.last(), Some(&"Total"));
}

#[test]
fn period_filter_resolves_against_injected_clock() {
    let dir = tempfile::tempdir().unwrap();
    let records = dashboard(dir.path()).load().unwrap();

    let mut predicates = PredicateSet::default();
    predicates.set("period", "current-week", now()).unwrap();
    let this_week = filter::apply(records.as_slice(), &predicates);
    let ids: Vec<&str> = this_week.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["NC-1001", "NC-1005"]);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[test]
fn ticket_export_round_trips_through_csv_source() {
    let dir = tempfile::tempdir().unwrap();
    let records = dashboard(dir.path()).load().unwrap();
    let exported = dir.path().join("export.csv");
    View::Tickets
        .table(&ctx(records.as_slice()))
        .write_csv(fs::File::create(&exported).unwrap())
        .unwrap();

    let text = fs::read_to_string(&exported).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("NC Number,Date Submitted,Status,Priority"));
    assert!(header.ends_with("Total Quantity Affected,Defect Summary"));
    assert!(text.contains(
        "NC-1001,2024-06-24 08:15:00,Open,High,External,Acme Cannabis,Print Defect,1250.00,300.00,500,Smudged ink on lid"
    ));
    assert!(text.contains("NC-1005,2024-06-26 14:00:00,Open,Low,Internal,Summit Farms,Print Defect,0.00,0.00,1,\n"));

    let reloaded = ncdash::records::normalize(&CsvFileSource::new(&exported).fetch().unwrap()).unwrap();
    assert_eq!(reloaded.len(), records.len());
    assert_eq!(reloaded.get("NC-1001").unwrap().rework_cost, 1250.0);
    assert_eq!(
        reloaded.get("NC-1001").unwrap().extra_value("Defect Summary"),
        Some("Smudged ink on lid")
    );
    assert_eq!(reloaded.get("NC-1005").unwrap().extra_value("Defect Summary"), None);
}

#[test]
fn status_and_aging_exports_include_breakdown_sections() {
    let dir = tempfile::tempdir().unwrap();
    let records = dashboard(dir.path()).load().unwrap();

    let status = ncdash::export::tables_to_csv(&View::Status.tables(&ctx(records.as_slice()))).unwrap();
    let sections: Vec<&str> = status.split("\n\n").collect();
    assert_eq!(sections.len(), 2);
    assert!(sections[0].starts_with("Status,Count,Percent\n"));
    assert!(sections[1].starts_with("Status,Priority,Count,Total Rework Cost"));
    assert!(sections[1].contains("Open,High,1,1250.00,500,25.0"));

    let aging = ncdash::export::tables_to_csv(&View::Aging.tables(&ctx(records.as_slice()))).unwrap();
    let sections: Vec<&str> = aging.split("\n\n").collect();
    assert_eq!(sections.len(), 2);
    assert!(sections[1].starts_with("Priority,Count,Mean Age,Median Age,Max Age\n"));
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[test]
fn cached_source_survives_file_changes_until_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = write_sheet(dir.path());
    let mut cached = CachedSource::new(
        CsvFileSource::new(&sheet),
        Duration::seconds(300),
        Some(dir.path().join("cache.json")),
    );
    let t0 = Utc.with_ymd_and_hms(2024, 6, 28, 9, 0, 0).unwrap();

    assert_eq!(cached.fetch_at(t0).unwrap().len(), 5);
    fs::write(&sheet, "NC Number\nNC-9\n").unwrap();
    assert_eq!(cached.fetch_at(t0 + Duration::seconds(60)).unwrap().len(), 5);

    cached.refresh();
    assert_eq!(cached.fetch_at(t0 + Duration::seconds(61)).unwrap().len(), 1);
}
