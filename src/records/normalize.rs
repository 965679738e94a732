//! Raw row → [`Ticket`] normalization.
//!
//! Accepts heterogeneous rows (strings from CSV, numbers and nulls from JSON)
//! and never rejects a row: bad values are replaced with defaults and the
//! replacement is recorded in [`CoercionFlags`]. The only failure is a source
//! whose shape has no id column at all.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::{CoercionFlags, Origin, Priority, RecordSet, Status, Ticket, fold_key};

/// One raw row as delivered by a data source: column name → cell value.
pub type RawRow = serde_json::Map<String, Value>;

/// The source's shape is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("required column '{column}' is missing from the data source (columns: {found})")]
    MissingColumn { column: &'static str, found: String },
}

/// Plain decimal with optional `$` and thousands separators. Rejects signs,
/// `NaN`, `inf` and exponents, which `f64::from_str` would accept.
static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?(?:\d{1,3}(?:,\d{3})+|\d+)?(?:\.\d+)?$").expect("valid currency regex")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

/// Accepted header spellings per modelled field, compared after
/// [`fold_key`].
const ID_ALIASES: &[&str] = &["ncnumber", "id", "ncid", "ticketid", "number"];
const SUBMITTED_ALIASES: &[&str] = &["datesubmitted", "submittedat", "submitted", "date"];
const STATUS_ALIASES: &[&str] = &["status"];
const PRIORITY_ALIASES: &[&str] = &["priority"];
const ORIGIN_ALIASES: &[&str] = &["externalorinternal", "origin", "externalinternal"];
const CUSTOMER_ALIASES: &[&str] = &["customer", "customername"];
const ISSUE_TYPE_ALIASES: &[&str] = &["issuetype", "type"];
const REWORK_ALIASES: &[&str] = &["costofrework", "reworkcost"];
const AVOIDED_ALIASES: &[&str] = &["costavoided"];
const QUANTITY_ALIASES: &[&str] = &["totalquantityaffected", "quantityaffected", "qtyaffected"];

/// Source column name for each modelled field, if present.
#[derive(Debug, Default)]
struct ColumnMap {
    id: Option<String>,
    submitted_at: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    origin: Option<String>,
    customer: Option<String>,
    issue_type: Option<String>,
    rework_cost: Option<String>,
    cost_avoided: Option<String>,
    quantity_affected: Option<String>,
}

impl ColumnMap {
    fn resolve(columns: &[String]) -> Self {
        let find = |aliases: &[&str]| {
            aliases.iter().find_map(|alias| {
                columns
                    .iter()
                    .find(|c| fold_key(c) == *alias)
                    .cloned()
            })
        };
        Self {
            id: find(ID_ALIASES),
            submitted_at: find(SUBMITTED_ALIASES),
            status: find(STATUS_ALIASES),
            priority: find(PRIORITY_ALIASES),
            origin: find(ORIGIN_ALIASES),
            customer: find(CUSTOMER_ALIASES),
            issue_type: find(ISSUE_TYPE_ALIASES),
            rework_cost: find(REWORK_ALIASES),
            cost_avoided: find(AVOIDED_ALIASES),
            quantity_affected: find(QUANTITY_ALIASES),
        }
    }

    fn is_modelled(&self, column: &str) -> bool {
        [
            &self.id,
            &self.submitted_at,
            &self.status,
            &self.priority,
            &self.origin,
            &self.customer,
            &self.issue_type,
            &self.rework_cost,
            &self.cost_avoided,
            &self.quantity_affected,
        ]
        .into_iter()
        .any(|c| c.as_deref() == Some(column))
    }
}

/// Union of column names across all rows, in first-seen order.
fn source_columns(rows: &[RawRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize raw rows into a record set.
///
/// Zero rows produce an empty record set. Otherwise the id column must exist
/// in at least one row.
pub fn normalize(rows: &[RawRow]) -> Result<RecordSet, SchemaError> {
    if rows.is_empty() {
        return Ok(RecordSet::default());
    }

    let columns = source_columns(rows);
    let map = ColumnMap::resolve(&columns);
    let Some(id_column) = map.id.as_deref() else {
        return Err(SchemaError::MissingColumn {
            column: "NC Number",
            found: columns.join(", "),
        });
    };

    let mut used_ids: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut tickets = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let cell = |column: &Option<String>| column.as_deref().and_then(|c| row.get(c));
        let mut flags = CoercionFlags::default();

        let raw_id = text(row.get(id_column));
        let id = unique_id(raw_id, index, &mut used_ids, &mut flags.id);

        let submitted_at = parse_timestamp(cell(&map.submitted_at));
        flags.submitted_at = submitted_at.is_none();

        let (rework_cost, rework_ok) = currency(cell(&map.rework_cost));
        let (cost_avoided, avoided_ok) = currency(cell(&map.cost_avoided));
        let (quantity_affected, quantity_ok) = quantity(cell(&map.quantity_affected));
        flags.rework_cost = !rework_ok;
        flags.cost_avoided = !avoided_ok;
        flags.quantity_affected = !quantity_ok;

        let extra = columns
            .iter()
            .filter(|c| !map.is_modelled(c))
            .filter_map(|c| text(row.get(c)).map(|v| (c.clone(), v)))
            .collect();

        tickets.push(Ticket {
            id,
            submitted_at,
            status: text(cell(&map.status))
                .map(|s| Status::parse(&s))
                .unwrap_or(Status::Unspecified),
            priority: text(cell(&map.priority))
                .map(|s| Priority::parse(&s))
                .unwrap_or(Priority::Unspecified),
            origin: text(cell(&map.origin))
                .map(|s| Origin::parse(&s))
                .unwrap_or(Origin::Unspecified),
            customer: text(cell(&map.customer)),
            issue_type: text(cell(&map.issue_type)),
            rework_cost,
            cost_avoided,
            quantity_affected,
            extra,
            flags,
        });
    }

    Ok(RecordSet::new(tickets))
}

/// Assign a unique id: empty ids become `row-<n>` (1-based source row),
/// repeats get `#2`, `#3`... suffixes. Either case sets `flagged`.
fn unique_id(
    raw: Option<String>,
    index: usize,
    used: &mut HashSet<String>,
    flagged: &mut bool,
) -> String {
    let base = match raw {
        Some(id) => id,
        None => {
            *flagged = true;
            format!("row-{}", index + 1)
        }
    };

    if used.insert(base.clone()) {
        return base;
    }

    *flagged = true;
    let mut n = 2;
    loop {
        let candidate = format!("{base}#{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Trimmed, non-empty text form of a cell.
fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };
    if s.is_empty() { None } else { Some(s) }
}

/// Parse a currency cell. Returns `(amount, valid)`; invalid or missing
/// cells yield `(0.0, false)`.
fn currency(value: Option<&Value>) -> (f64, bool) {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_currency(s),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() && v >= 0.0 => (v, true),
        _ => (0.0, false),
    }
}

pub(crate) fn parse_currency(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || compact == "$" || !CURRENCY_RE.is_match(&compact) {
        return None;
    }
    compact.replace(['$', ','], "").parse().ok()
}

/// Parse a non-negative integer cell. Whole floats (`12.0`, common in sheet
/// exports) are accepted.
fn quantity(value: Option<&Value>) -> (u64, bool) {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().and_then(whole)),
        Some(Value::String(s)) => {
            let cleaned = s.trim().replace(',', "");
            cleaned
                .parse::<u64>()
                .ok()
                .or_else(|| cleaned.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    };
    match parsed {
        Some(v) => (v, true),
        None => (0, false),
    }
}

fn whole(v: f64) -> Option<u64> {
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64).then_some(v as u64)
}

fn parse_timestamp(value: Option<&Value>) -> Option<NaiveDateTime> {
    match value? {
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

/// Parse the date formats seen in sheet exports. Timezone-qualified values
/// keep their wall-clock time.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> RawRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn currency_accepts_sheet_formats() {
        assert_eq!(parse_currency("$1,234.50"), Some(1234.5));
        assert_eq!(parse_currency(" 12 "), Some(12.0));
        assert_eq!(parse_currency("$ 7.25"), Some(7.25));
        assert_eq!(parse_currency(".5"), Some(0.5));
    }

    #[test]
    fn currency_rejects_garbage_and_negatives() {
        assert_eq!(parse_currency("N/A"), None);
        assert_eq!(parse_currency("-5"), None);
        assert_eq!(parse_currency("NaN"), None);
        assert_eq!(parse_currency("inf"), None);
        assert_eq!(parse_currency("$"), None);
        assert_eq!(parse_currency("1,23"), None);
    }

    #[test]
    fn datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-05 14:30:00"), Some(expected));
        assert_eq!(parse_datetime("3/5/2024 14:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05T14:30:00+02:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn missing_id_column_is_schema_error() {
        let rows = vec![row(json!({"Status": "Open"}))];
        let err = normalize(&rows).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { column: "NC Number", .. }));
        assert!(err.to_string().contains("Status"));
    }

    #[test]
    fn empty_input_is_empty_set() {
        let set = normalize(&[]).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn invalid_cost_is_zero_and_flagged() {
        let rows = vec![row(json!({
            "NC Number": "NC-1",
            "Cost of Rework": "N/A",
            "Cost Avoided": 25.5,
            "Total Quantity Affected": "1,200",
        }))];
        let set = normalize(&rows).unwrap();
        let t = set.get("NC-1").unwrap();
        assert_eq!(t.rework_cost, 0.0);
        assert!(t.flags.rework_cost);
        assert_eq!(t.cost_avoided, 25.5);
        assert!(!t.flags.cost_avoided);
        assert_eq!(t.quantity_affected, 1200);
        assert!(!t.flags.quantity_affected);
    }

    #[test]
    fn negative_numbers_are_coerced() {
        let rows = vec![row(json!({
            "NC Number": "NC-1",
            "Cost of Rework": -40,
            "Total Quantity Affected": -3,
        }))];
        let set = normalize(&rows).unwrap();
        let t = set.get("NC-1").unwrap();
        assert_eq!(t.rework_cost, 0.0);
        assert!(t.flags.rework_cost);
        assert_eq!(t.quantity_affected, 0);
        assert!(t.flags.quantity_affected);
    }

    #[test]
    fn duplicate_and_empty_ids_stay_unique() {
        let rows = vec![
            row(json!({"NC Number": "NC-1"})),
            row(json!({"NC Number": "NC-1"})),
            row(json!({"NC Number": ""})),
        ];
        let set = normalize(&rows).unwrap();
        let ids: Vec<&str> = set.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["NC-1", "NC-1#2", "row-3"]);
        assert!(!set.as_slice()[0].flags.id);
        assert!(set.as_slice()[1].flags.id);
        assert!(set.as_slice()[2].flags.id);
    }

    #[test]
    fn headers_resolve_case_insensitively_and_extras_are_kept() {
        let rows = vec![row(json!({
            "nc number": 1042,
            "DATE SUBMITTED": "2024-01-02",
            "external or internal": "internal",
            "Defect Summary": "Label misprint",
        }))];
        let set = normalize(&rows).unwrap();
        let t = set.get("1042").unwrap();
        assert_eq!(t.origin, Origin::Internal);
        assert!(t.submitted_at.is_some());
        assert_eq!(t.extra_value("defect summary"), Some("Label misprint"));
    }

    #[test]
    fn unknown_status_is_preserved_not_dropped() {
        let rows = vec![
            row(json!({"NC Number": "1", "Status": "Escalated"})),
            row(json!({"NC Number": "2", "Status": null})),
        ];
        let set = normalize(&rows).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[0].status, Status::Other("Escalated".into()));
        assert_eq!(set.as_slice()[1].status, Status::Unspecified);
    }
}
