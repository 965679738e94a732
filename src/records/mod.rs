//! Canonical ticket records.
//!
//! A [`Ticket`] is one non-conformance row after normalization: typed dates,
//! currency and quantities, plus categorical tags that tolerate values the
//! dashboard has never seen before. A [`RecordSet`] keeps tickets in source
//! row order while indexing them by id.
//!
//! Nothing in this module mutates a ticket after it is built. Aggregators
//! borrow tickets and allocate their own output tables.

pub mod normalize;

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};

pub use normalize::{RawRow, SchemaError, normalize};

/// Label used for missing categorical values (status, priority, customer...).
pub const UNSPECIFIED: &str = "Unspecified";

// ---------------------------------------------------------------------------
// Categorical tags
// ---------------------------------------------------------------------------

/// Folds a raw label into a comparison key: lowercase, alphanumerics only.
///
/// `"In Progress"`, `"in-progress"` and `"IN_PROGRESS"` all fold to
/// `"inprogress"`.
pub(crate) fn fold_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ticket workflow status.
///
/// Unknown values are preserved verbatim in [`Status::Other`]. Every variant
/// except [`Status::Closed`] is open-class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Open,
    InProgress,
    PendingReview,
    OnHold,
    Closed,
    Other(String),
    Unspecified,
}

impl Status {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match fold_key(trimmed).as_str() {
            "" => Self::Unspecified,
            "open" => Self::Open,
            "inprogress" => Self::InProgress,
            "pendingreview" => Self::PendingReview,
            "onhold" => Self::OnHold,
            "closed" => Self::Closed,
            "unspecified" => Self::Unspecified,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::PendingReview => "Pending Review",
            Self::OnHold => "On Hold",
            Self::Closed => "Closed",
            Self::Other(s) => s,
            Self::Unspecified => UNSPECIFIED,
        }
    }

    /// Open-class means anything that is not closed, including statuses the
    /// dashboard does not recognize and missing statuses.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Ticket priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
    Other(String),
    Unspecified,
}

impl Priority {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match fold_key(trimmed).as_str() {
            "" | "unspecified" => Self::Unspecified,
            "high" => Self::High,
            "medium" | "med" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Other(s) => s,
            Self::Unspecified => UNSPECIFIED,
        }
    }

    /// Display rank: known priorities first (High → Low), then anything else.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
            Self::Other(_) => 3,
            Self::Unspecified => 4,
        }
    }
}

/// Whether the defect was found by a customer or internally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    External,
    Internal,
    Other(String),
    Unspecified,
}

impl Origin {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match fold_key(trimmed).as_str() {
            "" | "unspecified" => Self::Unspecified,
            "external" => Self::External,
            "internal" => Self::Internal,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::External => "External",
            Self::Internal => "Internal",
            Self::Other(s) => s,
            Self::Unspecified => UNSPECIFIED,
        }
    }
}

macro_rules! label_impls {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }

            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.label())
                }
            }
        )*
    };
}

label_impls!(Status, Priority, Origin);

// ---------------------------------------------------------------------------
// Categorical fields
// ---------------------------------------------------------------------------

/// A categorical ticket field usable as a tally or grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Status,
    Priority,
    Origin,
    Customer,
    IssueType,
}

impl Field {
    pub fn parse(raw: &str) -> Option<Self> {
        match fold_key(raw).as_str() {
            "status" => Some(Self::Status),
            "priority" => Some(Self::Priority),
            "origin" | "externalorinternal" => Some(Self::Origin),
            "customer" => Some(Self::Customer),
            "issuetype" | "issue" => Some(Self::IssueType),
            _ => None,
        }
    }

    /// Column header used in exports and tables.
    pub fn header(self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Priority => "Priority",
            Self::Origin => "External Or Internal",
            Self::Customer => "Customer",
            Self::IssueType => "Issue Type",
        }
    }

    /// The ticket's value for this field, with missing values as
    /// [`UNSPECIFIED`].
    pub fn value<'a>(self, ticket: &'a Ticket) -> &'a str {
        match self {
            Self::Status => ticket.status.label(),
            Self::Priority => ticket.priority.label(),
            Self::Origin => ticket.origin.label(),
            Self::Customer => ticket.customer_label(),
            Self::IssueType => ticket.issue_type_label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Coercion flags
// ---------------------------------------------------------------------------

/// Per-field record of values that were missing or malformed in the raw row
/// and replaced with a default during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoercionFlags {
    /// Id was empty (synthetic id assigned) or duplicated (suffixed).
    pub id: bool,
    pub submitted_at: bool,
    pub rework_cost: bool,
    pub cost_avoided: bool,
    pub quantity_affected: bool,
}

impl CoercionFlags {
    pub fn any(&self) -> bool {
        self.id
            || self.submitted_at
            || self.rework_cost
            || self.cost_avoided
            || self.quantity_affected
    }

    /// True if either currency field was defaulted.
    pub fn cost(&self) -> bool {
        self.rework_cost || self.cost_avoided
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// One normalized non-conformance ticket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticket {
    pub id: String,
    pub submitted_at: Option<NaiveDateTime>,
    pub status: Status,
    pub priority: Priority,
    pub origin: Origin,
    pub customer: Option<String>,
    pub issue_type: Option<String>,
    pub rework_cost: f64,
    pub cost_avoided: f64,
    pub quantity_affected: u64,
    /// Columns the normalizer does not model, in source column order.
    pub extra: Vec<(String, String)>,
    pub flags: CoercionFlags,
}

impl Ticket {
    /// A ticket with only an id; every other field missing. Used as a base
    /// for struct-update syntax.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            submitted_at: None,
            status: Status::Unspecified,
            priority: Priority::Unspecified,
            origin: Origin::Unspecified,
            customer: None,
            issue_type: None,
            rework_cost: 0.0,
            cost_avoided: 0.0,
            quantity_affected: 0,
            extra: Vec::new(),
            flags: CoercionFlags::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Submission timestamp truncated to its calendar date.
    pub fn submitted_date(&self) -> Option<NaiveDate> {
        self.submitted_at.map(|ts| ts.date())
    }

    pub fn customer_label(&self) -> &str {
        self.customer.as_deref().unwrap_or(UNSPECIFIED)
    }

    pub fn issue_type_label(&self) -> &str {
        self.issue_type.as_deref().unwrap_or(UNSPECIFIED)
    }

    /// Look up an unmodelled column by name (case-insensitive).
    pub fn extra_value(&self, column: &str) -> Option<&str> {
        let key = fold_key(column);
        self.extra
            .iter()
            .find(|(name, _)| fold_key(name) == key)
            .map(|(_, value)| value.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record set
// ---------------------------------------------------------------------------

/// Order-preserving collection of tickets keyed by id.
///
/// Built once per data load and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    tickets: Vec<Ticket>,
    index: HashMap<String, usize>,
}

impl RecordSet {
    /// Build a record set. Ids must already be unique; a later ticket with a
    /// repeated id shadows the earlier one in [`get`](Self::get) but both stay
    /// in iteration order. [`normalize`] guarantees uniqueness.
    pub fn new(tickets: Vec<Ticket>) -> Self {
        let index = tickets
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();
        Self { tickets, index }
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.index.get(id).map(|&i| &self.tickets[i])
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Ticket> {
        self.tickets.iter()
    }

    pub fn as_slice(&self) -> &[Ticket] {
        &self.tickets
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Ticket;
    type IntoIter = std::slice::Iter<'a, Ticket>;

    fn into_iter(self) -> Self::IntoIter {
        self.tickets.iter()
    }
}

// ---------------------------------------------------------------------------
// Data quality
// ---------------------------------------------------------------------------

/// Counts of tickets whose fields were coerced during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    pub rows: usize,
    /// Tickets with at least one coerced field.
    pub coerced_rows: usize,
    pub id: usize,
    pub submitted_at: usize,
    pub rework_cost: usize,
    pub cost_avoided: usize,
    pub quantity_affected: usize,
}

impl DataQuality {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Ticket>,
    {
        let mut quality = Self::default();
        for ticket in records {
            let f = &ticket.flags;
            quality.rows += 1;
            quality.coerced_rows += usize::from(f.any());
            quality.id += usize::from(f.id);
            quality.submitted_at += usize::from(f.submitted_at);
            quality.rework_cost += usize::from(f.rework_cost);
            quality.cost_avoided += usize::from(f.cost_avoided);
            quality.quantity_affected += usize::from(f.quantity_affected);
        }
        quality
    }

    pub fn is_clean(&self) -> bool {
        self.coerced_rows == 0
    }

    /// One-line footnote for views, `None` when nothing was coerced.
    pub fn footnote(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        let mut parts = Vec::new();
        for (name, count) in [
            ("id", self.id),
            ("date", self.submitted_at),
            ("rework cost", self.rework_cost),
            ("cost avoided", self.cost_avoided),
            ("quantity", self.quantity_affected),
        ] {
            if count > 0 {
                parts.push(format!("{name}: {count}"));
            }
        }
        Some(format!(
            "{} of {} rows had missing or invalid values ({})",
            self.coerced_rows,
            self.rows,
            parts.join(", ")
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_folds_spelling_variants() {
        assert_eq!(Status::parse("In Progress"), Status::InProgress);
        assert_eq!(Status::parse("in-progress"), Status::InProgress);
        assert_eq!(Status::parse(" CLOSED "), Status::Closed);
        assert_eq!(Status::parse(""), Status::Unspecified);
        assert_eq!(
            Status::parse("Awaiting Parts"),
            Status::Other("Awaiting Parts".to_string())
        );
    }

    #[test]
    fn open_class_is_everything_but_closed() {
        assert!(Status::Open.is_open());
        assert!(Status::OnHold.is_open());
        assert!(Status::Other("Escalated".into()).is_open());
        assert!(Status::Unspecified.is_open());
        assert!(!Status::Closed.is_open());
    }

    #[test]
    fn unknown_labels_round_trip_verbatim() {
        let p = Priority::parse("Critical");
        assert_eq!(p.label(), "Critical");
        assert_eq!(Origin::parse("Supplier").label(), "Supplier");
    }

    #[test]
    fn field_value_uses_unspecified_for_missing() {
        let t = Ticket::new("NC-1");
        assert_eq!(Field::Customer.value(&t), UNSPECIFIED);
        assert_eq!(Field::IssueType.value(&t), UNSPECIFIED);
        assert_eq!(Field::Status.value(&t), UNSPECIFIED);
    }

    #[test]
    fn record_set_preserves_order_and_indexes() {
        let set = RecordSet::new(vec![Ticket::new("b"), Ticket::new("a")]);
        let ids: Vec<&str> = set.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(set.get("a").is_some());
        assert!(set.get("z").is_none());
    }

    #[test]
    fn data_quality_footnote() {
        let mut bad = Ticket::new("2");
        bad.flags.rework_cost = true;
        let quality = DataQuality::from_records(&[Ticket::new("1"), bad]);
        assert_eq!(quality.coerced_rows, 1);
        assert_eq!(quality.rework_cost, 1);
        let note = quality.footnote().unwrap();
        assert!(note.contains("1 of 2 rows"));
        assert!(note.contains("rework cost: 1"));
    }

    #[test]
    fn clean_quality_has_no_footnote() {
        let quality = DataQuality::from_records(&[Ticket::new("1")]);
        assert!(quality.is_clean());
        assert!(quality.footnote().is_none());
    }
}
