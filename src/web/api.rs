//! JSON API handlers.
//!
//! Handlers return a [`Reply`] (status plus JSON body); the server loop
//! turns it into a `tiny_http` response. Filters come from the query string
//! with the same names as the CLI flags (`from`, `to`, `status`, `priority`,
//! `origin`, `customer`, `search`, `period`), plus `now`, `group_by` and
//! `threshold`.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Value, json};

use crate::dashboard::{Dashboard, View, ViewContext};
use crate::filter::{self, PredicateSet};
use crate::records::Field;
use crate::records::normalize::parse_datetime;

/// A status code and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn ok<T: Serialize>(data: &T) -> Result<Self> {
        let body = serde_json::to_value(data).context("failed to serialize JSON response")?;
        Ok(Self { status: 200, body })
    }

    pub fn error(status: u16, message: impl std::fmt::Display) -> Self {
        Self {
            status,
            body: json!({ "error": message.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// Query string
// ---------------------------------------------------------------------------

/// Decoded `key=value` pairs from the URL's query string, in order.
/// `+` is a space; malformed escapes are kept literally.
pub fn query_pairs(url: &str) -> Vec<(String, String)> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Request parameters after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRequest {
    pub predicates: PredicateSet,
    pub now: NaiveDateTime,
    pub group_by: Option<String>,
    pub threshold: Option<f64>,
}

/// Parse view parameters. `Err` carries a client-facing message.
pub fn parse_view_request(url: &str, default_now: NaiveDateTime) -> Result<ViewRequest, String> {
    let pairs = query_pairs(url);

    // `now` first: `period` resolves against it.
    let now = match pairs.iter().find(|(k, _)| k == "now") {
        Some((_, raw)) => parse_datetime(raw).ok_or_else(|| format!("invalid now '{raw}'"))?,
        None => default_now,
    };

    let mut request = ViewRequest {
        predicates: PredicateSet::default(),
        now,
        group_by: None,
        threshold: None,
    };
    for (key, value) in &pairs {
        match key.as_str() {
            "now" => {}
            "group_by" | "groupby" | "by" => request.group_by = Some(value.clone()),
            "threshold" => {
                let pct = value
                    .parse::<f64>()
                    .ok()
                    .filter(|p| (0.0..=100.0).contains(p))
                    .ok_or_else(|| format!("invalid threshold '{value}'"))?;
                request.threshold = Some(pct);
            }
            _ => request
                .predicates
                .set(key, value, now)
                .map_err(|e| e.to_string())?,
        }
    }
    Ok(request)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /api/<view>`: a filtered dashboard view.
pub fn get_view(dashboard: &mut Dashboard, name: &str, url: &str, now: NaiveDateTime) -> Result<Reply> {
    let request = match parse_view_request(url, now) {
        Ok(request) => request,
        Err(message) => return Ok(Reply::error(400, message)),
    };
    let Some(view) = View::parse(name, request.group_by.as_deref()) else {
        return Ok(Reply::error(400, format!("unknown grouping for {name}")));
    };

    let records = match dashboard.load() {
        Ok(records) => records,
        Err(e) => return Ok(Reply::error(503, format!("{e:#}"))),
    };
    let filtered = filter::apply(records.as_slice(), &request.predicates);
    let ctx = ViewContext {
        records: &filtered,
        now: request.now,
        period: request.predicates.window(),
        pareto_threshold: request
            .threshold
            .unwrap_or(dashboard.config().pareto.threshold_pct),
    };
    Reply::ok(&view.payload(&ctx))
}

/// `GET /api/options`: distinct values for each filter dropdown.
pub fn get_options(dashboard: &mut Dashboard) -> Result<Reply> {
    let records = match dashboard.load() {
        Ok(records) => records,
        Err(e) => return Ok(Reply::error(503, format!("{e:#}"))),
    };
    let tickets = records.as_slice();
    let options: serde_json::Map<String, Value> = [
        Field::Status,
        Field::Priority,
        Field::Origin,
        Field::Customer,
        Field::IssueType,
    ]
    .into_iter()
    .map(|field| {
        let values = filter::distinct_options(tickets, field);
        (field.header().to_string(), json!(values))
    })
    .collect();
    Reply::ok(&options)
}

/// `POST /api/refresh`: drop cached rows and reload.
pub fn post_refresh(dashboard: &mut Dashboard) -> Result<Reply> {
    dashboard.refresh();
    match dashboard.load() {
        Ok(records) => Reply::ok(&json!({ "refreshed": true, "records": records.len() })),
        Err(e) => Ok(Reply::error(503, format!("{e:#}"))),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    source: String,
    cache_ttl_secs: u64,
    pareto_threshold_pct: f64,
    event_log: Option<String>,
}

/// `GET /api/health`: configuration summary; does not touch the source.
pub fn get_health(dashboard: &Dashboard) -> Result<Reply> {
    let config = dashboard.config();
    Reply::ok(&HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        source: dashboard.describe(),
        cache_ttl_secs: config.source.cache_ttl_secs,
        pareto_threshold_pct: config.pareto.threshold_pct,
        event_log: dashboard.log().path().map(|p| p.display().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 12)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap()
    }

    #[test]
    fn query_pairs_decode() {
        let pairs = query_pairs("/api/status?customer=Green+Leaf%20Co&status=In%20Progress&flag");
        assert_eq!(
            pairs,
            vec![
                ("customer".to_string(), "Green Leaf Co".to_string()),
                ("status".to_string(), "In Progress".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
        assert!(query_pairs("/api/status").is_empty());
    }

    #[test]
    fn query_pairs_keep_malformed_escapes() {
        let pairs = query_pairs("/api/tickets?search=100%&customer=%zz&&status=Caf%C3%A9");
        assert_eq!(
            pairs,
            vec![
                ("search".to_string(), "100%".to_string()),
                ("customer".to_string(), "%zz".to_string()),
                ("status".to_string(), "Café".to_string()),
            ]
        );
    }

    #[test]
    fn view_request_resolves_period_against_now() {
        let request = parse_view_request("/api/cost?period=last-week&group_by=week", now()).unwrap();
        assert_eq!(request.predicates.date_from, NaiveDate::from_ymd_opt(2024, 6, 3));
        assert_eq!(request.predicates.date_to, NaiveDate::from_ymd_opt(2024, 6, 9));
        assert_eq!(request.group_by.as_deref(), Some("week"));

        let request = parse_view_request("/api/aging?period=current-week&now=2024-07-03", now()).unwrap();
        assert_eq!(request.predicates.date_from, NaiveDate::from_ymd_opt(2024, 7, 1));
    }

    #[test]
    fn view_request_rejects_bad_input() {
        assert!(parse_view_request("/api/status?colour=red", now()).is_err());
        assert!(parse_view_request("/api/status?from=yesterday", now()).is_err());
        assert!(parse_view_request("/api/pareto?threshold=120", now()).is_err());
        assert!(parse_view_request("/api/aging?now=soon", now()).is_err());
    }
}
