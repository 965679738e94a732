//! Display formatting shared by the terminal tables and the export module.

use chrono::NaiveDateTime;

use crate::analytics::Ratio;

/// Format a count with comma separators for readability.
pub fn format_number(n: u64) -> String {
    group_thousands(&n.to_string())
}

/// `$1,234.50`. Negative values (net value) get a leading minus.
pub fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Plain decimal with two fraction digits and no separators, for CSV.
pub fn plain_currency(amount: f64) -> String {
    format!("{amount:.2}")
}

/// `42.5%` with one decimal.
pub fn format_percentage(pct: f64) -> String {
    format!("{pct:.1}%")
}

/// A ratio as a percentage, `N/A` when undefined.
pub fn format_ratio_pct(ratio: Ratio) -> String {
    match ratio {
        Ratio::Value(v) => format_percentage(v),
        Ratio::Undefined => "N/A".to_string(),
    }
}

/// A ratio of currency amounts, `N/A` when undefined.
pub fn format_ratio_currency(ratio: Ratio) -> String {
    match ratio {
        Ratio::Value(v) => format_currency(v),
        Ratio::Undefined => "N/A".to_string(),
    }
}

/// Optional day statistic with one decimal, `N/A` when absent.
pub fn format_days(days: Option<f64>) -> String {
    days.map_or_else(|| "N/A".to_string(), |d| format!("{d:.1}"))
}

pub fn format_timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut result = String::new();
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}
