//! Formatting helpers for terminal output.

use chrono::{DateTime, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Two-decimal amount for display
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Format an optional timestamp, e.g. "Mar 01, 2025"
pub fn format_date(date: Option<&DateTime<Utc>>) -> String {
    date.map(|d| d.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}
