use chrono::{DateTime, Utc};

/// Case-insensitive substring test. An empty needle always matches.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate a string to a maximum length in characters, adding an ellipsis
/// if needed
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

/// Hide a secret for list display. Length is not revealed.
pub fn mask_secret(_secret: &str) -> String {
    "••••••••".to_string()
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

/// Format a timestamp as a short calendar date
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%b %d, %Y").to_string()
}

/// Relative description of a last-used time, e.g. "3h ago" or "Never"
pub fn format_last_used(timestamp: Option<&DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => format_relative(ts, Utc::now()),
        None => "Never".to_string(),
    }
}

fn format_relative(ts: &DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - *ts).num_minutes();
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        format!("{}h ago", minutes / 60)
    } else if minutes < 1440 * 30 {
        format!("{}d ago", minutes / 1440)
    } else {
        format_date(ts)
    }
}
