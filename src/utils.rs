//! Small helpers for date labels and log formatting.

use chrono::NaiveDate;

/// Format a digest date the way the Chinese header shows it,
/// e.g. `2026年10月14日`.
pub fn digest_date_label(date: NaiveDate) -> String {
    date.format("%Y年%m月%d日").to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended. Cuts always land on a character boundary, so
/// CJK text is safe.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("华为发布会", 2), "华为…(+9 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}
