//! JSON digest rendering.
//!
//! ```json
//! {
//!   "date": "2026-10-14",
//!   "items": [
//!     { "title": "...", "url": "...", "source": "IT之家" }
//!   ]
//! }
//! ```

use crate::models::{DigestReport, HeadlineItem};
use chrono::NaiveDate;
use tracing::error;

/// Render the items as a pretty-printed JSON document.
///
/// Falls back to the text digest if serialization fails.
pub fn render(items: &[HeadlineItem], date: NaiveDate) -> String {
    let report = DigestReport {
        date: date.format("%Y-%m-%d").to_string(),
        items: items.to_vec(),
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize digest; falling back to text");
            super::text::render(items, date)
        }
    }
}
