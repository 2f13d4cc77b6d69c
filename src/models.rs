//! Data models flowing through the digest pipeline.
//!
//! - [`AnchorRecord`]: one hyperlink found while scanning a home page
//! - [`Classification`] / [`Decision`] / [`ExclusionReason`]: the verdict of
//!   the classifier for one record
//! - [`ClassifiedRecord`]: a record that survived classification
//! - [`HeadlineItem`]: a selected headline, attributed to its source

use serde::{Deserialize, Serialize};

/// A hyperlink as seen in the raw markup.
///
/// `text` is the trimmed concatenation of every text node inside the anchor,
/// `href` is already resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRecord {
    pub text: String,
    pub href: String,
}

impl AnchorRecord {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }

    /// Title length in characters, which is what the rule bounds count.
    pub fn title_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// Whether an included link looks like a story permalink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Article,
    Other,
}

/// Why a record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    EmptyHref,
    ExcludedMarker,
    TooShort,
    NavigationLabel,
    TooLong,
    MissingScript,
    ForeignDomain,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyHref => "empty_href",
            Self::ExcludedMarker => "excluded_marker",
            Self::TooShort => "too_short",
            Self::NavigationLabel => "navigation_label",
            Self::TooLong => "too_long",
            Self::MissingScript => "missing_script",
            Self::ForeignDomain => "foreign_domain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Include(Classification),
    Exclude(ExclusionReason),
}

impl Decision {
    pub fn is_included(&self) -> bool {
        matches!(self, Decision::Include(_))
    }
}

/// An anchor that passed classification, tagged with its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub record: AnchorRecord,
    pub class: Classification,
}

/// A headline selected for the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadlineItem {
    pub title: String,
    pub url: String,
    pub source: String,
}

impl HeadlineItem {
    pub fn from_record(record: AnchorRecord, source: &str) -> Self {
        Self {
            title: record.text,
            url: record.href,
            source: source.to_string(),
        }
    }
}

/// Everything the JSON output carries for one run.
#[derive(Debug, Serialize, Deserialize)]
pub struct DigestReport {
    /// Digest date in `YYYY-MM-DD` format.
    pub date: String,
    pub items: Vec<HeadlineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_chars_counts_characters_not_bytes() {
        let record = AnchorRecord::new("华为发布会", "https://tech.sina.com.cn/");
        assert_eq!(record.title_chars(), 5);
        assert!(record.text.len() > 5);
    }

    #[test]
    fn test_headline_item_from_record() {
        let record = AnchorRecord::new("苹果秋季发布会定档", "https://www.ithome.com/0/1.htm");
        let item = HeadlineItem::from_record(record, "IT之家");
        assert_eq!(item.title, "苹果秋季发布会定档");
        assert_eq!(item.url, "https://www.ithome.com/0/1.htm");
        assert_eq!(item.source, "IT之家");
    }

    #[test]
    fn test_report_serialization() {
        let report = DigestReport {
            date: "2026-10-14".to_string(),
            items: vec![HeadlineItem {
                title: "标题".to_string(),
                url: "https://example.com".to_string(),
                source: "新浪科技".to_string(),
            }],
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("2026-10-14"));
        assert!(json.contains("新浪科技"));

        let back: DigestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.items.len(), 1);
    }

    #[test]
    fn test_decision_is_included() {
        assert!(Decision::Include(Classification::Other).is_included());
        assert!(!Decision::Exclude(ExclusionReason::TooLong).is_included());
    }
}
