//! Headline candidate classification.
//!
//! [`classify`] is a pure function of one [`AnchorRecord`] and one
//! [`ExtractionRule`]. The checks run in a fixed order and the first
//! exclusion wins:
//!
//! 1. empty href, or href containing an excluded marker
//! 2. title shorter than the minimum, or a navigation label
//! 3. title longer than the maximum
//! 4. title without a character of the required script
//! 5. href outside the site's own domain
//!
//! Survivors are tagged [`Classification::Article`] when the href matches an
//! article pattern, [`Classification::Other`] otherwise.

use crate::models::{AnchorRecord, Classification, ClassifiedRecord, Decision, ExclusionReason};
use crate::rules::ExtractionRule;
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use url::Url;

/// Decide whether `record` is a headline candidate under `rule`.
pub fn classify(record: &AnchorRecord, rule: &ExtractionRule) -> Decision {
    use ExclusionReason::*;

    let href = record.href.as_str();
    let title = record.text.as_str();

    if href.is_empty() {
        return Decision::Exclude(EmptyHref);
    }
    if rule.excluded_markers.iter().any(|m| href.contains(m.as_str())) {
        return Decision::Exclude(ExcludedMarker);
    }

    let chars = record.title_chars();
    if chars < rule.min_title_chars {
        return Decision::Exclude(TooShort);
    }
    // Every string starts with itself, so this covers exact matches too.
    if rule
        .nav_labels
        .iter()
        .any(|label| title.starts_with(label.as_str()))
    {
        return Decision::Exclude(NavigationLabel);
    }
    if chars > rule.max_title_chars {
        return Decision::Exclude(TooLong);
    }
    if let Some(script) = rule.required_script {
        if !script.appears_in(title) {
            return Decision::Exclude(MissingScript);
        }
    }
    if !on_required_domain(href, &rule.required_domains) {
        return Decision::Exclude(ForeignDomain);
    }

    if rule.article_patterns.iter().any(|p| p.matches(href)) {
        Decision::Include(Classification::Article)
    } else {
        Decision::Include(Classification::Other)
    }
}

/// Classify every record of one document, keeping survivors in scan order.
///
/// Exclusion tallies are logged at debug level.
#[instrument(level = "debug", skip_all, fields(%source))]
pub fn classify_document<I>(records: I, rule: &ExtractionRule, source: &str) -> Vec<ClassifiedRecord>
where
    I: IntoIterator<Item = AnchorRecord>,
{
    let mut kept = Vec::new();
    let mut excluded: BTreeMap<&'static str, usize> = BTreeMap::new();

    for record in records {
        match classify(&record, rule) {
            Decision::Include(class) => kept.push(ClassifiedRecord { record, class }),
            Decision::Exclude(reason) => *excluded.entry(reason.as_str()).or_default() += 1,
        }
    }

    debug!(kept = kept.len(), ?excluded, "Classified anchors");
    kept
}

/// The host is tested when the href parses, the whole href otherwise.
fn on_required_domain(href: &str, domains: &[String]) -> bool {
    if domains.is_empty() {
        return true;
    }
    let parsed = Url::parse(href).ok();
    let haystack = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .unwrap_or(href);
    domains.iter().any(|d| haystack.contains(d.as_str()))
}
