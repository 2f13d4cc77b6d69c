//! Aggregation of per-source candidates into the final headline list.
//!
//! # Steps
//!
//! 1. Per source, article-classified records come first, then the rest,
//!    each group in scan order.
//! 2. Titles are deduplicated within the source and the list is cut to
//!    `max_items`.
//! 3. Sources are merged in priority order. Once the selections taken so
//!    far add up to `max_items`, counting cross-source repeats, no further
//!    source is fetched.
//! 4. Titles are deduplicated across sources (the earlier source wins) and
//!    the total is cut to `max_items`.
//!
//! All cross-source state lives in a [`DigestRun`] owned by one invocation.

use crate::classifier::classify_document;
use crate::fetcher::DocumentFetcher;
use crate::models::{AnchorRecord, Classification, ClassifiedRecord, HeadlineItem};
use crate::rules::SourceConfig;
use crate::scanner::scan_document;
use itertools::Itertools;
use std::collections::HashSet;
use tracing::{info, instrument, warn};

/// Accumulated state of one aggregation.
#[derive(Debug, Default)]
pub struct DigestRun {
    seen: HashSet<String>,
    items: Vec<HeadlineItem>,
    /// Records taken from sources so far, before cross-source dedup.
    accumulated: usize,
}

impl DigestRun {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn accumulated(&self) -> usize {
        self.accumulated
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<HeadlineItem> {
        self.items
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AggregationPipeline {
    max_items: usize,
}

impl AggregationPipeline {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    /// Whether enough has been accumulated to stop pulling sources.
    pub fn is_full(&self, run: &DigestRun) -> bool {
        run.accumulated >= self.max_items
    }

    /// Order one source's survivors article-first, drop repeated titles and
    /// bound the result.
    pub fn select_for_source(&self, classified: Vec<ClassifiedRecord>) -> Vec<AnchorRecord> {
        let (articles, others): (Vec<_>, Vec<_>) = classified
            .into_iter()
            .partition(|c| c.class == Classification::Article);

        articles
            .into_iter()
            .chain(others)
            .map(|c| c.record)
            .unique_by(|r| r.text.clone())
            .take(self.max_items)
            .collect()
    }

    /// Merge one source's selection into `run`. Returns how many items were
    /// added after cross-source dedup.
    pub fn absorb(&self, run: &mut DigestRun, source: &str, records: Vec<AnchorRecord>) -> usize {
        let before = run.len();
        run.accumulated += records.len();
        for record in records {
            if run.len() >= self.max_items {
                break;
            }
            if run.seen.insert(record.text.clone()) {
                run.items.push(HeadlineItem::from_record(record, source));
            }
        }
        run.len() - before
    }

    /// Aggregate already classified input, given per source in priority
    /// order.
    pub fn aggregate<S>(&self, per_source: Vec<(S, Vec<ClassifiedRecord>)>) -> Vec<HeadlineItem>
    where
        S: AsRef<str>,
    {
        let mut run = DigestRun::default();
        for (source, classified) in per_source {
            if self.is_full(&run) {
                break;
            }
            let selected = self.select_for_source(classified);
            self.absorb(&mut run, source.as_ref(), selected);
        }
        run.into_items()
    }

    /// Fetch, scan and classify each source in turn until the digest is
    /// full.
    #[instrument(level = "info", skip_all, fields(max_items = self.max_items, sources = sources.len()))]
    pub async fn run<F>(&self, fetcher: &F, sources: &[SourceConfig]) -> Vec<HeadlineItem>
    where
        F: DocumentFetcher,
    {
        let mut run = DigestRun::default();
        for (index, source) in sources.iter().enumerate() {
            if self.is_full(&run) {
                info!(
                    skipped = sources.len() - index,
                    "Digest is full; not fetching remaining sources"
                );
                break;
            }
            let classified = harvest_source(fetcher, source).await;
            let candidates = classified.len();
            let selected = self.select_for_source(classified);
            let added = self.absorb(&mut run, &source.name, selected);
            info!(
                source = %source.name,
                candidates,
                added,
                accumulated = run.accumulated(),
                total = run.len(),
                "Merged source"
            );
        }

        if run.is_empty() {
            warn!("No headlines collected from any source");
        }
        run.into_items()
    }
}

/// Fetch one source and classify its anchors. Any failure means the source
/// contributes nothing.
#[instrument(level = "info", skip_all, fields(source = %source.name, url = %source.url))]
pub async fn harvest_source<F>(fetcher: &F, source: &SourceConfig) -> Vec<ClassifiedRecord>
where
    F: DocumentFetcher,
{
    match fetcher.fetch(&source.url).await {
        Ok(markup) => {
            let anchors = scan_document(&markup, &source.url);
            classify_document(anchors, &source.rule, &source.name)
        }
        Err(e) => {
            warn!(error = %e, "Fetch failed; source contributes no items");
            Vec::new()
        }
    }
}
