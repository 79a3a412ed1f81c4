//! Rendering of search results as a numbered list of blocks.

use std::fmt::Write;

use serde::Serialize;

use crate::router::Dataset;
use crate::search::{SearchHit, SearchOutcome};

/// Markdown for one routed search: a header naming the dataset, then one
/// block per hit with title, source label and body text.
pub fn render_markdown(outcome: &SearchOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "**Searching in:** `{}` data", outcome.dataset);
    out.push('\n');
    out.push_str(&render_hits(&outcome.hits));
    out
}

/// The result blocks alone, numbered from 1.
pub fn render_hits(hits: &[SearchHit]) -> String {
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let _ = writeln!(out, "### {}. {}", i + 1, hit.record.startup);
        let _ = writeln!(out, "**Source:** {}", hit.record.source_type);
        let _ = writeln!(out, "{}", hit.record.text);
        out.push('\n');
    }
    out
}

/// JSON shape of one hit in the HTTP response.
#[derive(Debug, Clone, Serialize)]
pub struct HitView {
    pub rank: usize,
    pub ordinal: u32,
    pub distance: f32,
    pub startup: String,
    pub source_type: String,
    pub text: String,
}

/// JSON shape of a search response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchView {
    pub dataset: Dataset,
    pub took_ms: u64,
    pub total_hits: usize,
    pub hits: Vec<HitView>,
}

impl From<SearchOutcome> for SearchView {
    fn from(outcome: SearchOutcome) -> Self {
        let hits: Vec<HitView> = outcome
            .hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| HitView {
                rank: i + 1,
                ordinal: hit.ordinal,
                distance: hit.distance,
                startup: hit.record.startup,
                source_type: hit.record.source_type,
                text: hit.record.text,
            })
            .collect();

        SearchView {
            dataset: outcome.dataset,
            took_ms: outcome.took_ms,
            total_hits: hits.len(),
            hits,
        }
    }
}
