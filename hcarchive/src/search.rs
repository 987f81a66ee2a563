use owo_colors::OwoColorize;
use std::path::Path;

use crate::error::IndexError;
use crate::index::{MessageIndex, SearchHit};

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_SEARCH_LIMIT: usize = 100;
pub const WRAP_WIDTH: usize = 120;

/// Drops hits scoring below `threshold`, keeping the ranking of the rest.
pub fn filter_hits(hits: Vec<SearchHit>, threshold: f32) -> Vec<SearchHit> {
    hits.into_iter().filter(|hit| hit.score >= threshold).collect()
}

pub fn search(
    index_dir: &Path,
    query: &str,
    threshold: f32,
    limit: usize,
) -> Result<Vec<SearchHit>, IndexError> {
    let index = MessageIndex::open(index_dir)?;
    let hits = index.search(query, limit)?;
    Ok(filter_hits(hits, threshold))
}

pub fn wrap_body(body: &str) -> String {
    textwrap::fill(body, WRAP_WIDTH)
}

/// Plain rendering of one hit: a header with score, sender, recipient and
/// date, followed by the wrapped body.
pub fn render_hit(hit: &SearchHit) -> String {
    let doc = &hit.document;
    format!(
        "[{:.3}] From: {} | To: {} | Date: {}\n{}\n",
        hit.score,
        doc.from.join(", "),
        doc.to.join(", "),
        doc.date,
        wrap_body(&doc.body)
    )
}

pub fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("{} No results.", "ℹ".blue());
        return;
    }

    let rule = "-".repeat(WRAP_WIDTH);
    for hit in hits {
        print!("{}", render_hit(hit));
        println!("{}", rule.dimmed());
    }
}
