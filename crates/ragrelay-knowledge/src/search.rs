//! Passage scoring and context selection.

use crate::chunker::{Passage, split_passages};
use crate::keywords::{Category, query_categories};

/// Max passages joined from the ranked path.
pub const TOP_K: usize = 4;
/// Passages used as a generic overview when nothing scores.
pub const OVERVIEW_PASSAGES: usize = 3;
pub const CATEGORY_WEIGHT: u32 = 10;
pub const WORD_WEIGHT: u32 = 1;
pub const FAQ_BOOST: u32 = 5;

const FAQ_PREFIXES: [&str; 3] = ["Q:", "Where", "How"];
const PASSAGE_SEPARATOR: &str = "\n\n";

/// A query lower-cased and broken into its scoring signals once.
#[derive(Debug)]
pub struct PreparedQuery {
    categories: Vec<&'static Category>,
    words: Vec<String>,
}

impl PreparedQuery {
    pub fn new(query: &str) -> Self {
        let lowered = query.to_lowercase();
        let categories = query_categories(&lowered).collect();
        let words = lowered
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .map(String::from)
            .collect();
        Self { categories, words }
    }

    /// Additive relevance score of `passage` for this query.
    pub fn score(&self, passage: &str) -> u32 {
        let lowered = passage.to_lowercase();
        let mut score = 0;

        for category in &self.categories {
            if category.matches(&lowered) {
                score += CATEGORY_WEIGHT;
                tracing::debug!(
                    "✓ Category match '{}' in passage starting: {}",
                    category.name,
                    preview(passage, 50)
                );
            }
        }

        score += self
            .words
            .iter()
            .filter(|w| lowered.contains(w.as_str()))
            .count() as u32
            * WORD_WEIGHT;

        if is_faq(passage) {
            score += FAQ_BOOST;
        }

        score
    }
}

fn is_faq(passage: &str) -> bool {
    let trimmed = passage.trim();
    FAQ_PREFIXES.iter().any(|p| trimmed.starts_with(p))
}

/// Score a single passage against a raw query.
pub fn score_passage(query: &str, passage: &str) -> u32 {
    PreparedQuery::new(query).score(passage)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredPassage<'a> {
    pub score: u32,
    pub passage: Passage<'a>,
}

/// Score every passage and keep those above zero, best first.
///
/// The sort is stable, so equal scores keep document order.
pub fn rank<'a>(query: &str, passages: &[Passage<'a>]) -> Vec<ScoredPassage<'a>> {
    let prepared = PreparedQuery::new(query);
    let mut scored: Vec<ScoredPassage<'a>> = passages
        .iter()
        .map(|p| ScoredPassage { score: prepared.score(p.text), passage: *p })
        .filter(|s| s.score > 0)
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Outcome of context selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Top-scoring passages joined by a blank line.
    Ranked { context: String, passages: usize },
    /// Nothing scored; the first few passages as a generic overview.
    Overview(String),
    /// The document has no passages at all.
    Empty,
}

impl Selection {
    pub fn context(&self) -> &str {
        match self {
            Selection::Ranked { context, .. } | Selection::Overview(context) => context,
            Selection::Empty => "",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.context().is_empty()
    }
}

/// Pick the context from ranked candidates, falling back to an overview.
pub fn select_context(ranked: &[ScoredPassage<'_>], passages: &[Passage<'_>]) -> Selection {
    if !ranked.is_empty() {
        let top: Vec<&str> = ranked.iter().take(TOP_K).map(|s| s.passage.text).collect();
        return Selection::Ranked {
            passages: top.len(),
            context: top.join(PASSAGE_SEPARATOR),
        };
    }

    if passages.is_empty() {
        return Selection::Empty;
    }

    let overview: Vec<&str> = passages
        .iter()
        .take(OVERVIEW_PASSAGES)
        .map(|p| p.text)
        .collect();
    Selection::Overview(overview.join(PASSAGE_SEPARATOR))
}

/// Full retrieval: split, score, select.
pub fn retrieve(query: &str, knowledge: &str) -> Selection {
    tracing::info!("🔍 Searching for: '{}'", query);

    let passages = split_passages(knowledge);
    tracing::info!("📑 Split knowledge base into {} passages", passages.len());

    let ranked = rank(query, &passages);
    for s in &ranked {
        tracing::debug!("Passage #{} score: {}", s.passage.position, s.score);
    }

    let selection = select_context(&ranked, &passages);
    match &selection {
        Selection::Ranked { context, passages } => tracing::info!(
            "✅ Found {} relevant passages, total length: {}",
            passages,
            context.len()
        ),
        Selection::Overview(_) => tracing::warn!("⚠️ No specific matches, returning overview"),
        Selection::Empty => tracing::error!("❌ Knowledge base has no passages"),
    }
    selection
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
