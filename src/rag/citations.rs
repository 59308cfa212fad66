//! Citation resolution against canonical source patterns
//!
//! Maps chunk provenance deterministically onto known canonical works so a
//! retrieved passage can be verified at its source ("Bhagavad Gita 2.47").
//! The pattern table is configuration: a built-in table ships via
//! `include_str!` and a config path can replace it. Zero matches is a valid
//! outcome — an uncited passage is never coerced into a guessed citation.

use std::path::Path;

use lazy_static::lazy_static;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::errors::Result;
use crate::models::Citation;
use crate::models::Provenance;
use crate::models::StructuralRange;

// Built-in table: canonical name per line, tab-separated name patterns
const BUILTIN_SOURCES: &str = include_str!("../data/canonical_sources.tsv");

lazy_static! {
    static ref BUILTIN: CitationResolver = CitationResolver::parse(BUILTIN_SOURCES);
}

#[derive(Debug, Clone)]
struct CanonicalSource {
    canonical: String,
    /// Lowercased NFC patterns
    patterns: Vec<String>,
}

/// Deterministic, pure citation resolver
#[derive(Debug, Clone)]
pub struct CitationResolver {
    sources: Vec<CanonicalSource>,
}

impl CitationResolver {
    /// The built-in canonical source table
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Parse table content: canonical name then tab-separated patterns,
    /// `#` comments and blank lines ignored
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut sources = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t').map(str::trim).filter(|f| !f.is_empty());
            let Some(canonical) = fields.next() else {
                continue;
            };
            let mut patterns: Vec<String> = vec![fold(canonical)];
            for pattern in fields {
                let folded = fold(pattern);
                if !patterns.contains(&folded) {
                    patterns.push(folded);
                }
            }
            sources.push(CanonicalSource {
                canonical: canonical.to_string(),
                patterns,
            });
        }
        Self { sources }
    }

    /// Load a replacement table from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let resolver = Self::parse(&content);
        debug!(
            "Loaded canonical source table: {} works from {}",
            resolver.len(),
            path.as_ref().display()
        );
        Ok(resolver)
    }

    /// Resolve provenance to citations.
    ///
    /// The source name and title are matched against every known work's
    /// patterns; matches carry the chunk's structural range. An empty
    /// result means the passage is uncited, not that resolution failed.
    #[must_use]
    pub fn resolve(
        &self,
        provenance: &Provenance,
        structural: Option<&StructuralRange>,
        relevance: f32,
    ) -> Vec<Citation> {
        let mut candidates = vec![fold(&provenance.source_name)];
        if let Some(title) = &provenance.title {
            candidates.push(fold(title));
        }

        let mut citations = Vec::new();
        for source in &self.sources {
            let matched = source.patterns.iter().any(|pattern| {
                candidates
                    .iter()
                    .any(|candidate| candidate == pattern || contains_phrase(candidate, pattern))
            });
            if matched {
                citations.push(Citation {
                    source: source.canonical.clone(),
                    chapter: structural.and_then(|r| r.chapter_start),
                    verse_start: structural.and_then(|r| r.verse_start),
                    verse_end: structural.and_then(|r| r.verse_end),
                    relevance,
                });
            }
        }
        citations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Fold a name for matching: NFC, lowercase, separators to spaces
fn fold(name: &str) -> String {
    let composed: String = name.nfc().collect();
    composed
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == '_' || c == '.' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Phrase search with word boundaries on both sides
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(phrase) {
        let at = from + pos;
        let end = at + phrase.len();
        let before_ok = haystack[..at]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        from = end;
    }
    false
}
