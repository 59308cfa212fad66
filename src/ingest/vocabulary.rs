//! Domain vocabulary lexicon
//!
//! Detects Sanskrit/Pali terms inside chunk text so retrieval metadata can
//! carry them. The term list is configuration, not logic: a built-in lexicon
//! ships via `include_str!` and a config path can replace it wholesale.
//! Matching requires the diacritic-preserving normalization upstream — a
//! stripped "Krsna" would no longer be the same term.

use std::path::Path;

use lazy_static::lazy_static;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::errors::Result;

// Built-in lexicon, one canonical term per line with tab-separated variants
const BUILTIN_LEXICON: &str = include_str!("../data/vocabulary.txt");

lazy_static! {
    static ref BUILTIN: VocabularyLexicon = VocabularyLexicon::parse(BUILTIN_LEXICON);
}

#[derive(Debug, Clone)]
struct VocabTerm {
    canonical: String,
    /// Lowercased NFC search forms, canonical included
    search_forms: Vec<String>,
}

/// Lookup set of domain-vocabulary terms
#[derive(Debug, Clone)]
pub struct VocabularyLexicon {
    terms: Vec<VocabTerm>,
}

impl VocabularyLexicon {
    /// The built-in lexicon shipped with the crate
    #[must_use]
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Parse lexicon content: one term per line, variants tab separated,
    /// `#` comments and blank lines ignored
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut terms = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t').map(str::trim).filter(|f| !f.is_empty());
            let Some(canonical) = fields.next() else {
                continue;
            };
            let canonical: String = canonical.nfc().collect();
            let mut search_forms: Vec<String> = vec![canonical.to_lowercase()];
            for variant in fields {
                let form: String = variant.nfc().collect::<String>().to_lowercase();
                if !search_forms.contains(&form) {
                    search_forms.push(form);
                }
            }
            terms.push(VocabTerm {
                canonical,
                search_forms,
            });
        }
        Self { terms }
    }

    /// Load a replacement lexicon from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let lexicon = Self::parse(&content);
        debug!(
            "Loaded vocabulary lexicon: {} terms from {}",
            lexicon.len(),
            path.as_ref().display()
        );
        Ok(lexicon)
    }

    /// Scan text for lexicon terms, returning canonical forms in lexicon
    /// order, each at most once
    #[must_use]
    pub fn scan(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        let mut found = Vec::new();
        for term in &self.terms {
            if term
                .search_forms
                .iter()
                .any(|form| contains_word(&haystack, form))
            {
                found.push(term.canonical.clone());
            }
        }
        found
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Substring search with word-boundary checks on both sides
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(needle) {
        let at = from + pos;
        let end = at + needle.len();
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
