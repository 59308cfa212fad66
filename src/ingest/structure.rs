//! Structure detection: chapter headings and verse numbers
//!
//! Recognizes the hierarchical numbering idioms common to scriptural texts:
//! chapter-class headings ("Chapter 2", "CANTO XI") and "N.M" verse numbers
//! at line starts ("2.47"). Detection is deterministic and side-effect-free;
//! a text with no recognizable idiom yields an empty sequence, which signals
//! the chunker to fall back to paragraph splitting.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::MarkerKind;
use crate::models::StructureMarker;

lazy_static! {
    /// Chapter-class headings on their own line
    static ref CHAPTER_RE: Regex = Regex::new(
        r"(?mi)^(?:chapter|canto|book|part|adhyaya)\s+(\d{1,3}|[ivxlcdm]{1,7})\b[^\n]*$"
    )
    .expect("chapter pattern is valid");
    /// "N.M" verse numbers at line starts, optionally followed by '.' or ':'
    static ref VERSE_RE: Regex =
        Regex::new(r"(?m)^(\d{1,3})\.(\d{1,3})\b[.:]?").expect("verse pattern is valid");
}

/// Detector for hierarchical markers in normalized text
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureDetector;

impl StructureDetector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Detect markers in normalized text, ordered by offset.
    ///
    /// Verse marker spans cover the verse unit (from the number to the next
    /// marker or end of text); chapter marker spans cover the heading line
    /// only, so long chapter bodies stay splittable between verses.
    #[must_use]
    pub fn detect(&self, text: &str) -> Vec<StructureMarker> {
        // (start, provisional_end, kind, chapter, verse, raw)
        let mut found: Vec<(usize, usize, MarkerKind, Option<u32>, Option<u32>, String)> =
            Vec::new();

        for cap in CHAPTER_RE.captures_iter(text) {
            let whole = cap.get(0).expect("match group 0 always present");
            let number = parse_chapter_number(&cap[1]);
            found.push((
                whole.start(),
                whole.end(),
                MarkerKind::Chapter,
                number,
                None,
                whole.as_str().trim().to_string(),
            ));
        }

        for cap in VERSE_RE.captures_iter(text) {
            let whole = cap.get(0).expect("match group 0 always present");
            let chapter = cap[1].parse().ok();
            let verse = cap[2].parse().ok();
            found.push((
                whole.start(),
                // Verse units run to the next marker; patched below
                text.len(),
                MarkerKind::Verse,
                chapter,
                verse,
                format!("{}.{}", &cap[1], &cap[2]),
            ));
        }

        found.sort_by_key(|m| m.0);

        let starts: Vec<usize> = found.iter().map(|m| m.0).collect();
        found
            .into_iter()
            .enumerate()
            .map(|(i, (start, end, kind, chapter, verse, raw))| {
                let span_end = match kind {
                    MarkerKind::Chapter => end,
                    MarkerKind::Verse => starts.get(i + 1).copied().unwrap_or(text.len()),
                };
                // Trailing separators belong to no unit
                let span_end = start + text[start..span_end].trim_end().len();
                StructureMarker {
                    span: start..span_end,
                    kind,
                    chapter,
                    verse,
                    raw,
                }
            })
            .collect()
    }
}

/// Parse a decimal or roman-numeral chapter number
fn parse_chapter_number(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Some(n);
    }
    parse_roman(raw)
}

fn parse_roman(raw: &str) -> Option<u32> {
    let mut total: u32 = 0;
    let mut prev = 0u32;
    for c in raw.to_ascii_uppercase().chars() {
        let value = match c {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        if prev < value {
            total = total.checked_sub(prev)?;
            total += value - prev;
        } else {
            total += value;
        }
        prev = value;
    }
    (total > 0).then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_VERSES: &str = "Chapter 2\n\n2.47 Your right is to action alone, \
never to its fruits.\n\n2.48 Perform actions firm in yoga, abandoning attachment.";

    #[test]
    fn test_detects_chapter_and_verses() {
        let markers = StructureDetector::new().detect(TWO_VERSES);
        assert_eq!(markers.len(), 3);

        assert_eq!(markers[0].kind, MarkerKind::Chapter);
        assert_eq!(markers[0].chapter, Some(2));
        assert_eq!(markers[0].raw, "Chapter 2");

        assert_eq!(markers[1].kind, MarkerKind::Verse);
        assert_eq!(markers[1].chapter, Some(2));
        assert_eq!(markers[1].verse, Some(47));

        assert_eq!(markers[2].verse, Some(48));
        // Last verse unit runs to end of text
        assert_eq!(markers[2].span.end, TWO_VERSES.len());
    }

    #[test]
    fn test_markers_ordered_by_offset() {
        let markers = StructureDetector::new().detect(TWO_VERSES);
        for pair in markers.windows(2) {
            assert!(pair[0].span.start < pair[1].span.start);
        }
    }

    #[test]
    fn test_verse_span_covers_unit() {
        let markers = StructureDetector::new().detect(TWO_VERSES);
        let verse = &markers[1];
        let unit = &TWO_VERSES[verse.span.clone()];
        assert!(unit.starts_with("2.47"));
        assert!(unit.contains("never to its fruits"));
        assert!(!unit.contains("2.48"));
    }

    #[test]
    fn test_chapter_span_is_heading_line() {
        let markers = StructureDetector::new().detect(TWO_VERSES);
        let chapter = &markers[0];
        assert_eq!(&TWO_VERSES[chapter.span.clone()], "Chapter 2");
    }

    #[test]
    fn test_roman_numeral_chapters() {
        let text = "CANTO XI\n\nThe universal form is revealed.";
        let markers = StructureDetector::new().detect(text);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].chapter, Some(11));
    }

    #[test]
    fn test_no_structure_yields_empty() {
        let text = "A plain narrative paragraph with no numbering at all.\n\n\
Another paragraph, still unmarked.";
        assert!(StructureDetector::new().detect(text).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let a = StructureDetector::new().detect(TWO_VERSES);
        let b = StructureDetector::new().detect(TWO_VERSES);
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_roman() {
        assert_eq!(parse_roman("IV"), Some(4));
        assert_eq!(parse_roman("xviii"), Some(18));
        assert_eq!(parse_roman("MCMXC"), Some(1990));
        assert_eq!(parse_roman("abc"), None);
    }
}
