//! Text normalization for ingestion and queries
//!
//! Collapses redundant whitespace and canonicalizes Unicode while keeping
//! paragraph breaks intact. NFC composition only: NFKC or any
//! diacritic-stripping step would change the identity of Sanskrit and Pali
//! terms (Kṛṣṇa, mokṣa, mettā) and break vocabulary detection downstream,
//! so losing a diacritic here is a correctness bug, not a style choice.

use unicode_normalization::UnicodeNormalization;

/// Normalize raw document or query text.
///
/// Pure and idempotent: `normalize(normalize(x)) == normalize(x)`.
/// - Unicode NFC composition (combining marks fold into precomposed forms)
/// - line endings unified, control characters and tabs become spaces
/// - runs of whitespace collapse to a single space within lines
/// - runs of blank lines collapse to a single paragraph break
#[must_use]
pub fn normalize(raw: &str) -> String {
    let composed: String = raw.nfc().collect();

    let mut lines: Vec<String> = Vec::with_capacity(composed.lines().count());
    for line in composed.lines() {
        let cleaned: String = line
            .chars()
            .map(|c| if c == '\t' || c.is_control() { ' ' } else { c })
            .collect();
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        lines.push(collapsed);
    }

    let mut out = String::with_capacity(composed.len());
    let mut pending_break = false;
    for line in &lines {
        if line.is_empty() {
            pending_break = true;
            continue;
        }
        if !out.is_empty() {
            if pending_break {
                out.push_str("\n\n");
            } else {
                out.push('\n');
            }
        }
        out.push_str(line);
        pending_break = false;
    }
    out
}
