//! Structure-aware chunking
//!
//! Cuts normalized document text into bounded retrieval units. When
//! structural markers exist, verse boundaries are inviolable: a chunk grows
//! by whole verses and a single verse is never divided, even past the length
//! target. Without markers the chunker falls back to paragraph splitting,
//! merging short paragraphs and subdividing oversized ones at sentence
//! boundaries.

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use super::vocabulary::VocabularyLexicon;
use crate::config::ChunkingConfig;
use crate::errors::Result;
use crate::errors::VedaRagError;
use crate::models::Chunk;
use crate::models::Document;
use crate::models::MarkerKind;
use crate::models::StructuralRange;
use crate::models::StructureMarker;

/// A contiguous piece of source text awaiting assembly into chunks.
///
/// Marker segments arrive whole and stay whole; plain segments were already
/// cut down to at most the hard ceiling.
#[derive(Debug, Clone)]
struct Segment {
    span: Range<usize>,
    /// Opens a new chapter: always starts a fresh chunk
    chapter_break: bool,
    chapter: Option<u32>,
    verse: Option<u32>,
}

/// Accumulator for one chunk under construction
struct Building {
    span: Range<usize>,
    chars: usize,
    opens_chapter: bool,
    first_chapter: Option<u32>,
    first_verse: Option<u32>,
    last_chapter: Option<u32>,
    last_verse: Option<u32>,
}

impl Building {
    fn start(seg: &Segment, seg_chars: usize) -> Self {
        Self {
            span: seg.span.clone(),
            chars: seg_chars,
            opens_chapter: seg.chapter_break,
            first_chapter: seg.chapter,
            first_verse: seg.verse,
            last_chapter: seg.chapter,
            last_verse: seg.verse,
        }
    }

    fn extend(&mut self, seg: &Segment, seg_chars: usize) {
        self.span.end = seg.span.end;
        self.chars += 1 + seg_chars;
        if self.first_chapter.is_none() {
            self.first_chapter = seg.chapter;
        }
        if self.first_verse.is_none() {
            self.first_verse = seg.verse;
        }
        if seg.chapter.is_some() {
            self.last_chapter = seg.chapter;
        }
        if seg.verse.is_some() {
            self.last_verse = seg.verse;
        }
    }

    fn has_structure(&self) -> bool {
        self.first_chapter.is_some() || self.first_verse.is_some()
    }
}

/// Structure-aware text chunker
pub struct Chunker {
    config: ChunkingConfig,
    lexicon: Arc<VocabularyLexicon>,
}

impl Chunker {
    pub fn new(config: ChunkingConfig, lexicon: Arc<VocabularyLexicon>) -> Self {
        Self { config, lexicon }
    }

    /// Cut a normalized document into ordered chunks.
    ///
    /// # Errors
    /// `NoContent` when nothing extractable remains after normalization —
    /// callers must be able to tell "found nothing" from "chunked fine".
    pub fn chunk(&self, document: &Document, markers: &[StructureMarker]) -> Result<Vec<Chunk>> {
        let text = document.text.as_str();
        if text.trim().is_empty() {
            return Err(VedaRagError::NoContent(document.source_name.clone()));
        }

        let segments = if markers.is_empty() {
            debug!(
                "No structural markers in {}; falling back to paragraph chunking",
                document.source_name
            );
            self.plain_segments(text, 0..text.len())
        } else {
            self.marker_segments(text, markers)
        };

        let chunks = self.assemble(document, &segments);
        if chunks.is_empty() {
            return Err(VedaRagError::NoContent(document.source_name.clone()));
        }
        Ok(chunks)
    }

    /// Segments for a marked-up document: marker units stay whole, the gaps
    /// between them (preambles, chapter intros) become plain segments.
    fn marker_segments(&self, text: &str, markers: &[StructureMarker]) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut cursor = 0usize;

        for marker in markers {
            if marker.span.start > cursor {
                segments.extend(self.plain_segments(text, cursor..marker.span.start));
            }
            segments.push(Segment {
                span: marker.span.clone(),
                chapter_break: marker.kind == MarkerKind::Chapter,
                chapter: marker.chapter,
                verse: marker.verse,
            });
            cursor = cursor.max(marker.span.end);
        }

        if cursor < text.len() {
            segments.extend(self.plain_segments(text, cursor..text.len()));
        }

        segments
    }

    /// Paragraph segments for unmarked text, with oversized paragraphs cut
    /// down at sentence boundaries.
    fn plain_segments(&self, text: &str, range: Range<usize>) -> Vec<Segment> {
        let mut segments = Vec::new();
        let slice = &text[range.clone()];
        let mut offset = range.start;

        for para in slice.split("\n\n") {
            let span = trim_span(text, offset..offset + para.len());
            offset += para.len() + 2;
            if span.is_empty() {
                continue;
            }

            if char_len(text, &span) <= self.config.max_chars {
                segments.push(plain(span));
            } else {
                for piece in self.split_oversized(text, &span) {
                    segments.push(plain(piece));
                }
            }
        }

        segments
    }

    /// Split a span that exceeds the ceiling: sentence boundaries first,
    /// forced word grouping for sentences that are themselves too long.
    fn split_oversized(&self, text: &str, span: &Range<usize>) -> Vec<Range<usize>> {
        let mut pieces = Vec::new();
        let mut cur: Option<Range<usize>> = None;

        for sentence in sentence_spans(text, span) {
            if char_len(text, &sentence) > self.config.max_chars {
                if let Some(c) = cur.take() {
                    pieces.push(c);
                }
                pieces.extend(self.word_group(text, &sentence));
                continue;
            }
            match cur.take() {
                None => cur = Some(sentence),
                Some(c) => {
                    let combined = c.start..sentence.end;
                    if char_len(text, &combined) <= self.config.target_chars {
                        cur = Some(combined);
                    } else {
                        pieces.push(c);
                        cur = Some(sentence);
                    }
                }
            }
        }
        if let Some(c) = cur {
            pieces.push(c);
        }
        pieces
    }

    /// Last-resort split: group whitespace-delimited words up to the target,
    /// slicing through a single over-long token at char boundaries.
    fn word_group(&self, text: &str, span: &Range<usize>) -> Vec<Range<usize>> {
        let slice = &text[span.clone()];
        let mut pieces = Vec::new();
        let mut cur: Option<Range<usize>> = None; // byte offsets within slice
        let mut cur_chars = 0usize;

        for (start, end) in word_spans(slice) {
            let word_chars = slice[start..end].chars().count();

            if word_chars > self.config.max_chars {
                if let Some(c) = cur.take() {
                    pieces.push(c);
                }
                pieces.extend(char_windows(slice, start..end, self.config.target_chars));
                cur_chars = 0;
                continue;
            }

            match cur.take() {
                None => {
                    cur = Some(start..end);
                    cur_chars = word_chars;
                }
                Some(c) if cur_chars + 1 + word_chars <= self.config.target_chars => {
                    cur = Some(c.start..end);
                    cur_chars += 1 + word_chars;
                }
                Some(c) => {
                    pieces.push(c);
                    cur = Some(start..end);
                    cur_chars = word_chars;
                }
            }
        }
        if let Some(c) = cur {
            pieces.push(c);
        }

        pieces
            .into_iter()
            .map(|r| span.start + r.start..span.start + r.end)
            .collect()
    }

    /// Assemble segments into chunks: accumulate toward the target length,
    /// flush on chapter breaks, keep marker segments whole.
    fn assemble(&self, document: &Document, segments: &[Segment]) -> Vec<Chunk> {
        let text = document.text.as_str();
        let mut built: Vec<Building> = Vec::new();
        let mut cur: Option<Building> = None;

        for seg in segments {
            let seg_chars = char_len(text, &seg.span);
            if seg_chars == 0 {
                continue;
            }

            let take = match &cur {
                None => true,
                // Chapter headings always open a fresh chunk
                Some(_) if seg.chapter_break => false,
                Some(b) => {
                    let combined = b.chars + 1 + seg_chars;
                    combined <= self.config.target_chars
                        || (b.chars < self.config.min_chars && combined <= self.config.max_chars)
                }
            };

            if take {
                match cur.as_mut() {
                    None => cur = Some(Building::start(seg, seg_chars)),
                    Some(b) => b.extend(seg, seg_chars),
                }
            } else {
                built.push(cur.take().expect("flush implies a chunk in progress"));
                cur = Some(Building::start(seg, seg_chars));
            }
        }
        if let Some(b) = cur {
            built.push(b);
        }

        self.merge_trailing_runts(text, &mut built);

        built
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                let span = trim_span(text, b.span.clone());
                if span.is_empty() {
                    return None;
                }
                let chunk_text = text[span.clone()].to_string();
                Some(Chunk {
                    id: Chunk::derive_id(&document.fingerprint, i),
                    document_id: document.id,
                    vocabulary: self.lexicon.scan(&chunk_text),
                    text: chunk_text,
                    span,
                    structural_range: b.has_structure().then(|| StructuralRange {
                        chapter_start: b.first_chapter,
                        verse_start: b.first_verse,
                        chapter_end: b.last_chapter,
                        verse_end: b.last_verse,
                    }),
                    provenance: document.provenance(),
                })
            })
            .collect()
    }

    /// Fold undersized chunks back into their predecessor when the ceiling
    /// allows and no chapter boundary separates them.
    fn merge_trailing_runts(&self, text: &str, built: &mut Vec<Building>) {
        let mut i = 1;
        while i < built.len() {
            let small = built[i].chars < self.config.min_chars && !built[i].opens_chapter;
            let fits = built[i - 1].chars + 1 + built[i].chars <= self.config.max_chars;
            if small && fits {
                let absorbed = built.remove(i);
                let prev = &mut built[i - 1];
                prev.span.end = absorbed.span.end;
                prev.chars = char_len(text, &prev.span);
                if absorbed.last_chapter.is_some() {
                    prev.last_chapter = absorbed.last_chapter;
                }
                if absorbed.last_verse.is_some() {
                    prev.last_verse = absorbed.last_verse;
                }
                if prev.first_chapter.is_none() {
                    prev.first_chapter = absorbed.first_chapter;
                }
                if prev.first_verse.is_none() {
                    prev.first_verse = absorbed.first_verse;
                }
            } else {
                i += 1;
            }
        }
    }
}

fn plain(span: Range<usize>) -> Segment {
    Segment {
        span,
        chapter_break: false,
        chapter: None,
        verse: None,
    }
}

fn char_len(text: &str, span: &Range<usize>) -> usize {
    text[span.clone()].chars().count()
}

/// Shrink a span to its non-whitespace core
fn trim_span(text: &str, span: Range<usize>) -> Range<usize> {
    let slice = &text[span.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let core = slice.trim();
    let start = span.start + leading;
    start..start + core.len()
}

/// Sentence spans within a span: boundaries after terminal punctuation
/// followed by whitespace. The danda (।) terminates Sanskrit verse lines.
fn sentence_spans(text: &str, span: &Range<usize>) -> Vec<Range<usize>> {
    let slice = &text[span.clone()];
    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut iter = slice.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?' | '।') {
            let at_boundary = iter.peek().map_or(true, |&(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + c.len_utf8();
                let piece = trim_span(text, span.start + start..span.start + end);
                if !piece.is_empty() {
                    spans.push(piece);
                }
                start = end;
            }
        }
    }

    if start < slice.len() {
        let piece = trim_span(text, span.start + start..span.end);
        if !piece.is_empty() {
            spans.push(piece);
        }
    }

    if spans.is_empty() {
        spans.push(span.clone());
    }
    spans
}

/// Byte spans of whitespace-delimited words
fn word_spans(slice: &str) -> Vec<(usize, usize)> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in slice.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                words.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        words.push((s, slice.len()));
    }
    words
}

/// Fixed-size char windows through a span, for tokens with no whitespace
fn char_windows(slice: &str, range: Range<usize>, window: usize) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = range.start;
    let mut count = 0usize;
    for (i, c) in slice[range.clone()].char_indices() {
        count += 1;
        if count == window {
            let end = range.start + i + c.len_utf8();
            out.push(start..end);
            start = end;
            count = 0;
        }
    }
    if start < range.end {
        out.push(start..range.end);
    }
    out
}
