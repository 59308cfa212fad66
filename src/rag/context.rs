//! Context assembly from retrieved passages

use std::collections::HashMap;

use crate::rag::SearchResult;

/// Assembler for creating LLM-ready context from search results
pub struct ContextAssembler {
    max_context_length: usize,
}

impl ContextAssembler {
    /// Create a new context assembler
    #[must_use]
    pub const fn new(max_context_length: usize) -> Self {
        Self { max_context_length }
    }

    /// Assemble context from search results
    #[must_use]
    pub fn assemble(&self, results: &[SearchResult]) -> String {
        let mut context = String::new();
        let mut total_length = 0;

        for (idx, result) in results.iter().enumerate() {
            let entry = format!(
                "\n[Passage {}]{}\n{}\n",
                idx + 1,
                format_citations(result),
                result.chunk.text
            );

            if total_length + entry.len() > self.max_context_length {
                break;
            }

            context.push_str(&entry);
            total_length += entry.len();
        }

        context
    }

    /// Assemble context with per-passage metadata
    #[must_use]
    pub fn assemble_with_metadata(
        &self,
        results: &[SearchResult],
    ) -> (String, Vec<HashMap<String, String>>) {
        let mut context = String::new();
        let mut metadata = Vec::new();
        let mut total_length = 0;

        for (idx, result) in results.iter().enumerate() {
            let entry = format!(
                "\n[Passage {}]{}\n{}\n",
                idx + 1,
                format_citations(result),
                result.chunk.text
            );

            if total_length + entry.len() > self.max_context_length {
                break;
            }

            context.push_str(&entry);
            total_length += entry.len();

            // Add metadata
            let mut meta = HashMap::new();
            meta.insert("chunk_id".to_string(), result.chunk.id.clone());
            meta.insert(
                "source".to_string(),
                result.chunk.provenance.source_name.clone(),
            );
            meta.insert(
                "tradition".to_string(),
                result.chunk.provenance.tradition.clone(),
            );
            meta.insert("score".to_string(), format!("{:.4}", result.score));
            if let Some(citation) = result.citations.first() {
                meta.insert("citation".to_string(), citation.reference());
            }
            if !result.chunk.vocabulary.is_empty() {
                meta.insert("vocabulary".to_string(), result.chunk.vocabulary.join(", "));
            }
            metadata.push(meta);
        }

        (context, metadata)
    }

    /// Create a summary of the retrieved passages
    #[must_use]
    pub fn create_summary(&self, results: &[SearchResult]) -> String {
        if results.is_empty() {
            return "No passages found.".to_string();
        }

        let mut summary = format!("Found {} relevant passage(s):\n\n", results.len());

        for (idx, result) in results.iter().enumerate().take(5) {
            let reference = result
                .citations
                .first()
                .map_or_else(
                    || result.chunk.provenance.source_name.clone(),
                    crate::models::Citation::reference,
                );
            let preview = truncate_str(&result.chunk.text, 100);

            summary.push_str(&format!(
                "{}. {} - Score: {:.2}\n   {}\n\n",
                idx + 1,
                reference,
                result.score,
                preview
            ));
        }

        summary
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(4000) // Default max context length
    }
}

fn format_citations(result: &SearchResult) -> String {
    if result.citations.is_empty() {
        return String::new();
    }
    let refs: Vec<String> = result
        .citations
        .iter()
        .map(crate::models::Citation::reference)
        .collect();
    format!(" ({})", refs.join("; "))
}

/// Truncate at a char boundary, appending an ellipsis when shortened
fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use crate::models::Citation;
    use crate::models::Provenance;

    fn sample_result(text: &str, score: f32, citation: Option<Citation>) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: "a-0000".to_string(),
                document_id: uuid::Uuid::new_v4(),
                text: text.to_string(),
                span: 0..text.len(),
                structural_range: None,
                vocabulary: vec!["dharma".to_string()],
                provenance: Provenance {
                    source_name: "bhagavad-gita".to_string(),
                    title: None,
                    author: None,
                    tradition: "vedanta".to_string(),
                    language: "en".to_string(),
                    personality: None,
                },
            },
            score,
            citations: citation.into_iter().collect(),
        }
    }

    fn gita_citation() -> Citation {
        Citation {
            source: "Bhagavad Gita".to_string(),
            chapter: Some(2),
            verse_start: Some(47),
            verse_end: Some(47),
            relevance: 0.9,
        }
    }

    #[test]
    fn test_assemble_includes_citations() {
        let assembler = ContextAssembler::default();
        let results = vec![sample_result(
            "Your right is to action alone.",
            0.9,
            Some(gita_citation()),
        )];

        let context = assembler.assemble(&results);
        assert!(context.contains("[Passage 1]"));
        assert!(context.contains("Bhagavad Gita 2.47"));
        assert!(context.contains("Your right is to action alone."));
    }

    #[test]
    fn test_assemble_respects_length_bound() {
        let assembler = ContextAssembler::new(80);
        let results = vec![
            sample_result(&"long passage text ".repeat(10), 0.9, None),
            sample_result("second passage", 0.8, None),
        ];

        let context = assembler.assemble(&results);
        assert!(context.len() <= 80);
    }

    #[test]
    fn test_metadata_carries_scores_and_citation() {
        let assembler = ContextAssembler::default();
        let results = vec![sample_result("passage", 0.8765, Some(gita_citation()))];

        let (_, metadata) = assembler.assemble_with_metadata(&results);
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].get("score").unwrap(), "0.8765");
        assert_eq!(metadata[0].get("citation").unwrap(), "Bhagavad Gita 2.47");
        assert_eq!(metadata[0].get("vocabulary").unwrap(), "dharma");
    }

    #[test]
    fn test_summary_empty_results() {
        let assembler = ContextAssembler::default();
        assert_eq!(assembler.create_summary(&[]), "No passages found.");
    }
}
