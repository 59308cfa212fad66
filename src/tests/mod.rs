//! Shared fixtures for scenario tests: a deterministic embedding gate and
//! sample source texts in the shapes the chunker has to handle.


use async_trait::async_trait;

use crate::embeddings::EmbeddingGate;
use crate::errors::Result;
use crate::errors::VedaRagError;

/// Deterministic embedding gate: hashed character trigrams, unit-normalized.
/// Texts sharing words share trigrams, so lexical overlap maps to cosine
/// similarity — enough signal for retrieval tests without a model.
pub struct MockEmbeddingGate {
    dimension: usize,
}

impl MockEmbeddingGate {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn embed_text(text: &str, dimension: usize) -> Vec<f32> {
        let chars: Vec<char> = text.to_lowercase().chars().collect();
        let mut vector = vec![0.0f32; dimension];
        for window in chars.windows(3) {
            // Inline FNV-1a keeps this reproducible across runs
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for c in window {
                hash ^= u64::from(*c as u32);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            vector[(hash % dimension as u64) as usize] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingGate for MockEmbeddingGate {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::embed_text(text, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Gate that always fails hard, for propagation tests
pub struct UnavailableGate {
    dimension: usize,
}

impl UnavailableGate {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingGate for UnavailableGate {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(VedaRagError::EmbeddingUnavailable(
            "connection refused".to_string(),
        ))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Gate that always times out, for retry-policy distinction tests
pub struct TimeoutGate {
    dimension: usize,
}

impl TimeoutGate {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingGate for TimeoutGate {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(VedaRagError::EmbeddingTimeout(30))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Two-chapter verse text: "N.M" markers, verse lengths varying with
/// position, several thousand characters total.
pub fn sample_gita_text() -> String {
    let themes = [
        "the embodied self discards worn garments and takes new ones",
        "your right is to action alone, never to the fruits of action",
        "the steady mind rests in yoga, abandoning all attachment",
        "what is night for all beings is waking for the disciplined",
        "the wise grieve neither for the living nor for the dead",
        "as fire is obscured by smoke, wisdom is obscured by desire",
    ];
    let mut text = String::from("Chapter 2\n\n");
    for verse in 1..=28 {
        let theme = themes[verse % themes.len()];
        text.push_str(&format!("2.{verse} Thus spoke the teacher: {theme}.\n\n"));
    }
    text.push_str("Chapter 3\n\n");
    for verse in 1..=20 {
        let theme = themes[(verse + 3) % themes.len()];
        text.push_str(&format!(
            "3.{verse} And further: {theme}, so the seeker learns.\n\n"
        ));
    }
    text
}

/// Unmarked narrative text: paragraphs only, no recognizable structure.
pub fn sample_narrative_text() -> String {
    let sentences = [
        "The pilgrim left the village before first light and walked east along the river.",
        "Mist lifted slowly from the water while herons stood motionless in the shallows.",
        "At the ford an old ferryman waited, who had carried travellers across for forty years.",
        "They spoke little on the crossing, and the far bank smelled of wet earth and woodsmoke.",
        "By midday the road climbed through terraced fields where children waved from the walls.",
        "The pilgrim ate flatbread in the shade of a banyan and watched clouds build over the hills.",
    ];
    let mut text = String::new();
    for i in 0..12 {
        let mut para = String::new();
        for j in 0..4 {
            para.push_str(sentences[(i + j) % sentences.len()]);
            para.push(' ');
        }
        text.push_str(para.trim());
        text.push_str("\n\n");
    }
    text
}

#[cfg(test)]
mod fixture_tests {
    use super::*;

    #[test]
    fn test_mock_gate_is_deterministic() {
        let a = MockEmbeddingGate::embed_text("dharma and action", 16);
        let b = MockEmbeddingGate::embed_text("dharma and action", 16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_mock_gate_similarity_tracks_overlap() {
        let base = MockEmbeddingGate::embed_text("your right is to action alone", 64);
        let close = MockEmbeddingGate::embed_text("the right to action alone", 64);
        let far = MockEmbeddingGate::embed_text("herons stood in the shallows", 64);

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&base, &close) > dot(&base, &far));
    }

    #[test]
    fn test_sample_texts_have_expected_shape() {
        let gita = sample_gita_text();
        assert!(gita.len() > 3000);
        assert!(gita.contains("2.28"));

        let narrative = sample_narrative_text();
        assert!(narrative.len() > 4000);
        assert!(!narrative.contains("Chapter"));
    }
}
