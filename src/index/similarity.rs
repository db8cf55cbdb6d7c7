//! Scoring factors supplied by the index reader

/// Scoring factors consumed by query weights and node scoring
pub trait Similarity: Send + Sync {
    /// Normalization applied to the top-level sum of squared weights
    fn query_norm(&self, sum_of_squared_weights: f32) -> f32;

    fn tf(&self, freq: f32) -> f32;

    fn idf(&self, doc_freq: u32, num_docs: u32) -> f32;

    /// Reward for matching `overlap` of `max_overlap` optional clauses
    fn coord(&self, overlap: usize, max_overlap: usize) -> f32;

    /// Frequency contribution of a sloppy phrase match at edit distance `distance`
    fn sloppy_freq(&self, distance: u32) -> f32;
}

/// Classic Lucene TF-IDF factors
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSimilarity;

impl Similarity for DefaultSimilarity {
    fn query_norm(&self, sum_of_squared_weights: f32) -> f32 {
        if sum_of_squared_weights <= 0.0 {
            return 1.0;
        }
        1.0 / sum_of_squared_weights.sqrt()
    }

    fn tf(&self, freq: f32) -> f32 {
        freq.sqrt()
    }

    fn idf(&self, doc_freq: u32, num_docs: u32) -> f32 {
        1.0 + (num_docs as f32 / (doc_freq as f32 + 1.0)).ln()
    }

    fn coord(&self, overlap: usize, max_overlap: usize) -> f32 {
        if max_overlap == 0 {
            return 0.0;
        }
        overlap as f32 / max_overlap as f32
    }

    fn sloppy_freq(&self, distance: u32) -> f32 {
        1.0 / (distance as f32 + 1.0)
    }
}
