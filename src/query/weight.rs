//! Per-node scoring weights

use crate::index::{IndexReader, Term};

/// Normalized scoring factors of a term-based node
///
/// Built once per top-level execution: the sum of squares of every weight in
/// the tree feeds the similarity's query norm, which is pushed back down
/// through `normalize`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weight {
    idf: f32,
    query_weight: f32,
    query_norm: f32,
    value: f32,
}

impl Weight {
    pub fn new(idf: f32, boost: f32) -> Self {
        Self {
            idf,
            query_weight: idf * boost,
            query_norm: 1.0,
            value: 0.0,
        }
    }

    pub fn for_term(term: &Term, boost: f32, reader: &dyn IndexReader) -> Self {
        let idf = reader
            .similarity()
            .idf(reader.doc_freq(term), reader.num_docs());
        Self::new(idf, boost)
    }

    /// Weight of a group of terms scored together (phrase): idf values add up
    pub fn for_terms(terms: &[Term], boost: f32, reader: &dyn IndexReader) -> Self {
        let similarity = reader.similarity();
        let num_docs = reader.num_docs();
        let idf = terms
            .iter()
            .map(|term| similarity.idf(reader.doc_freq(term), num_docs))
            .sum();
        Self::new(idf, boost)
    }

    pub fn sum_of_squared_weights(&self) -> f32 {
        self.query_weight * self.query_weight
    }

    pub fn normalize(&mut self, query_norm: f32) {
        self.query_norm = query_norm;
        self.query_weight *= query_norm;
        self.value = self.query_weight * self.idf;
    }

    pub fn idf(&self) -> f32 {
        self.idf
    }

    pub fn query_norm(&self) -> f32 {
        self.query_norm
    }

    /// Final factor used by scoring, valid after `normalize`
    pub fn value(&self) -> f32 {
        self.value
    }
}
