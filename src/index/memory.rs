//! In-memory index
//!
//! A small positional index used as the reference [`IndexReader`] for
//! rewriting and executing queries without a storage engine.

use roaring::RoaringBitmap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::similarity::{DefaultSimilarity, Similarity};
use super::{IndexReader, Term};
use crate::analysis::Analyzer;

#[derive(Clone, Debug)]
enum FieldValue {
    /// Run through the analyzer
    Text(String),
    /// Indexed verbatim as a single term
    Keyword(String),
}

/// A document to add to a [`MemoryIndex`]
#[derive(Clone, Debug, Default)]
pub struct Document {
    fields: Vec<(String, FieldValue)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .push((field.into(), FieldValue::Text(value.into())));
        self
    }

    pub fn keyword(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .push((field.into(), FieldValue::Keyword(value.into())));
        self
    }
}

/// Postings of one term: doc -> positions
type Postings = BTreeMap<u32, Vec<u32>>;

pub struct MemoryIndex {
    analyzer: Arc<dyn Analyzer>,
    similarity: Box<dyn Similarity>,
    /// Field names in first-seen order
    fields: Vec<String>,
    /// field -> term text -> postings
    postings: HashMap<String, BTreeMap<String, Postings>>,
    /// (doc, field) -> length norm
    norms: HashMap<(u32, String), f32>,
    num_docs: u32,
}

impl MemoryIndex {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            similarity: Box::new(DefaultSimilarity),
            fields: Vec::new(),
            postings: HashMap::new(),
            norms: HashMap::new(),
            num_docs: 0,
        }
    }

    pub fn with_similarity(mut self, similarity: impl Similarity + 'static) -> Self {
        self.similarity = Box::new(similarity);
        self
    }

    /// Declare a field up front so it keeps its place in field order
    pub fn declare_field(&mut self, field: impl Into<String>) {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.postings.entry(field.clone()).or_default();
            self.fields.push(field);
        }
    }

    /// Add a document and return its doc number
    pub fn add_document(&mut self, document: Document) -> u32 {
        let doc = self.num_docs;
        self.num_docs += 1;

        // next free position per field, so repeated fields keep counting
        let mut next_position: HashMap<String, u32> = HashMap::new();

        for (field, value) in document.fields {
            self.declare_field(field.clone());
            let position = next_position.entry(field.clone()).or_insert(0);
            let terms = self.postings.entry(field.clone()).or_default();

            match value {
                FieldValue::Keyword(value) => {
                    terms
                        .entry(value)
                        .or_default()
                        .entry(doc)
                        .or_default()
                        .push(*position);
                    *position += 1;
                }
                FieldValue::Text(value) => {
                    let mut current: i64 = *position as i64 - 1;
                    for token in self.analyzer.tokenize(&value) {
                        current += token.position_increment as i64;
                        terms
                            .entry(token.text)
                            .or_default()
                            .entry(doc)
                            .or_default()
                            .push(current.max(0) as u32);
                    }
                    *position = (current + 1).max(*position as i64) as u32;
                }
            }
        }

        for (field, length) in next_position {
            let norm = if length == 0 {
                1.0
            } else {
                1.0 / (length as f32).sqrt()
            };
            self.norms.insert((doc, field), norm);
        }

        doc
    }

    fn postings(&self, term: &Term) -> Option<&Postings> {
        let field = term.field.as_ref()?;
        self.postings.get(field)?.get(&term.text)
    }
}

impl std::fmt::Debug for MemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIndex")
            .field("fields", &self.fields)
            .field("num_docs", &self.num_docs)
            .finish()
    }
}

impl IndexReader for MemoryIndex {
    fn has_term(&self, term: &Term) -> bool {
        self.postings(term).is_some()
    }

    fn field_names(&self, _indexed_only: bool) -> Vec<String> {
        // every field of a memory index is indexed
        self.fields.clone()
    }

    fn similarity(&self) -> &dyn Similarity {
        self.similarity.as_ref()
    }

    fn terms(&self, field: &str) -> Vec<String> {
        self.postings
            .get(field)
            .map(|terms| terms.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn num_docs(&self) -> u32 {
        self.num_docs
    }

    fn doc_freq(&self, term: &Term) -> u32 {
        self.postings(term).map_or(0, |p| p.len() as u32)
    }

    fn term_docs(&self, term: &Term) -> RoaringBitmap {
        self.postings(term)
            .map(|p| p.keys().copied().collect())
            .unwrap_or_default()
    }

    fn term_freqs(&self, term: &Term) -> HashMap<u32, u32> {
        self.postings(term)
            .map(|p| {
                p.iter()
                    .map(|(doc, positions)| (*doc, positions.len() as u32))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn term_positions(&self, term: &Term) -> HashMap<u32, Vec<u32>> {
        self.postings(term)
            .map(|p| p.iter().map(|(doc, positions)| (*doc, positions.clone())).collect())
            .unwrap_or_default()
    }

    fn norm(&self, doc: u32, field: &str) -> f32 {
        self.norms
            .get(&(doc, field.to_string()))
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::config::AnalyzerConfig;

    fn index() -> MemoryIndex {
        let analyzer = Arc::new(StandardAnalyzer::new(&AnalyzerConfig::default()).unwrap());
        let mut index = MemoryIndex::new(analyzer);
        index.add_document(
            Document::new()
                .text("title", "Rust in Action")
                .keyword("id", "A-1"),
        );
        index.add_document(Document::new().text("title", "Action rust rust"));
        index
    }

    #[test]
    fn test_vocabulary() {
        let index = index();
        assert_eq!(index.field_names(true), vec!["title", "id"]);
        assert_eq!(index.terms("title"), vec!["action", "in", "rust"]);
        assert!(index.has_term(&Term::in_field("id", "A-1")));
        assert!(!index.has_term(&Term::in_field("id", "a-1")));
        assert!(!index.has_term(&Term::unqualified("rust")));
    }

    #[test]
    fn test_postings() {
        let index = index();
        let rust = Term::in_field("title", "rust");

        assert_eq!(index.num_docs(), 2);
        assert_eq!(index.doc_freq(&rust), 2);
        assert_eq!(index.term_freqs(&rust).get(&1), Some(&2));
        assert_eq!(index.term_positions(&rust).get(&1), Some(&vec![1, 2]));
        assert!(index.term_docs(&rust).contains(0));
    }

    #[test]
    fn test_norms() {
        let index = index();
        assert!((index.norm(0, "title") - 1.0 / 3f32.sqrt()).abs() < 1e-6);
        assert_eq!(index.norm(1, "id"), 0.0);
    }
}
