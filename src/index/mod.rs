//! Index reader abstraction
//!
//! The query tree never touches storage directly. Everything it needs from
//! an index (vocabulary, postings, norms, similarity) goes through
//! [`IndexReader`].

pub mod memory;
pub mod similarity;

use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::fmt;

pub use memory::{Document, MemoryIndex};
pub use similarity::{DefaultSimilarity, Similarity};

/// A (field, text) pair from the index vocabulary
///
/// A term without a field is a query-side placeholder resolved during rewrite.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    pub field: Option<String>,
    pub text: String,
}

impl Term {
    pub fn new(text: impl Into<String>, field: Option<String>) -> Self {
        Self {
            field,
            text: text.into(),
        }
    }

    pub fn in_field(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            text: text.into(),
        }
    }

    pub fn unqualified(text: impl Into<String>) -> Self {
        Self {
            field: None,
            text: text.into(),
        }
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}:{}", field, self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Read access to an index, as seen by query rewrite and execution
pub trait IndexReader {
    /// Exact (binary) vocabulary lookup
    fn has_term(&self, term: &Term) -> bool;

    /// Field names in declaration order
    fn field_names(&self, indexed_only: bool) -> Vec<String>;

    fn similarity(&self) -> &dyn Similarity;

    /// Sorted vocabulary of one field
    fn terms(&self, field: &str) -> Vec<String>;

    fn num_docs(&self) -> u32;

    fn doc_freq(&self, term: &Term) -> u32;

    fn term_docs(&self, term: &Term) -> RoaringBitmap;

    fn term_freqs(&self, term: &Term) -> HashMap<u32, u32>;

    fn term_positions(&self, term: &Term) -> HashMap<u32, Vec<u32>>;

    /// Length normalization factor of `field` in `doc`
    fn norm(&self, doc: u32, field: &str) -> f32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_display() {
        assert_eq!(Term::in_field("title", "rust").to_string(), "title:rust");
        assert_eq!(Term::unqualified("rust").to_string(), "rust");
    }

    #[test]
    fn test_term_ordering() {
        let mut terms = vec![
            Term::in_field("b", "a"),
            Term::in_field("a", "z"),
            Term::in_field("a", "b"),
        ];
        terms.sort();
        assert_eq!(terms[0], Term::in_field("a", "b"));
        assert_eq!(terms[2], Term::in_field("b", "a"));
    }
}
