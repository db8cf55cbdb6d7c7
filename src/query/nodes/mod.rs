//! Concrete query node implementations
//!
//! Primitive nodes (term, multi-term, phrase, boolean) execute against an
//! [`IndexReader`](crate::index::IndexReader). Expansion nodes (wildcard,
//! fuzzy, range) and preprocessing nodes only rewrite into primitive ones.

use crate::error::{QueryError, Result};
use crate::index::Term;
use crate::query::ast::Query;
use crate::query::Occur;

/// Implements the execution half of the node protocol for nodes that must
/// be rewritten first; `query_terms` reports the terms of the last rewrite
macro_rules! unrewritten_execution {
    ($message:literal) => {
        fn optimize(
            &self,
            _index: &dyn $crate::index::IndexReader,
        ) -> $crate::error::Result<$crate::query::Query> {
            Err($crate::error::QueryError::unsupported($message))
        }

        fn create_weight(
            &mut self,
            _reader: &dyn $crate::index::IndexReader,
        ) -> $crate::error::Result<()> {
            Err($crate::error::QueryError::unsupported($message))
        }

        fn has_weight(&self) -> bool {
            false
        }

        fn sum_of_squared_weights(&self) -> $crate::error::Result<f32> {
            Err($crate::error::QueryError::unsupported($message))
        }

        fn normalize(&mut self, _query_norm: f32) -> $crate::error::Result<()> {
            Err($crate::error::QueryError::unsupported($message))
        }

        fn reset(&mut self) {}

        fn execute(
            &mut self,
            _reader: &dyn $crate::index::IndexReader,
            _docs_filter: Option<&roaring::RoaringBitmap>,
        ) -> $crate::error::Result<()> {
            Err($crate::error::QueryError::unsupported($message))
        }

        fn matched_docs(&self) -> $crate::error::Result<roaring::RoaringBitmap> {
            Err($crate::error::QueryError::unsupported($message))
        }

        fn score(
            &self,
            _doc: u32,
            _reader: &dyn $crate::index::IndexReader,
        ) -> $crate::error::Result<f32> {
            Err($crate::error::QueryError::unsupported($message))
        }

        fn query_terms(&self) -> $crate::error::Result<Vec<$crate::index::Term>> {
            self.matches.clone().ok_or_else(|| {
                $crate::error::QueryError::unsupported(
                    "Rewrite operation has to be done before retrieving query terms.",
                )
            })
        }
    };
}

mod bool_query;
mod empty;
mod fuzzy_query;
mod multi_term_query;
mod phrase_query;
pub mod preprocessing;
mod range_query;
mod term_query;
mod wildcard_query;

pub use bool_query::BooleanQuery;
pub use empty::{EmptyResultQuery, InsignificantQuery};
pub use fuzzy_query::{
    levenshtein_distance, FuzzyQuery, DEFAULT_MIN_SIMILARITY, DEFAULT_PREFIX_LENGTH,
};
pub use multi_term_query::MultiTermQuery;
pub use phrase_query::PhraseQuery;
pub use preprocessing::{
    PreprocessingFuzzy, PreprocessingPhrase, PreprocessingQuery, PreprocessingTerm,
};
pub use range_query::RangeQuery;
pub use term_query::TermQuery;
pub use wildcard_query::{WildcardQuery, DEFAULT_MIN_PREFIX_LENGTH};

/// Terms a single expansion may produce unless configured otherwise
pub const DEFAULT_TERMS_LIMIT: usize = 1024;

/// Fail once an expansion grows past `limit` (0 means unlimited)
pub(crate) fn check_terms_limit(count: usize, limit: usize) -> Result<()> {
    if limit != 0 && count > limit {
        return Err(QueryError::TooManyTerms { limit });
    }
    Ok(())
}

/// Shape the terms found by an expansion into a primitive query
pub(crate) fn expansion_to_query(matches: &[Term], boost: f32) -> Query {
    match matches {
        [] => Query::empty_result(),
        [term] => TermQuery::new(term.clone()).with_boost(boost).into(),
        _ => MultiTermQuery::from_terms(
            matches
                .iter()
                .map(|term| (term.clone(), Occur::Optional)),
        )
        .with_boost(boost)
        .into(),
    }
}

/// Three-document index shared by node tests
///
/// Fields in order: `title`, `body` (analyzed) and `id` (keyword).
#[cfg(test)]
pub(crate) fn test_index() -> crate::index::MemoryIndex {
    use crate::analysis::StandardAnalyzer;
    use crate::config::AnalyzerConfig;
    use crate::index::{Document, MemoryIndex};
    use std::sync::Arc;

    let analyzer = Arc::new(StandardAnalyzer::new(&AnalyzerConfig::default()).unwrap());
    let mut index = MemoryIndex::new(analyzer);
    index.declare_field("title");
    index.declare_field("body");
    index.declare_field("id");

    index.add_document(
        Document::new()
            .text("title", "Rust in Action")
            .text("body", "rust programming language guide")
            .keyword("id", "A-1"),
    );
    index.add_document(
        Document::new()
            .text("title", "Programming Rust")
            .text("body", "systems programming with rust and cargo"),
    );
    index.add_document(
        Document::new()
            .text("title", "Java Basics")
            .text("body", "java programming for beginners"),
    );
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_limit() {
        assert!(check_terms_limit(1024, 1024).is_ok());
        assert!(check_terms_limit(1025, 1024).is_err());
        assert!(check_terms_limit(usize::MAX, 0).is_ok());
    }

    #[test]
    fn test_expansion_shapes() {
        assert!(expansion_to_query(&[], 1.0).is_empty_result());

        let one = [Term::in_field("body", "rust")];
        assert_eq!(expansion_to_query(&one, 2.0).to_string(), "body:rust^2");

        let two = [Term::in_field("body", "rust"), Term::in_field("title", "rust")];
        assert_eq!(expansion_to_query(&two, 1.0).to_string(), "body:rust title:rust");
    }
}
