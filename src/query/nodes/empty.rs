//! Nodes that match no documents
//!
//! The two differ only in how a parent boolean treats them during optimize:
//! an insignificant clause is dropped as if it never existed, while an empty
//! result that is required empties the whole parent.

use roaring::RoaringBitmap;
use std::fmt;

use crate::error::Result;
use crate::index::{IndexReader, Term};
use crate::query::ast::{Query, QueryNode};

/// Produced by queries that reduce to nothing searchable (stop words only, `NOT x`)
#[derive(Clone, Debug)]
pub struct InsignificantQuery {
    boost: f32,
}

impl Default for InsignificantQuery {
    fn default() -> Self {
        Self { boost: 1.0 }
    }
}

/// Produced when the index cannot match a query (unknown term, empty expansion)
#[derive(Clone, Debug)]
pub struct EmptyResultQuery {
    boost: f32,
}

impl Default for EmptyResultQuery {
    fn default() -> Self {
        Self { boost: 1.0 }
    }
}

macro_rules! impl_matches_nothing {
    ($node:ty, $name:literal, $rendered:literal) => {
        impl QueryNode for $node {
            fn query_type(&self) -> &'static str {
                $name
            }

            fn boost(&self) -> f32 {
                self.boost
            }

            fn set_boost(&mut self, boost: f32) {
                self.boost = boost;
            }

            fn rewrite(&mut self, _index: &dyn IndexReader) -> Result<Query> {
                Ok(self.clone().into())
            }

            fn optimize(&self, _index: &dyn IndexReader) -> Result<Query> {
                Ok(self.clone().into())
            }

            fn create_weight(&mut self, _reader: &dyn IndexReader) -> Result<()> {
                Ok(())
            }

            fn has_weight(&self) -> bool {
                true
            }

            fn sum_of_squared_weights(&self) -> Result<f32> {
                Ok(1.0)
            }

            fn normalize(&mut self, _query_norm: f32) -> Result<()> {
                Ok(())
            }

            fn reset(&mut self) {}

            fn execute(
                &mut self,
                _reader: &dyn IndexReader,
                _docs_filter: Option<&RoaringBitmap>,
            ) -> Result<()> {
                Ok(())
            }

            fn matched_docs(&self) -> Result<RoaringBitmap> {
                Ok(RoaringBitmap::new())
            }

            fn score(&self, _doc: u32, _reader: &dyn IndexReader) -> Result<f32> {
                Ok(0.0)
            }

            fn query_terms(&self) -> Result<Vec<Term>> {
                Ok(Vec::new())
            }
        }

        impl fmt::Display for $node {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($rendered)
            }
        }
    };
}

impl_matches_nothing!(InsignificantQuery, "insignificant", "<InsignificantQuery>");
impl_matches_nothing!(EmptyResultQuery, "empty_result", "<EmptyQuery>");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::config::AnalyzerConfig;
    use crate::index::MemoryIndex;
    use std::sync::Arc;

    #[test]
    fn test_rewrite_is_identity() {
        let analyzer = Arc::new(StandardAnalyzer::new(&AnalyzerConfig::default()).unwrap());
        let index = MemoryIndex::new(analyzer);

        let mut query = InsignificantQuery::default();
        assert!(query.rewrite(&index).unwrap().is_insignificant());

        let mut query = EmptyResultQuery::default();
        let mut rewritten = query.rewrite(&index).unwrap();
        assert!(rewritten.is_empty_result());

        rewritten.execute(&index, None).unwrap();
        assert!(rewritten.matched_docs().unwrap().is_empty());
        assert_eq!(rewritten.score(0, &index).unwrap(), 0.0);
    }
}
