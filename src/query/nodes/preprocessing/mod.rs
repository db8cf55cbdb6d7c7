//! Preprocessing nodes: raw query text waiting for rewrite
//!
//! The parser produces these nodes without looking at any index. `rewrite`
//! analyzes the text and resolves it against the index vocabulary; they
//! cannot be optimized or executed.

mod fuzzy;
mod phrase;
mod term;

use roaring::RoaringBitmap;
use std::fmt;

use crate::error::Result;
use crate::index::{IndexReader, Term};
use crate::query::ast::{Query, QueryNode};

pub use fuzzy::PreprocessingFuzzy;
pub use phrase::PreprocessingPhrase;
pub use term::PreprocessingTerm;

/// Characters rendered with a leading backslash in canonical strings
const SYNTAX_CHARS: &str = ":()[]{}!|&+-~^?";

/// An un-rewritten node
#[derive(Clone, Debug)]
pub enum PreprocessingQuery {
    Term(PreprocessingTerm),
    Phrase(PreprocessingPhrase),
    Fuzzy(PreprocessingFuzzy),
}

macro_rules! dispatch_preprocessing {
    ($query:expr, $node:ident => $body:expr) => {
        match $query {
            PreprocessingQuery::Term($node) => $body,
            PreprocessingQuery::Phrase($node) => $body,
            PreprocessingQuery::Fuzzy($node) => $body,
        }
    };
}

impl QueryNode for PreprocessingQuery {
    fn query_type(&self) -> &'static str {
        dispatch_preprocessing!(self, node => node.query_type())
    }

    fn boost(&self) -> f32 {
        dispatch_preprocessing!(self, node => node.boost())
    }

    fn set_boost(&mut self, boost: f32) {
        dispatch_preprocessing!(self, node => node.set_boost(boost))
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        dispatch_preprocessing!(self, node => node.rewrite(index))
    }

    fn optimize(&self, index: &dyn IndexReader) -> Result<Query> {
        dispatch_preprocessing!(self, node => node.optimize(index))
    }

    fn create_weight(&mut self, reader: &dyn IndexReader) -> Result<()> {
        dispatch_preprocessing!(self, node => node.create_weight(reader))
    }

    fn has_weight(&self) -> bool {
        false
    }

    fn sum_of_squared_weights(&self) -> Result<f32> {
        dispatch_preprocessing!(self, node => node.sum_of_squared_weights())
    }

    fn normalize(&mut self, query_norm: f32) -> Result<()> {
        dispatch_preprocessing!(self, node => node.normalize(query_norm))
    }

    fn reset(&mut self) {}

    fn execute(
        &mut self,
        reader: &dyn IndexReader,
        docs_filter: Option<&RoaringBitmap>,
    ) -> Result<()> {
        dispatch_preprocessing!(self, node => node.execute(reader, docs_filter))
    }

    fn matched_docs(&self) -> Result<RoaringBitmap> {
        dispatch_preprocessing!(self, node => node.matched_docs())
    }

    fn score(&self, doc: u32, reader: &dyn IndexReader) -> Result<f32> {
        dispatch_preprocessing!(self, node => node.score(doc, reader))
    }

    fn query_terms(&self) -> Result<Vec<Term>> {
        dispatch_preprocessing!(self, node => node.query_terms())
    }
}

impl fmt::Display for PreprocessingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch_preprocessing!(self, node => fmt::Display::fmt(node, f))
    }
}

macro_rules! impl_from_preprocessing {
    ($($variant:ident($node:ty)),* $(,)?) => {
        $(
            impl From<$node> for PreprocessingQuery {
                fn from(node: $node) -> Self {
                    PreprocessingQuery::$variant(node)
                }
            }

            impl From<$node> for Query {
                fn from(node: $node) -> Self {
                    Query::Preprocessing(PreprocessingQuery::$variant(node))
                }
            }
        )*
    };
}

impl_from_preprocessing!(
    Term(PreprocessingTerm),
    Phrase(PreprocessingPhrase),
    Fuzzy(PreprocessingFuzzy),
);

/// Backslash-escape syntax characters not already escaped
pub(crate) fn escape_word(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    let mut previous = None;
    for ch in word.chars() {
        if SYNTAX_CHARS.contains(ch) && previous != Some('\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
        previous = Some(ch);
    }
    escaped
}

#[cfg(test)]
pub(crate) fn test_context() -> std::sync::Arc<crate::query::QueryContext> {
    use crate::analysis::StandardAnalyzer;
    use crate::config::AnalyzerConfig;

    let analyzer = StandardAnalyzer::new(&AnalyzerConfig::default()).unwrap();
    std::sync::Arc::new(crate::query::QueryContext::new(std::sync::Arc::new(analyzer)))
}
