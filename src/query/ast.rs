//! Query tree representation
//!
//! Every node kind implements the [`QueryNode`] protocol; [`Query`] is the
//! tagged union the parser produces and rewrite/optimize pass around.
//!
//! The lifecycle of a tree is fixed: parse, `rewrite` against an index,
//! `optimize`, then `execute` and `score`. Rewrite always returns a new tree;
//! the source tree keeps only the record of terms it matched, which feeds
//! highlighting.

use roaring::RoaringBitmap;
use std::fmt;

use super::highlight::Highlighter;
use super::nodes::{
    BooleanQuery, EmptyResultQuery, FuzzyQuery, InsignificantQuery, MultiTermQuery,
    PhraseQuery, PreprocessingQuery, RangeQuery, TermQuery, WildcardQuery,
};
use crate::error::Result;
use crate::index::{IndexReader, Term};

/// Core protocol shared by all query nodes
pub trait QueryNode: fmt::Display + fmt::Debug {
    /// Get the query type name for debugging and logging
    fn query_type(&self) -> &'static str;

    fn boost(&self) -> f32;

    fn set_boost(&mut self, boost: f32);

    /// Replace this node with an equivalent built only from primitive nodes
    /// resolved against the index vocabulary
    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query>;

    /// Restructure a rewritten tree for cheaper evaluation without changing matches
    fn optimize(&self, index: &dyn IndexReader) -> Result<Query>;

    /// Build this node's (and its children's) weights, without normalizing
    fn create_weight(&mut self, reader: &dyn IndexReader) -> Result<()>;

    fn has_weight(&self) -> bool;

    fn sum_of_squared_weights(&self) -> Result<f32>;

    fn normalize(&mut self, query_norm: f32) -> Result<()>;

    /// Drop weights and execution state so the node can run against another reader
    fn reset(&mut self);

    /// Compute the candidate documents of this node
    fn execute(
        &mut self,
        reader: &dyn IndexReader,
        docs_filter: Option<&RoaringBitmap>,
    ) -> Result<()>;

    /// Candidate set computed by `execute`
    fn matched_docs(&self) -> Result<RoaringBitmap>;

    fn score(&self, doc: u32, reader: &dyn IndexReader) -> Result<f32>;

    /// Terms contributing to this node's matches
    fn query_terms(&self) -> Result<Vec<Term>>;

    /// Create and normalize the weight tree, once
    fn init_weight(&mut self, reader: &dyn IndexReader) -> Result<()> {
        if self.has_weight() {
            return Ok(());
        }

        self.create_weight(reader)?;
        let sum = self.sum_of_squared_weights()?;
        let norm = reader.similarity().query_norm(sum);
        self.normalize(norm)
    }

    /// Hand the words this node matched to a highlighter
    fn highlight_matches(&self, highlighter: &mut dyn Highlighter) -> Result<()> {
        let words: Vec<String> = self
            .query_terms()?
            .into_iter()
            .map(|term| term.text)
            .collect();
        highlighter.highlight(&words);
        Ok(())
    }
}

/// A node of the query tree
#[derive(Clone, Debug)]
pub enum Query {
    Boolean(BooleanQuery),
    Term(TermQuery),
    MultiTerm(MultiTermQuery),
    Phrase(PhraseQuery),
    Wildcard(WildcardQuery),
    Fuzzy(FuzzyQuery),
    Range(RangeQuery),
    /// Matches nothing and never constrains a parent
    Insignificant(InsignificantQuery),
    /// Matches nothing and constrains a required parent clause
    EmptyResult(EmptyResultQuery),
    /// Raw query text waiting for rewrite
    Preprocessing(PreprocessingQuery),
}

macro_rules! dispatch {
    ($query:expr, $node:ident => $body:expr) => {
        match $query {
            Query::Boolean($node) => $body,
            Query::Term($node) => $body,
            Query::MultiTerm($node) => $body,
            Query::Phrase($node) => $body,
            Query::Wildcard($node) => $body,
            Query::Fuzzy($node) => $body,
            Query::Range($node) => $body,
            Query::Insignificant($node) => $body,
            Query::EmptyResult($node) => $body,
            Query::Preprocessing($node) => $body,
        }
    };
}

impl Query {
    pub fn insignificant() -> Self {
        Query::Insignificant(InsignificantQuery::default())
    }

    pub fn empty_result() -> Self {
        Query::EmptyResult(EmptyResultQuery::default())
    }

    pub fn is_insignificant(&self) -> bool {
        matches!(self, Query::Insignificant(_))
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, Query::EmptyResult(_))
    }

    /// Builder-style boost setter
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.set_boost(boost);
        self
    }
}

impl QueryNode for Query {
    fn query_type(&self) -> &'static str {
        dispatch!(self, node => node.query_type())
    }

    fn boost(&self) -> f32 {
        dispatch!(self, node => node.boost())
    }

    fn set_boost(&mut self, boost: f32) {
        dispatch!(self, node => node.set_boost(boost))
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        dispatch!(self, node => node.rewrite(index))
    }

    fn optimize(&self, index: &dyn IndexReader) -> Result<Query> {
        dispatch!(self, node => node.optimize(index))
    }

    fn create_weight(&mut self, reader: &dyn IndexReader) -> Result<()> {
        dispatch!(self, node => node.create_weight(reader))
    }

    fn has_weight(&self) -> bool {
        dispatch!(self, node => node.has_weight())
    }

    fn sum_of_squared_weights(&self) -> Result<f32> {
        dispatch!(self, node => node.sum_of_squared_weights())
    }

    fn normalize(&mut self, query_norm: f32) -> Result<()> {
        dispatch!(self, node => node.normalize(query_norm))
    }

    fn reset(&mut self) {
        dispatch!(self, node => node.reset())
    }

    fn execute(
        &mut self,
        reader: &dyn IndexReader,
        docs_filter: Option<&RoaringBitmap>,
    ) -> Result<()> {
        dispatch!(self, node => node.execute(reader, docs_filter))
    }

    fn matched_docs(&self) -> Result<RoaringBitmap> {
        dispatch!(self, node => node.matched_docs())
    }

    fn score(&self, doc: u32, reader: &dyn IndexReader) -> Result<f32> {
        dispatch!(self, node => node.score(doc, reader))
    }

    fn query_terms(&self) -> Result<Vec<Term>> {
        dispatch!(self, node => node.query_terms())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, node => fmt::Display::fmt(node, f))
    }
}

macro_rules! impl_from_node {
    ($($variant:ident($node:ty)),* $(,)?) => {
        $(
            impl From<$node> for Query {
                fn from(node: $node) -> Self {
                    Query::$variant(node)
                }
            }
        )*
    };
}

impl_from_node!(
    Boolean(BooleanQuery),
    Term(TermQuery),
    MultiTerm(MultiTermQuery),
    Phrase(PhraseQuery),
    Wildcard(WildcardQuery),
    Fuzzy(FuzzyQuery),
    Range(RangeQuery),
    Insignificant(InsignificantQuery),
    EmptyResult(EmptyResultQuery),
    Preprocessing(PreprocessingQuery),
);

/// Render a boost or similarity value rounded to four decimals
pub(crate) fn format_number(value: f32) -> String {
    let rounded = (value as f64 * 10_000.0).round() / 10_000.0;
    format!("{}", rounded)
}

/// Write the `^boost` suffix unless the boost is neutral
pub(crate) fn write_boost(f: &mut fmt::Formatter<'_>, boost: f32) -> fmt::Result {
    if boost != 1.0 {
        write!(f, "^{}", format_number(boost))?;
    }
    Ok(())
}
