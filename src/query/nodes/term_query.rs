//! Term query - exact match on a single vocabulary term

use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::fmt;

use super::MultiTermQuery;
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{write_boost, Query, QueryNode};
use crate::query::weight::Weight;
use crate::query::Occur;

/// Query that matches documents containing an exact term
///
/// A term without a field is expanded over every indexed field on rewrite.
#[derive(Clone, Debug)]
pub struct TermQuery {
    term: Term,
    boost: f32,
    weight: Option<Weight>,
    /// Postings of the last execution
    docs: RoaringBitmap,
    /// Term frequency per matched document
    freqs: HashMap<u32, u32>,
}

impl TermQuery {
    /// Create a new term query
    pub fn new(term: Term) -> Self {
        Self {
            term,
            boost: 1.0,
            weight: None,
            docs: RoaringBitmap::new(),
            freqs: HashMap::new(),
        }
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// The term matched by this query
    pub fn term(&self) -> &Term {
        &self.term
    }

    fn weight(&self) -> Result<&Weight> {
        self.weight
            .as_ref()
            .ok_or_else(|| QueryError::Internal("term weight is not initialized".to_string()))
    }
}

impl QueryNode for TermQuery {
    fn query_type(&self) -> &'static str {
        "term"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        if self.term.field.is_some() {
            return Ok(self.clone().into());
        }

        let mut query = MultiTermQuery::new().with_boost(self.boost);
        for field in index.field_names(true) {
            query.add_term(
                Term::in_field(field, self.term.text.clone()),
                Occur::Optional,
            );
        }
        query.rewrite(index)
    }

    fn optimize(&self, index: &dyn IndexReader) -> Result<Query> {
        if !index.has_term(&self.term) {
            return Ok(Query::empty_result());
        }
        Ok(self.clone().into())
    }

    fn create_weight(&mut self, reader: &dyn IndexReader) -> Result<()> {
        self.weight = Some(Weight::for_term(&self.term, self.boost, reader));
        Ok(())
    }

    fn has_weight(&self) -> bool {
        self.weight.is_some()
    }

    fn sum_of_squared_weights(&self) -> Result<f32> {
        Ok(self.weight()?.sum_of_squared_weights())
    }

    fn normalize(&mut self, query_norm: f32) -> Result<()> {
        match self.weight.as_mut() {
            Some(weight) => {
                weight.normalize(query_norm);
                Ok(())
            }
            None => Err(QueryError::Internal(
                "term weight is not initialized".to_string(),
            )),
        }
    }

    fn reset(&mut self) {
        self.weight = None;
        self.docs.clear();
        self.freqs.clear();
    }

    fn execute(
        &mut self,
        reader: &dyn IndexReader,
        docs_filter: Option<&RoaringBitmap>,
    ) -> Result<()> {
        self.init_weight(reader)?;

        let mut docs = reader.term_docs(&self.term);
        if let Some(filter) = docs_filter {
            docs &= filter;
        }
        let mut freqs = reader.term_freqs(&self.term);
        freqs.retain(|doc, _| docs.contains(*doc));

        self.docs = docs;
        self.freqs = freqs;
        Ok(())
    }

    fn matched_docs(&self) -> Result<RoaringBitmap> {
        Ok(self.docs.clone())
    }

    fn score(&self, doc: u32, reader: &dyn IndexReader) -> Result<f32> {
        let Some(freq) = self.freqs.get(&doc) else {
            return Ok(0.0);
        };

        let field = self.term.field().unwrap_or_default();
        Ok(reader.similarity().tf(*freq as f32)
            * self.weight()?.value()
            * reader.norm(doc, field)
            * self.boost)
    }

    fn query_terms(&self) -> Result<Vec<Term>> {
        Ok(vec![self.term.clone()])
    }
}

impl fmt::Display for TermQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)?;
        write_boost(f, self.boost)
    }
}
