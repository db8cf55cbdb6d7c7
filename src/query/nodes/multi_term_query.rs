//! Multi-term query - a flat set of signed terms
//!
//! Field fan-out, wildcard/range expansion and multi-word analyzer output all
//! land here.

use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::fmt;

use super::{BooleanQuery, TermQuery};
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{format_number, Query, QueryNode};
use crate::query::weight::Weight;
use crate::query::Occur;

/// Flat set of signed terms, scored as one unit
///
/// Unlike a [`BooleanQuery`] of term queries, coordination is computed over
/// the terms themselves.
#[derive(Clone, Debug)]
pub struct MultiTermQuery {
    terms: Vec<(Term, Occur)>,
    boost: f32,
    /// One weight per term, prohibited terms included
    weights: Option<Vec<Weight>>,
    /// Documents matched by the last execution
    docs: RoaringBitmap,
    /// Term frequencies per matched document, in term order
    freqs: Vec<HashMap<u32, u32>>,
}

impl Default for MultiTermQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiTermQuery {
    /// Create an empty multi-term query
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            boost: 1.0,
            weights: None,
            docs: RoaringBitmap::new(),
            freqs: Vec::new(),
        }
    }

    /// Create a multi-term query from signed terms, in order
    pub fn from_terms(terms: impl IntoIterator<Item = (Term, Occur)>) -> Self {
        let mut query = Self::new();
        query.terms = terms.into_iter().collect();
        query
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Append a term with its occurrence
    pub fn add_term(&mut self, term: Term, occur: Occur) {
        self.terms.push((term, occur));
    }

    /// Signed terms of the query
    pub fn terms(&self) -> &[(Term, Occur)] {
        &self.terms
    }

    /// True when no term was added
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Per-term weights, in term order
    fn weights(&self) -> Result<&[Weight]> {
        self.weights
            .as_deref()
            .ok_or_else(|| QueryError::Internal("multi-term weights are not initialized".to_string()))
    }
}

impl QueryNode for MultiTermQuery {
    fn query_type(&self) -> &'static str {
        "multi_term"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        if self.terms.is_empty() {
            return Ok(Query::empty_result());
        }

        if self.terms.iter().all(|(term, _)| term.field.is_some()) {
            return Ok(self.clone().into());
        }

        // some terms need field resolution: go through a boolean of term queries
        let mut query = BooleanQuery::new().with_boost(self.boost);
        for (term, occur) in &self.terms {
            let mut subquery = TermQuery::new(term.clone());
            query.add_subquery(subquery.rewrite(index)?, *occur);
        }
        Ok(query.into())
    }

    fn optimize(&self, index: &dyn IndexReader) -> Result<Query> {
        let mut terms = Vec::with_capacity(self.terms.len());
        for (term, occur) in &self.terms {
            if index.has_term(term) {
                terms.push((term.clone(), *occur));
            } else if occur.is_required() {
                return Ok(Query::empty_result());
            }
        }

        if terms.iter().all(|(_, occur)| occur.is_prohibited()) {
            return Ok(Query::empty_result());
        }

        if terms.len() == 1 {
            let (term, _) = terms.remove(0);
            return Ok(TermQuery::new(term).with_boost(self.boost).into());
        }

        Ok(MultiTermQuery::from_terms(terms)
            .with_boost(self.boost)
            .into())
    }

    fn create_weight(&mut self, reader: &dyn IndexReader) -> Result<()> {
        self.weights = Some(
            self.terms
                .iter()
                .map(|(term, _)| Weight::for_term(term, self.boost, reader))
                .collect(),
        );
        Ok(())
    }

    fn has_weight(&self) -> bool {
        self.weights.is_some()
    }

    fn sum_of_squared_weights(&self) -> Result<f32> {
        let sum: f32 = self
            .weights()?
            .iter()
            .zip(&self.terms)
            .filter(|(_, (_, occur))| !occur.is_prohibited())
            .map(|(weight, _)| weight.sum_of_squared_weights())
            .sum::<f32>()
            * self.boost
            * self.boost;

        // only prohibited terms, like '-something -another'
        Ok(if sum == 0.0 { 1.0 } else { sum })
    }

    fn normalize(&mut self, query_norm: f32) -> Result<()> {
        let norm = query_norm * self.boost;
        let weights = self.weights.as_mut().ok_or_else(|| {
            QueryError::Internal("multi-term weights are not initialized".to_string())
        })?;
        for weight in weights.iter_mut() {
            weight.normalize(norm);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.weights = None;
        self.docs.clear();
        self.freqs.clear();
    }

    fn execute(
        &mut self,
        reader: &dyn IndexReader,
        docs_filter: Option<&RoaringBitmap>,
    ) -> Result<()> {
        self.init_weight(reader)?;

        let mut required: Option<RoaringBitmap> = None;
        let mut optional = RoaringBitmap::new();
        let mut prohibited = RoaringBitmap::new();
        let mut freqs = Vec::with_capacity(self.terms.len());

        for (term, occur) in &self.terms {
            let mut docs = reader.term_docs(term);
            if let Some(filter) = docs_filter {
                docs &= filter;
            }
            match occur {
                Occur::Required => {
                    required = Some(match required {
                        Some(acc) => acc & docs,
                        None => docs,
                    });
                }
                Occur::Optional => optional |= docs,
                Occur::Prohibited => prohibited |= docs,
            }
            freqs.push(reader.term_freqs(term));
        }

        let mut docs = required.unwrap_or(optional);
        docs -= prohibited;

        self.docs = docs;
        self.freqs = freqs;
        Ok(())
    }

    fn matched_docs(&self) -> Result<RoaringBitmap> {
        Ok(self.docs.clone())
    }

    fn score(&self, doc: u32, reader: &dyn IndexReader) -> Result<f32> {
        if !self.docs.contains(doc) {
            return Ok(0.0);
        }

        let similarity = reader.similarity();
        let weights = self.weights()?;
        let mut score = 0.0;
        let mut matched = 0;
        let mut max_coord = 0;

        for (id, (term, occur)) in self.terms.iter().enumerate() {
            if occur.is_prohibited() {
                continue;
            }
            max_coord += 1;

            if let Some(freq) = self.freqs.get(id).and_then(|freqs| freqs.get(&doc)) {
                matched += 1;
                score += similarity.tf(*freq as f32)
                    * weights[id].value()
                    * reader.norm(doc, term.field().unwrap_or_default());
            }
        }

        Ok(score * similarity.coord(matched, max_coord) * self.boost)
    }

    fn query_terms(&self) -> Result<Vec<Term>> {
        Ok(self
            .terms
            .iter()
            .filter(|(_, occur)| !occur.is_prohibited())
            .map(|(term, _)| term.clone())
            .collect())
    }
}

impl fmt::Display for MultiTermQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let boosted = self.boost != 1.0;
        if boosted {
            f.write_str("(")?;
        }
        for (id, (term, occur)) in self.terms.iter().enumerate() {
            if id != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}{}", occur.prefix(), term)?;
        }
        if boosted {
            write!(f, ")^{}", format_number(self.boost))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::test_index;

    fn body(text: &str) -> Term {
        Term::in_field("body", text)
    }

    #[test]
    fn test_display() {
        let mut query = MultiTermQuery::new();
        query.add_term(body("rust"), Occur::Required);
        query.add_term(body("java"), Occur::Prohibited);
        query.add_term(Term::unqualified("cargo"), Occur::Optional);
        assert_eq!(query.to_string(), "+body:rust -body:java cargo");

        let query = query.with_boost(2.0);
        assert_eq!(query.to_string(), "(+body:rust -body:java cargo)^2");
    }

    #[test]
    fn test_prohibited_terms_do_not_weigh() {
        let index = test_index();

        let mut plain = MultiTermQuery::from_terms([(body("rust"), Occur::Required)]);
        plain.create_weight(&index).unwrap();

        let mut signed = MultiTermQuery::from_terms([
            (body("rust"), Occur::Required),
            (body("java"), Occur::Prohibited),
        ]);
        signed.create_weight(&index).unwrap();

        assert_eq!(
            signed.sum_of_squared_weights().unwrap(),
            plain.sum_of_squared_weights().unwrap()
        );

        let mut negative = MultiTermQuery::from_terms([(body("java"), Occur::Prohibited)]);
        negative.create_weight(&index).unwrap();
        assert_eq!(negative.sum_of_squared_weights().unwrap(), 1.0);
    }

    #[test]
    fn test_rewrite() {
        let index = test_index();
        assert!(MultiTermQuery::new().rewrite(&index).unwrap().is_empty_result());

        let mut qualified = MultiTermQuery::from_terms([(body("rust"), Occur::Required)]);
        let mut once = qualified.rewrite(&index).unwrap();
        assert_eq!(once.to_string(), "+body:rust");
        assert_eq!(once.rewrite(&index).unwrap().to_string(), "+body:rust");

        let mut mixed = MultiTermQuery::from_terms([
            (body("rust"), Occur::Required),
            (Term::unqualified("java"), Occur::Prohibited),
        ]);
        assert_eq!(
            mixed.rewrite(&index).unwrap().to_string(),
            "+(body:rust) -(title:java body:java id:java)"
        );
    }

    #[test]
    fn test_optimize() {
        let index = test_index();

        let query = MultiTermQuery::from_terms([
            (body("rust"), Occur::Required),
            (body("cobol"), Occur::Optional),
            (body("fortran"), Occur::Prohibited),
        ]);
        assert_eq!(query.optimize(&index).unwrap().to_string(), "body:rust");

        let query = MultiTermQuery::from_terms([
            (body("rust"), Occur::Optional),
            (body("cobol"), Occur::Required),
        ]);
        assert!(query.optimize(&index).unwrap().is_empty_result());

        let query = MultiTermQuery::from_terms([
            (body("rust"), Occur::Prohibited),
            (body("cobol"), Occur::Optional),
        ]);
        assert!(query.optimize(&index).unwrap().is_empty_result());
    }

    #[test]
    fn test_execute() {
        let index = test_index();
        let mut query = MultiTermQuery::from_terms([
            (body("programming"), Occur::Required),
            (body("rust"), Occur::Optional),
            (body("java"), Occur::Prohibited),
        ]);
        query.execute(&index, None).unwrap();

        let docs: Vec<u32> = query.matched_docs().unwrap().iter().collect();
        assert_eq!(docs, vec![0, 1]);
        assert!(query.score(0, &index).unwrap() > 0.0);
        assert_eq!(query.score(2, &index).unwrap(), 0.0);
    }

    #[test]
    fn test_coord_rewards_more_matches() {
        let index = test_index();
        let mut query = MultiTermQuery::from_terms([
            (body("cargo"), Occur::Optional),
            (body("programming"), Occur::Optional),
        ]);
        query.execute(&index, None).unwrap();

        // doc 1 matches both terms, doc 2 only one
        assert!(query.score(1, &index).unwrap() > query.score(2, &index).unwrap());
    }
}
