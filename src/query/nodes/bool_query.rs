//! Boolean query - signed combination of subqueries
//!
//! Produced by the parser for every grouping level and by rewrite for
//! field fan-out of phrases and fuzzy terms.
//!
//! # Example
//!
//! ```rust
//! use quarry::index::Term;
//! use quarry::query::nodes::{BooleanQuery, TermQuery};
//! use quarry::query::{Occur, Query};
//!
//! let mut query = BooleanQuery::new();
//! query.add_subquery(TermQuery::new(Term::in_field("title", "rust")).into(), Occur::Required);
//! query.add_subquery(TermQuery::new(Term::in_field("title", "java")).into(), Occur::Prohibited);
//!
//! assert_eq!(Query::from(query).to_string(), "+(title:rust) -(title:java)");
//! ```

use roaring::RoaringBitmap;
use std::fmt;

use super::{MultiTermQuery, TermQuery};
use crate::error::Result;
use crate::index::{IndexReader, Term};
use crate::query::ast::{format_number, Query, QueryNode};
use crate::query::Occur;

/// Query combining subqueries with required, optional and prohibited clauses
#[derive(Clone, Debug)]
pub struct BooleanQuery {
    clauses: Vec<(Query, Occur)>,
    boost: f32,
    /// Set once the children's weights were created and normalized
    weighted: bool,
    /// Documents matched by the last execution
    docs: RoaringBitmap,
}

impl Default for BooleanQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl BooleanQuery {
    /// Create a new boolean query without clauses
    pub fn new() -> Self {
        Self {
            clauses: Vec::new(),
            boost: 1.0,
            weighted: false,
            docs: RoaringBitmap::new(),
        }
    }

    /// Create a boolean query from signed clauses, in order
    pub fn from_clauses(clauses: impl IntoIterator<Item = (Query, Occur)>) -> Self {
        let mut query = Self::new();
        query.clauses = clauses.into_iter().collect();
        query
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Append a clause
    pub fn add_subquery(&mut self, query: Query, occur: Occur) {
        self.clauses.push((query, occur));
    }

    /// Clauses with their occurrences
    pub fn subqueries(&self) -> &[(Query, Occur)] {
        &self.clauses
    }

    /// True when the query has no clause
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// True for an empty clause list as well
    fn all_prohibited(clauses: &[(Query, Occur)]) -> bool {
        clauses.iter().all(|(_, occur)| occur.is_prohibited())
    }

    /// Fold term-level clauses into as few multi-term clauses as possible
    ///
    /// `clauses` has already been stripped of insignificant and empty
    /// children and holds at least two entries.
    fn merge_term_clauses(&self, clauses: Vec<(Query, Occur)>) -> Query {
        let candidate = BooleanQuery::from_clauses(clauses.clone()).with_boost(self.boost);

        let mut remaining = Vec::new();
        let mut terms: Vec<(Term, Occur)> = Vec::new();
        let mut boosts: Vec<f32> = Vec::new();

        for (query, occur) in clauses {
            match query {
                Query::Term(term) => {
                    boosts.push(term.boost());
                    terms.push((term.term().clone(), occur));
                }
                Query::MultiTerm(multi) => {
                    let signs: Vec<Occur> = multi.terms().iter().map(|(_, sign)| *sign).collect();
                    let decomposable = if occur.is_required() {
                        // +(+a b) => +a b, never through a prohibited member
                        signs.iter().any(Occur::is_required) && !signs.iter().any(Occur::is_prohibited)
                    } else {
                        // (a b) => a b, -(a b) => -a -b
                        signs.iter().all(|sign| *sign == Occur::Optional)
                    };

                    if !decomposable {
                        remaining.push((Query::MultiTerm(multi), occur));
                        continue;
                    }

                    for (term, sign) in multi.terms() {
                        let sign = match occur {
                            Occur::Required => *sign,
                            other => other,
                        };
                        terms.push((term.clone(), sign));
                        boosts.push(multi.boost());
                    }
                }
                other => remaining.push((other, occur)),
            }
        }

        if terms.is_empty() {
            return candidate.into();
        }

        let same_boost = boosts.windows(2).all(|pair| pair[0] == pair[1]);
        if remaining.is_empty() && same_boost {
            return MultiTermQuery::from_terms(terms)
                .with_boost(boosts[0] * self.boost)
                .into();
        }

        let (prohibited, kept): (Vec<_>, Vec<_>) = terms
            .into_iter()
            .zip(boosts)
            .partition(|((_, occur), _)| occur.is_prohibited());

        let mut leftover = false;
        match kept.as_slice() {
            [] => {}
            [((term, occur), boost)] => {
                remaining.push((TermQuery::new(term.clone()).with_boost(*boost).into(), *occur));
            }
            _ if kept.windows(2).all(|pair| pair[0].1 == pair[1].1) => {
                let boost = kept[0].1;
                let has_required = kept.iter().any(|((_, occur), _)| occur.is_required());
                let clause = MultiTermQuery::from_terms(kept.iter().map(|(term, _)| term.clone()))
                    .with_boost(boost);
                let occur = if has_required {
                    Occur::Required
                } else {
                    Occur::Optional
                };
                remaining.push((clause.into(), occur));
            }
            _ => leftover = true,
        }

        // boosts do not matter for prohibited clauses
        match prohibited.as_slice() {
            [] => {}
            [((term, _), _)] => {
                remaining.push((TermQuery::new(term.clone()).into(), Occur::Prohibited));
            }
            _ => {
                let clause = MultiTermQuery::from_terms(
                    prohibited
                        .iter()
                        .map(|((term, _), _)| (term.clone(), Occur::Optional)),
                );
                remaining.push((clause.into(), Occur::Prohibited));
            }
        }

        if leftover {
            return candidate.into();
        }
        BooleanQuery::from_clauses(remaining)
            .with_boost(self.boost)
            .into()
    }
}

impl QueryNode for BooleanQuery {
    fn query_type(&self) -> &'static str {
        "boolean"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let mut query = BooleanQuery::new().with_boost(self.boost);
        for (subquery, occur) in self.clauses.iter_mut() {
            query.add_subquery(subquery.rewrite(index)?, *occur);
        }
        Ok(query.into())
    }

    fn optimize(&self, index: &dyn IndexReader) -> Result<Query> {
        let mut clauses = Vec::with_capacity(self.clauses.len());
        for (subquery, occur) in &self.clauses {
            let optimized = subquery.optimize(index)?;
            if !optimized.is_insignificant() {
                clauses.push((optimized, *occur));
            }
        }

        if clauses.is_empty() || Self::all_prohibited(&clauses) {
            return Ok(Query::insignificant());
        }

        if clauses
            .iter()
            .any(|(query, occur)| query.is_empty_result() && occur.is_required())
        {
            return Ok(Query::empty_result());
        }
        clauses.retain(|(query, _)| !query.is_empty_result());

        if clauses.is_empty() || Self::all_prohibited(&clauses) {
            return Ok(Query::empty_result());
        }

        if clauses.len() == 1 {
            // the single clause is required or optional, checked above
            let (mut query, _) = clauses.remove(0);
            let boost = query.boost() * self.boost;
            query.set_boost(boost);
            return Ok(query);
        }

        Ok(self.merge_term_clauses(clauses))
    }

    fn create_weight(&mut self, reader: &dyn IndexReader) -> Result<()> {
        for (subquery, _) in self.clauses.iter_mut() {
            subquery.create_weight(reader)?;
        }
        self.weighted = true;
        Ok(())
    }

    fn has_weight(&self) -> bool {
        self.weighted
    }

    fn sum_of_squared_weights(&self) -> Result<f32> {
        let mut sum = 0.0;
        for (subquery, occur) in &self.clauses {
            if !occur.is_prohibited() {
                sum += subquery.sum_of_squared_weights()?;
            }
        }
        sum *= self.boost * self.boost;

        Ok(if sum == 0.0 { 1.0 } else { sum })
    }

    fn normalize(&mut self, query_norm: f32) -> Result<()> {
        let norm = query_norm * self.boost;
        for (subquery, _) in self.clauses.iter_mut() {
            subquery.normalize(norm)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.weighted = false;
        self.docs.clear();
        for (subquery, _) in self.clauses.iter_mut() {
            subquery.reset();
        }
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

        for (subquery, occur) in self.clauses.iter_mut() {
            subquery.execute(reader, docs_filter)?;
            let docs = subquery.matched_docs()?;
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
        }

        let mut docs = required.unwrap_or(optional);
        docs -= prohibited;
        self.docs = docs;
        Ok(())
    }

    fn matched_docs(&self) -> Result<RoaringBitmap> {
        Ok(self.docs.clone())
    }

    fn score(&self, doc: u32, reader: &dyn IndexReader) -> Result<f32> {
        if !self.docs.contains(doc) {
            return Ok(0.0);
        }

        let mut score = 0.0;
        let mut matched = 0;
        let mut max_coord = 0;

        for (subquery, occur) in &self.clauses {
            let subscore = subquery.score(doc, reader)?;
            match occur {
                Occur::Prohibited if subscore != 0.0 => return Ok(0.0),
                Occur::Prohibited => continue,
                Occur::Required if subscore == 0.0 => return Ok(0.0),
                _ => {}
            }
            max_coord += 1;
            if subscore != 0.0 {
                matched += 1;
                score += subscore;
            }
        }

        Ok(score * reader.similarity().coord(matched, max_coord) * self.boost)
    }

    fn query_terms(&self) -> Result<Vec<Term>> {
        let mut terms = Vec::new();
        for (subquery, occur) in &self.clauses {
            if !occur.is_prohibited() {
                terms.extend(subquery.query_terms()?);
            }
        }
        Ok(terms)
    }
}

impl fmt::Display for BooleanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let boosted = self.boost != 1.0;
        if boosted {
            f.write_str("(")?;
        }
        for (id, (subquery, occur)) in self.clauses.iter().enumerate() {
            if id != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}({})", occur.prefix(), subquery)?;
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
    use crate::query::nodes::{test_index, PhraseQuery};

    fn term(field: &str, text: &str) -> Query {
        TermQuery::new(Term::in_field(field, text)).into()
    }

    fn boolean(clauses: Vec<(Query, Occur)>) -> BooleanQuery {
        BooleanQuery::from_clauses(clauses)
    }

    #[test]
    fn test_display() {
        let query = boolean(vec![
            (term("f", "a"), Occur::Optional),
            (term("f", "b"), Occur::Required),
            (term("f", "c"), Occur::Prohibited),
        ]);
        assert_eq!(query.to_string(), "(f:a) +(f:b) -(f:c)");
        assert_eq!(query.with_boost(0.5).to_string(), "((f:a) +(f:b) -(f:c))^0.5");
    }

    #[test]
    fn test_optimize_drops_insignificant() {
        let index = test_index();
        let query = boolean(vec![
            (Query::insignificant(), Occur::Required),
            (term("body", "rust"), Occur::Optional),
        ]);
        assert_eq!(query.optimize(&index).unwrap().to_string(), "body:rust");

        let query = boolean(vec![
            (Query::insignificant(), Occur::Required),
            (term("body", "rust"), Occur::Prohibited),
        ]);
        assert!(query.optimize(&index).unwrap().is_insignificant());
    }

    #[test]
    fn test_optimize_required_empty_result() {
        let index = test_index();
        let query = boolean(vec![
            (term("body", "cobol"), Occur::Required),
            (term("body", "rust"), Occur::Optional),
        ]);
        assert!(query.optimize(&index).unwrap().is_empty_result());

        let query = boolean(vec![
            (term("body", "cobol"), Occur::Optional),
            (term("body", "rust"), Occur::Prohibited),
        ]);
        assert!(query.optimize(&index).unwrap().is_empty_result());
    }

    #[test]
    fn test_optimize_single_clause_multiplies_boost() {
        let index = test_index();
        let query = boolean(vec![(
            TermQuery::new(Term::in_field("body", "rust"))
                .with_boost(2.0)
                .into(),
            Occur::Required,
        )])
        .with_boost(3.0);
        assert_eq!(query.optimize(&index).unwrap().to_string(), "body:rust^6");
    }

    #[test]
    fn test_optimize_merges_terms() {
        let index = test_index();
        let query = boolean(vec![
            (term("body", "rust"), Occur::Required),
            (term("body", "cargo"), Occur::Optional),
            (term("body", "java"), Occur::Prohibited),
        ]);
        assert_eq!(
            query.optimize(&index).unwrap().to_string(),
            "+body:rust body:cargo -body:java"
        );
    }

    #[test]
    fn test_optimize_groups_terms_next_to_phrase() {
        let index = test_index();
        let phrase = PhraseQuery::from_terms([
            Term::in_field("body", "rust"),
            Term::in_field("body", "programming"),
        ]);
        let query = boolean(vec![
            (phrase.into(), Occur::Required),
            (term("body", "cargo"), Occur::Optional),
            (term("body", "java"), Occur::Prohibited),
            (term("body", "guide"), Occur::Prohibited),
        ]);
        assert_eq!(
            query.optimize(&index).unwrap().to_string(),
            "+(body:\"rust programming\") (body:cargo) -(body:java body:guide)"
        );
    }

    #[test]
    fn test_execute_and_score() {
        let index = test_index();
        let mut query = Query::from(boolean(vec![
            (term("body", "programming"), Occur::Required),
            (term("body", "cargo"), Occur::Optional),
            (term("body", "java"), Occur::Prohibited),
        ]));
        query.execute(&index, None).unwrap();

        let docs: Vec<u32> = query.matched_docs().unwrap().iter().collect();
        assert_eq!(docs, vec![0, 1]);
        assert!(query.score(1, &index).unwrap() > query.score(0, &index).unwrap());
        assert_eq!(query.score(2, &index).unwrap(), 0.0);
    }

    #[test]
    fn test_query_terms_skip_prohibited() {
        let query = boolean(vec![
            (term("body", "rust"), Occur::Required),
            (term("body", "java"), Occur::Prohibited),
        ]);
        assert_eq!(
            query.query_terms().unwrap(),
            vec![Term::in_field("body", "rust")]
        );
    }
}
