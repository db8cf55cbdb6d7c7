//! Phrase query - terms at fixed relative positions, with optional slop

use roaring::RoaringBitmap;
use std::collections::HashMap;
use std::fmt;

use super::{BooleanQuery, TermQuery};
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{write_boost, Query, QueryNode};
use crate::query::weight::Weight;
use crate::query::Occur;

/// Query that matches documents containing terms in sequence
///
/// Each term carries an offset relative to the phrase start. With slop 0 the
/// terms must appear exactly at those offsets; otherwise every arrangement
/// whose total displacement is within the slop counts, weighted by the
/// similarity's sloppy frequency.
#[derive(Clone, Debug)]
pub struct PhraseQuery {
    terms: Vec<Term>,
    offsets: Vec<u32>,
    slop: u32,
    boost: f32,
    weight: Option<Weight>,
    /// Docs containing every term (phrase frequency may still be 0)
    docs: RoaringBitmap,
    /// Phrase frequency of docs where the phrase occurs
    freqs: HashMap<u32, f32>,
}

impl Default for PhraseQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseQuery {
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
            offsets: Vec::new(),
            slop: 0,
            boost: 1.0,
            weight: None,
            docs: RoaringBitmap::new(),
            freqs: HashMap::new(),
        }
    }

    /// Phrase of consecutive terms
    ///
    /// All terms are expected to share a field.
    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Self {
        let mut query = Self::new();
        for (offset, term) in terms.into_iter().enumerate() {
            query.terms.push(term);
            query.offsets.push(offset as u32);
        }
        query
    }

    /// Append a term at `position`, or right after the last term
    pub fn add_term(&mut self, term: Term, position: Option<u32>) -> Result<()> {
        if let Some(first) = self.terms.first() {
            if first.field != term.field {
                return Err(QueryError::semantic(format!(
                    "All phrase terms must be in the same field: {}:{}",
                    term.field().unwrap_or_default(),
                    term.text
                )));
            }
        }

        let position = match (position, self.offsets.last()) {
            (Some(position), _) => position,
            (None, Some(last)) => last + 1,
            (None, None) => 0,
        };
        self.terms.push(term);
        self.offsets.push(position);
        Ok(())
    }

    pub fn with_slop(mut self, slop: u32) -> Self {
        self.slop = slop;
        self
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn set_slop(&mut self, slop: u32) {
        self.slop = slop;
    }

    pub fn slop(&self) -> u32 {
        self.slop
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    fn field(&self) -> Option<&str> {
        self.terms.first().and_then(Term::field)
    }

    fn exact_phrase_freq(&self, positions: &[Vec<u32>]) -> f32 {
        // anchor on the rarest term
        let Some(anchor) = (0..positions.len()).min_by_key(|&id| positions[id].len()) else {
            return 0.0;
        };

        let mut freq = 0;
        for &anchor_position in &positions[anchor] {
            let found = (0..self.terms.len()).filter(|&id| id != anchor).all(|id| {
                let expected = anchor_position as i64 + self.offsets[id] as i64
                    - self.offsets[anchor] as i64;
                expected >= 0 && positions[id].contains(&(expected as u32))
            });
            if found {
                freq += 1;
            }
        }
        freq as f32
    }

    fn sloppy_phrase_freq(&self, positions: &[Vec<u32>], reader: &dyn IndexReader) -> f32 {
        // every combination of one position per term
        let mut arrangements: Vec<Vec<u32>> = vec![Vec::with_capacity(self.terms.len())];
        for term_positions in positions {
            arrangements = arrangements
                .into_iter()
                .flat_map(|arrangement| {
                    term_positions.iter().map(move |&position| {
                        let mut next = arrangement.clone();
                        next.push(position);
                        next
                    })
                })
                .collect();
        }

        let slop = self.slop as i64;
        let mut freq = 0.0;
        for arrangement in arrangements {
            let Some(&first) = arrangement.first() else {
                continue;
            };
            let min_distance = (-slop..=slop)
                .map(|shift| {
                    let start = first as i64 - self.offsets[0] as i64 + shift;
                    arrangement
                        .iter()
                        .zip(&self.offsets)
                        .map(|(&position, &offset)| (position as i64 - offset as i64 - start).abs())
                        .sum::<i64>()
                })
                .min()
                .unwrap_or(i64::MAX);

            if min_distance <= slop {
                freq += reader.similarity().sloppy_freq(min_distance as u32);
            }
        }
        freq
    }
}

impl QueryNode for PhraseQuery {
    fn query_type(&self) -> &'static str {
        "phrase"
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
        if self.field().is_some() {
            return Ok(self.clone().into());
        }

        let mut query = BooleanQuery::new().with_boost(self.boost);
        for field in index.field_names(true) {
            let mut subquery = PhraseQuery::new().with_slop(self.slop);
            for (term, offset) in self.terms.iter().zip(&self.offsets) {
                subquery.add_term(Term::in_field(field.clone(), term.text.clone()), Some(*offset))?;
            }
            query.add_subquery(subquery.into(), Occur::Optional);
        }
        Ok(query.into())
    }

    fn optimize(&self, index: &dyn IndexReader) -> Result<Query> {
        if self.terms.iter().any(|term| !index.has_term(term)) {
            return Ok(Query::empty_result());
        }

        match self.terms.as_slice() {
            [] => Ok(Query::empty_result()),
            [term] => Ok(TermQuery::new(term.clone()).with_boost(self.boost).into()),
            _ => Ok(self.clone().into()),
        }
    }

    fn create_weight(&mut self, reader: &dyn IndexReader) -> Result<()> {
        self.weight = Some(Weight::for_terms(&self.terms, self.boost, reader));
        Ok(())
    }

    fn has_weight(&self) -> bool {
        self.weight.is_some()
    }

    fn sum_of_squared_weights(&self) -> Result<f32> {
        self.weight
            .as_ref()
            .map(Weight::sum_of_squared_weights)
            .ok_or_else(|| QueryError::Internal("phrase weight is not initialized".to_string()))
    }

    fn normalize(&mut self, query_norm: f32) -> Result<()> {
        match self.weight.as_mut() {
            Some(weight) => {
                weight.normalize(query_norm);
                Ok(())
            }
            None => Err(QueryError::Internal(
                "phrase weight is not initialized".to_string(),
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
        self.docs.clear();
        self.freqs.clear();

        if self.terms.is_empty() {
            return Ok(());
        }

        let mut candidates: Option<RoaringBitmap> = docs_filter.cloned();
        for term in &self.terms {
            let docs = reader.term_docs(term);
            candidates = Some(match candidates {
                Some(acc) => acc & docs,
                None => docs,
            });
        }
        let candidates = candidates.unwrap_or_default();

        let term_positions: Vec<HashMap<u32, Vec<u32>>> = self
            .terms
            .iter()
            .map(|term| reader.term_positions(term))
            .collect();

        for doc in candidates.iter() {
            let positions: Vec<Vec<u32>> = term_positions
                .iter()
                .map(|by_doc| by_doc.get(&doc).cloned().unwrap_or_default())
                .collect();

            let freq = if self.slop == 0 {
                self.exact_phrase_freq(&positions)
            } else {
                self.sloppy_phrase_freq(&positions, reader)
            };
            if freq > 0.0 {
                self.freqs.insert(doc, freq);
            }
        }

        self.docs = candidates;
        Ok(())
    }

    fn matched_docs(&self) -> Result<RoaringBitmap> {
        Ok(self.docs.clone())
    }

    fn score(&self, doc: u32, reader: &dyn IndexReader) -> Result<f32> {
        let Some(freq) = self.freqs.get(&doc) else {
            return Ok(0.0);
        };
        let weight = self
            .weight
            .as_ref()
            .ok_or_else(|| QueryError::Internal("phrase weight is not initialized".to_string()))?;

        Ok(reader.similarity().tf(*freq)
            * weight.value()
            * reader.norm(doc, self.field().unwrap_or_default())
            * self.boost)
    }

    fn query_terms(&self) -> Result<Vec<Term>> {
        Ok(self.terms.clone())
    }
}

impl fmt::Display for PhraseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = self.field() {
            write!(f, "{}:", field)?;
        }
        let words: Vec<&str> = self.terms.iter().map(|term| term.text.as_str()).collect();
        write!(f, "\"{}\"", words.join(" "))?;
        if self.slop != 0 {
            write!(f, "~{}", self.slop)?;
        }
        write_boost(f, self.boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::test_index;

    fn phrase(field: &str, words: &[&str]) -> PhraseQuery {
        PhraseQuery::from_terms(words.iter().map(|w| Term::in_field(field, *w)))
    }

    #[test]
    fn test_display() {
        assert_eq!(
            phrase("body", &["rust", "programming"]).to_string(),
            "body:\"rust programming\""
        );
        let unqualified = PhraseQuery::from_terms([Term::unqualified("a"), Term::unqualified("b")])
            .with_slop(10)
            .with_boost(4.0);
        assert_eq!(unqualified.to_string(), "\"a b\"~10^4");
    }

    #[test]
    fn test_add_term_rejects_mixed_fields() {
        let mut query = PhraseQuery::new();
        query.add_term(Term::in_field("a", "x"), None).unwrap();
        query.add_term(Term::in_field("a", "y"), Some(3)).unwrap();
        assert_eq!(query.offsets, vec![0, 3]);
        assert!(query.add_term(Term::in_field("b", "z"), None).is_err());
    }

    #[test]
    fn test_rewrite_unqualified() {
        let index = test_index();
        let mut query = PhraseQuery::from_terms([Term::unqualified("rust"), Term::unqualified("in")]);
        assert_eq!(
            query.rewrite(&index).unwrap().to_string(),
            "(title:\"rust in\") (body:\"rust in\") (id:\"rust in\")"
        );
    }

    #[test]
    fn test_optimize() {
        let index = test_index();
        assert!(phrase("body", &["rust", "cobol"]).optimize(&index).unwrap().is_empty_result());
        assert_eq!(
            phrase("body", &["rust"]).optimize(&index).unwrap().to_string(),
            "body:rust"
        );
    }

    #[test]
    fn test_exact_phrase() {
        let index = test_index();
        let mut query = phrase("body", &["rust", "programming"]);
        query.execute(&index, None).unwrap();

        // both docs contain both words, only doc 0 has them in order
        assert_eq!(query.matched_docs().unwrap().len(), 2);
        assert!(query.score(0, &index).unwrap() > 0.0);
        assert_eq!(query.score(1, &index).unwrap(), 0.0);
    }

    #[test]
    fn test_sloppy_phrase() {
        let index = test_index();
        let mut query = phrase("body", &["programming", "rust"]).with_slop(4);
        query.execute(&index, None).unwrap();

        assert!(query.score(0, &index).unwrap() > 0.0);
        assert!(query.score(1, &index).unwrap() > 0.0);
    }
}
