use std::fmt;
use std::sync::Arc;

use super::escape_word;
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{format_number, write_boost, Query, QueryNode};
use crate::query::context::QueryContext;
use crate::query::nodes::{BooleanQuery, FuzzyQuery, DEFAULT_MIN_SIMILARITY};
use crate::query::Occur;

/// A `word~similarity` fuzzy term from the query string
#[derive(Clone, Debug)]
pub struct PreprocessingFuzzy {
    word: String,
    field: Option<String>,
    min_similarity: f32,
    boost: f32,
    context: Arc<QueryContext>,
    matches: Option<Vec<Term>>,
}

impl PreprocessingFuzzy {
    /// Create a fuzzy term, rejecting a similarity outside `[0, 1)`
    pub fn new(
        word: impl Into<String>,
        field: Option<String>,
        min_similarity: f32,
        context: Arc<QueryContext>,
    ) -> Result<Self> {
        if min_similarity < 0.0 {
            return Err(QueryError::semantic(
                "Minimum similarity cannot be less than 0.",
            ));
        }
        if min_similarity >= 1.0 {
            return Err(QueryError::semantic(
                "Minimum similarity cannot be greater than or equal to 1.",
            ));
        }

        Ok(Self {
            word: word.into(),
            field,
            min_similarity,
            boost: 1.0,
            context,
            matches: None,
        })
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }

    fn fuzzy_rewrite(&mut self, term: Term, index: &dyn IndexReader) -> Result<Query> {
        let mut query = FuzzyQuery::new(
            term,
            self.min_similarity,
            self.context.fuzzy_prefix_length(),
        )?
        .with_boost(self.boost)
        .with_terms_limit(self.context.terms_limit());

        let rewritten = query.rewrite(index)?;
        self.matches = Some(query.query_terms()?);
        Ok(rewritten)
    }

    fn rewrite_all_fields(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let mut subqueries = Vec::new();
        let mut has_insignificant = false;

        for field in self.context.search_fields(index) {
            let mut subquery = Self {
                field: Some(field),
                boost: 1.0,
                matches: None,
                ..self.clone()
            };
            let rewritten = subquery.rewrite(index)?;
            if rewritten.is_insignificant() {
                has_insignificant = true;
            } else if !rewritten.is_empty_result() {
                subqueries.push(rewritten);
            }
        }

        let mut query = match subqueries.len() {
            0 => {
                self.matches = Some(Vec::new());
                return Ok(if has_insignificant {
                    Query::insignificant()
                } else {
                    Query::empty_result()
                });
            }
            1 => subqueries.remove(0),
            _ => BooleanQuery::from_clauses(
                subqueries
                    .into_iter()
                    .map(|subquery| (subquery, Occur::Optional)),
            )
            .into(),
        };
        query.set_boost(self.boost);

        self.matches = Some(query.query_terms()?);
        Ok(query)
    }
}

impl QueryNode for PreprocessingFuzzy {
    fn query_type(&self) -> &'static str {
        "preprocessing_fuzzy"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let Some(field) = self.field.clone() else {
            return self.rewrite_all_fields(index);
        };

        let exact = Term::in_field(field.clone(), self.word.clone());
        if index.has_term(&exact) {
            return self.fuzzy_rewrite(exact, index);
        }

        if self.word.contains(['*', '?']) {
            return Err(QueryError::semantic(
                "Fuzzy search doesn't support wildcards (except within Keyword fields).",
            ));
        }

        let tokens = self.context.tokenize(&self.word);
        match tokens.as_slice() {
            [] => {
                self.matches = Some(Vec::new());
                Ok(Query::insignificant())
            }
            [token] => self.fuzzy_rewrite(Term::in_field(field, token.text.clone()), index),
            _ => Err(QueryError::semantic(
                "Fuzzy search is supported only for non-multiple word terms",
            )),
        }
    }

    unrewritten_execution!("This query is not intended to be executed.");
}

impl fmt::Display for PreprocessingFuzzy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}:", field)?;
        }
        write!(f, "{}~", escape_word(&self.word))?;
        if self.min_similarity != DEFAULT_MIN_SIMILARITY {
            f.write_str(&format_number(self.min_similarity))?;
        }
        write_boost(f, self.boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::preprocessing::test_context;
    use crate::query::nodes::test_index;

    fn fuzzy(word: &str, field: Option<&str>, similarity: f32) -> PreprocessingFuzzy {
        PreprocessingFuzzy::new(word, field.map(str::to_string), similarity, test_context())
            .unwrap()
    }

    #[test]
    fn test_similarity_validation() {
        assert!(PreprocessingFuzzy::new("rust", None, 1.0, test_context()).is_err());
        assert!(PreprocessingFuzzy::new("rust", None, -1.0, test_context()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(fuzzy("roust", Some("body"), 0.5).to_string(), "body:roust~");
        assert_eq!(
            fuzzy("roust", None, 0.8).with_boost(2.0).to_string(),
            "roust~0.8^2"
        );
    }

    #[test]
    fn test_rewrite_in_field() {
        let index = test_index();
        let mut query = fuzzy("Rusty", Some("body"), 0.5);
        assert_eq!(query.rewrite(&index).unwrap().to_string(), "body:rust");
        assert_eq!(query.query_terms().unwrap(), vec![Term::in_field("body", "rust")]);
    }

    #[test]
    fn test_rewrite_fan_out() {
        let index = test_index();
        let mut query = fuzzy("rusty", None, 0.5);
        assert_eq!(
            query.rewrite(&index).unwrap().to_string(),
            "(title:rust) (body:rust)"
        );
    }

    #[test]
    fn test_rewrite_errors() {
        let index = test_index();
        assert!(fuzzy("rus*", Some("body"), 0.5).rewrite(&index).is_err());
        assert!(fuzzy("rust-guide", Some("body"), 0.5).rewrite(&index).is_err());
    }
}
