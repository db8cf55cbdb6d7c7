use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::index::{IndexReader, Term};
use crate::query::ast::{write_boost, Query, QueryNode};
use crate::query::context::QueryContext;
use crate::query::nodes::{BooleanQuery, PhraseQuery, TermQuery};
use crate::query::Occur;

/// A quoted phrase from the query string, with optional proximity
#[derive(Clone, Debug)]
pub struct PreprocessingPhrase {
    phrase: String,
    field: Option<String>,
    slop: u32,
    boost: f32,
    context: Arc<QueryContext>,
    matches: Option<Vec<Term>>,
}

impl PreprocessingPhrase {
    pub fn new(
        phrase: impl Into<String>,
        field: Option<String>,
        context: Arc<QueryContext>,
    ) -> Self {
        Self {
            phrase: phrase.into(),
            field,
            slop: 0,
            boost: 1.0,
            context,
            matches: None,
        }
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

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn slop(&self) -> u32 {
        self.slop
    }
}

impl QueryNode for PreprocessingPhrase {
    fn query_type(&self) -> &'static str {
        "preprocessing_phrase"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let Some(field) = self.field.clone() else {
            let mut query = BooleanQuery::new().with_boost(self.boost);
            for field in self.context.search_fields(index) {
                let mut subquery =
                    PreprocessingPhrase::new(self.phrase.clone(), Some(field), Arc::clone(&self.context))
                        .with_slop(self.slop);
                query.add_subquery(subquery.rewrite(index)?, Occur::Optional);
            }

            self.matches = Some(query.query_terms()?);
            return Ok(query.into());
        };

        let exact = Term::in_field(field.clone(), self.phrase.clone());
        if index.has_term(&exact) {
            self.matches = Some(vec![exact.clone()]);
            return Ok(TermQuery::new(exact).with_boost(self.boost).into());
        }

        let tokens = self.context.tokenize(&self.phrase);
        let query: Query = match tokens.as_slice() {
            [] => Query::insignificant(),
            [token] => TermQuery::new(Term::in_field(field, token.text.clone()))
                .with_boost(self.boost)
                .into(),
            _ => {
                let mut query = PhraseQuery::new().with_slop(self.slop).with_boost(self.boost);
                let mut position: i64 = -1;
                for token in &tokens {
                    position += token.position_increment as i64;
                    query.add_term(
                        Term::in_field(field.clone(), token.text.clone()),
                        Some(position.max(0) as u32),
                    )?;
                }
                query.into()
            }
        };

        self.matches = Some(query.query_terms()?);
        Ok(query)
    }

    unrewritten_execution!("This query is not intended to be executed.");
}

impl fmt::Display for PreprocessingPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}:", field)?;
        }
        write!(f, "\"{}\"", self.phrase)?;
        if self.slop != 0 {
            write!(f, "~{}", self.slop)?;
        }
        write_boost(f, self.boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::preprocessing::test_context;
    use crate::query::nodes::test_index;

    fn phrase(text: &str, field: Option<&str>) -> PreprocessingPhrase {
        PreprocessingPhrase::new(text, field.map(str::to_string), test_context())
    }

    #[test]
    fn test_display() {
        assert_eq!(
            phrase("Rust Programming", Some("body")).with_slop(2).to_string(),
            "body:\"Rust Programming\"~2"
        );
        assert_eq!(phrase("a b", None).with_boost(0.5).to_string(), "\"a b\"^0.5");
    }

    #[test]
    fn test_rewrite_in_field() {
        let index = test_index();

        let mut query = phrase("Rust Programming", Some("body")).with_slop(1);
        assert_eq!(
            query.rewrite(&index).unwrap().to_string(),
            "body:\"rust programming\"~1"
        );
        assert_eq!(query.query_terms().unwrap().len(), 2);

        let mut single = phrase("Rust", Some("title"));
        assert_eq!(single.rewrite(&index).unwrap().to_string(), "title:rust");

        let mut empty = phrase("--", Some("title"));
        assert!(empty.rewrite(&index).unwrap().is_insignificant());
    }

    #[test]
    fn test_rewrite_fan_out() {
        let index = test_index();
        let mut query = phrase("rust guide", None);
        assert_eq!(
            query.rewrite(&index).unwrap().to_string(),
            "(title:\"rust guide\") (body:\"rust guide\") (id:\"rust guide\")"
        );
    }

    #[test]
    fn test_keyword_phrase() {
        let index = test_index();
        let mut query = phrase("A-1", Some("id"));
        assert_eq!(query.rewrite(&index).unwrap().to_string(), "id:A-1");
    }
}
