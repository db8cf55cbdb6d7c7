use std::fmt;
use std::sync::Arc;

use super::escape_word;
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{write_boost, Query, QueryNode};
use crate::query::context::QueryContext;
use crate::query::nodes::{MultiTermQuery, TermQuery, WildcardQuery};
use crate::query::Occur;

/// A bare word from the query string
///
/// Rewrite tries, in order: fan-out over the search fields when no field is
/// given, an exact keyword match, wildcard expansion, and finally analysis
/// of the word into one or more terms.
#[derive(Clone, Debug)]
pub struct PreprocessingTerm {
    word: String,
    field: Option<String>,
    boost: f32,
    context: Arc<QueryContext>,
    matches: Option<Vec<Term>>,
}

impl PreprocessingTerm {
    pub fn new(word: impl Into<String>, field: Option<String>, context: Arc<QueryContext>) -> Self {
        Self {
            word: word.into(),
            field,
            boost: 1.0,
            context,
            matches: None,
        }
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    fn in_field(&self, field: String) -> Self {
        Self::new(self.word.clone(), Some(field), Arc::clone(&self.context))
    }

    fn rewrite_all_fields(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let mut query = MultiTermQuery::new().with_boost(self.boost);
        let mut has_insignificant = false;

        for field in self.context.search_fields(index) {
            let rewritten = self.in_field(field).rewrite(index)?;
            has_insignificant |= rewritten.is_insignificant();
            for term in rewritten.query_terms()? {
                query.add_term(term, Occur::Optional);
            }
        }

        if query.is_empty() {
            self.matches = Some(Vec::new());
            return Ok(if has_insignificant {
                Query::insignificant()
            } else {
                Query::empty_result()
            });
        }

        tracing::trace!(word = %self.word, terms = query.terms().len(), "term fanned out");
        self.matches = Some(query.query_terms()?);
        Ok(query.into())
    }
}

impl QueryNode for PreprocessingTerm {
    fn query_type(&self) -> &'static str {
        "preprocessing_term"
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

        // keyword fields match the raw word
        let exact = Term::in_field(field.clone(), self.word.clone());
        if index.has_term(&exact) {
            self.matches = Some(vec![exact.clone()]);
            return Ok(TermQuery::new(exact).with_boost(self.boost).into());
        }

        if self.word.contains(['*', '?']) {
            let pattern = analyze_wildcard_pattern(&self.word, &self.context)?;
            let mut query = WildcardQuery::new(Term::in_field(field, pattern))
                .with_boost(self.boost)
                .with_min_prefix_length(self.context.wildcard_min_prefix_length())
                .with_terms_limit(self.context.terms_limit());
            let rewritten = query.rewrite(index)?;
            self.matches = Some(query.query_terms()?);
            return Ok(rewritten);
        }

        let tokens = self.context.tokenize(&self.word);
        let query: Query = match tokens.as_slice() {
            [] => Query::insignificant(),
            [token] => TermQuery::new(Term::in_field(field, token.text.clone()))
                .with_boost(self.boost)
                .into(),
            _ => MultiTermQuery::from_terms(tokens.iter().map(|token| {
                (Term::in_field(field.clone(), token.text.clone()), Occur::Required)
            }))
            .with_boost(self.boost)
            .into(),
        };

        self.matches = Some(query.query_terms()?);
        Ok(query)
    }

    unrewritten_execution!("This query is not intended to be executed.");
}

impl fmt::Display for PreprocessingTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}:", field)?;
        }
        f.write_str(&escape_word(&self.word))?;
        write_boost(f, self.boost)
    }
}

/// Analyze the literal parts of a wildcard pattern, keeping the wildcards
///
/// Each part between wildcards must analyze to at most one token.
pub(super) fn analyze_wildcard_pattern(word: &str, context: &QueryContext) -> Result<String> {
    let mut pattern = String::with_capacity(word.len());

    for (id, part) in word.split(['*', '?']).enumerate() {
        if id != 0 {
            // the wildcard that ended the previous part
            let offset = pattern_offset(word, id);
            pattern.push_str(&word[offset..offset + 1]);
        }

        let tokens = context.tokenize(part);
        if tokens.len() > 1 {
            return Err(QueryError::semantic(
                "Wildcard search is supported only for non-multiple word terms",
            ));
        }
        if let Some(token) = tokens.into_iter().next() {
            pattern.push_str(&token.text);
        }
    }

    Ok(pattern)
}

/// Byte offset of the `nth` wildcard (1-based) in `word`
fn pattern_offset(word: &str, nth: usize) -> usize {
    word.match_indices(['*', '?'])
        .nth(nth - 1)
        .map_or(word.len(), |(offset, _)| offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::preprocessing::test_context;
    use crate::query::nodes::test_index;

    fn term(word: &str, field: Option<&str>) -> PreprocessingTerm {
        PreprocessingTerm::new(word, field.map(str::to_string), test_context())
    }

    #[test]
    fn test_display() {
        assert_eq!(term("te?t", None).to_string(), "te\\?t");
        assert_eq!(
            term("rust", Some("title")).with_boost(4.0).to_string(),
            "title:rust^4"
        );
    }

    #[test]
    fn test_fan_out_in_field_order() {
        let index = test_index();
        let mut query = term("Rust", None);
        assert_eq!(
            query.rewrite(&index).unwrap().to_string(),
            "title:rust body:rust id:rust"
        );
        assert_eq!(query.query_terms().unwrap().len(), 3);
    }

    #[test]
    fn test_fan_out_insignificant() {
        let index = test_index();
        let mut query = term("---", None);
        assert!(query.rewrite(&index).unwrap().is_insignificant());
        assert!(query.query_terms().unwrap().is_empty());
    }

    #[test]
    fn test_keyword_match() {
        let index = test_index();
        let mut query = term("A-1", Some("id"));
        assert_eq!(query.rewrite(&index).unwrap().to_string(), "id:A-1");
    }

    #[test]
    fn test_analyzed_words() {
        let index = test_index();

        let mut single = term("Guide", Some("body"));
        assert_eq!(single.rewrite(&index).unwrap().to_string(), "body:guide");

        let mut multi = term("rust-guide", Some("body"));
        assert_eq!(
            multi.rewrite(&index).unwrap().to_string(),
            "+body:rust +body:guide"
        );
    }

    #[test]
    fn test_wildcard() {
        let index = test_index();
        let mut query = term("Prog*", Some("body"));
        assert_eq!(query.rewrite(&index).unwrap().to_string(), "body:programming");
        assert_eq!(
            query.query_terms().unwrap(),
            vec![Term::in_field("body", "programming")]
        );

        let mut query = term("rust-gu*", Some("body"));
        assert!(query.rewrite(&index).is_err());
    }

    #[test]
    fn test_analyze_wildcard_pattern() {
        let context = test_context();
        assert_eq!(analyze_wildcard_pattern("Te?T*", &context).unwrap(), "te?t*");
        assert_eq!(analyze_wildcard_pattern("*ab", &context).unwrap(), "*ab");
    }
}
