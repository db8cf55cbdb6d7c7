//! Range query - matches vocabulary terms between two bounds
//!
//! Terms compare bytewise, the way the vocabulary is sorted. A missing bound
//! leaves that side of the range open.

use std::fmt;

use super::{check_terms_limit, expansion_to_query, DEFAULT_TERMS_LIMIT};
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{write_boost, Query, QueryNode};

/// Query that matches terms within a lexicographic range
#[derive(Clone, Debug)]
pub struct RangeQuery {
    lower: Option<Term>,
    upper: Option<Term>,
    inclusive: bool,
    field: Option<String>,
    boost: f32,
    terms_limit: usize,
    matches: Option<Vec<Term>>,
}

impl RangeQuery {
    /// Create a range query
    ///
    /// At least one bound is required, and both bounds must target the same field.
    pub fn new(lower: Option<Term>, upper: Option<Term>, inclusive: bool) -> Result<Self> {
        let field = match (&lower, &upper) {
            (None, None) => {
                return Err(QueryError::semantic(
                    "At least one range boundary must be specified.",
                ))
            }
            (Some(lower), Some(upper)) if lower.field != upper.field => {
                return Err(QueryError::semantic(
                    "Both range boundaries must be for the same field.",
                ))
            }
            (Some(bound), _) | (None, Some(bound)) => bound.field.clone(),
        };

        Ok(Self {
            lower,
            upper,
            inclusive,
            field,
            boost: 1.0,
            terms_limit: DEFAULT_TERMS_LIMIT,
            matches: None,
        })
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Cap on expanded terms, 0 disables the check
    pub fn with_terms_limit(mut self, terms_limit: usize) -> Self {
        self.terms_limit = terms_limit;
        self
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn lower(&self) -> Option<&Term> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&Term> {
        self.upper.as_ref()
    }

    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }

    fn contains(&self, text: &str) -> bool {
        let above_lower = match &self.lower {
            Some(lower) if self.inclusive => text >= lower.text.as_str(),
            Some(lower) => text > lower.text.as_str(),
            None => true,
        };
        let below_upper = match &self.upper {
            Some(upper) if self.inclusive => text <= upper.text.as_str(),
            Some(upper) => text < upper.text.as_str(),
            None => true,
        };
        above_lower && below_upper
    }
}

impl QueryNode for RangeQuery {
    fn query_type(&self) -> &'static str {
        "range"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let fields = match &self.field {
            Some(field) => vec![field.clone()],
            None => index.field_names(true),
        };

        let mut matches = Vec::new();
        for field in fields {
            for text in index.terms(&field) {
                if self.contains(&text) {
                    matches.push(Term::in_field(field.clone(), text));
                    check_terms_limit(matches.len(), self.terms_limit)?;
                }
            }
        }

        tracing::trace!(range = %self, matched = matches.len(), "range expanded");
        let query = expansion_to_query(&matches, self.boost);
        self.matches = Some(matches);
        Ok(query)
    }

    unrewritten_execution!(
        "Range query should not be directly used for search. Use rewrite() first."
    );
}

impl fmt::Display for RangeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "{}:", field)?;
        }
        let (open, close) = if self.inclusive { ('[', ']') } else { ('{', '}') };
        let lower = self.lower.as_ref().map_or("null", |term| term.text.as_str());
        let upper = self.upper.as_ref().map_or("null", |term| term.text.as_str());
        write!(f, "{}{} TO {}{}", open, lower, upper, close)?;
        write_boost(f, self.boost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::test_index;

    fn body(text: &str) -> Option<Term> {
        Some(Term::in_field("body", text))
    }

    #[test]
    fn test_bounds_validation() {
        assert!(RangeQuery::new(None, None, true).is_err());
        assert!(RangeQuery::new(body("a"), Some(Term::in_field("title", "z")), true).is_err());

        let query = RangeQuery::new(None, body("m"), false).unwrap();
        assert_eq!(query.field(), Some("body"));
    }

    #[test]
    fn test_display() {
        let query = RangeQuery::new(body("business"), body("by"), true).unwrap();
        assert_eq!(query.to_string(), "body:[business TO by]");

        let query = RangeQuery::new(Some(Term::unqualified("a")), None, false)
            .unwrap()
            .with_boost(3.0);
        assert_eq!(query.to_string(), "{a TO null}^3");
    }

    #[test]
    fn test_rewrite_inclusive_and_exclusive() {
        let index = test_index();

        let mut inclusive = RangeQuery::new(body("cargo"), body("guide"), true).unwrap();
        assert_eq!(
            inclusive.rewrite(&index).unwrap().to_string(),
            "body:cargo body:for body:guide"
        );

        let mut exclusive = RangeQuery::new(body("cargo"), body("guide"), false).unwrap();
        assert_eq!(exclusive.rewrite(&index).unwrap().to_string(), "body:for");
    }

    #[test]
    fn test_rewrite_open_bound() {
        let index = test_index();
        let mut query = RangeQuery::new(body("with"), None, true).unwrap();
        assert_eq!(query.rewrite(&index).unwrap().to_string(), "body:with");

        let mut query = RangeQuery::new(body("zzz"), None, true).unwrap();
        assert!(query.rewrite(&index).unwrap().is_empty_result());
    }

    #[test]
    fn test_execution_requires_rewrite() {
        let index = test_index();
        let mut query = RangeQuery::new(body("a"), body("b"), true).unwrap();
        assert!(matches!(
            query.execute(&index, None),
            Err(QueryError::Unsupported(_))
        ));
        query.rewrite(&index).unwrap();
        assert!(query.query_terms().is_ok());
    }
}
