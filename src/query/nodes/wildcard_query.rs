//! Wildcard query - matches vocabulary terms against a pattern
//!
//! Supports:
//! - `*` - matches any sequence of characters
//! - `?` - matches any single character
//!
//! The node is never executed directly: `rewrite` expands it into the
//! matching vocabulary terms.
//!
//! # Example
//!
//! ```rust
//! use quarry::index::Term;
//! use quarry::query::nodes::WildcardQuery;
//!
//! let query = WildcardQuery::new(Term::in_field("title", "prog*"));
//! assert_eq!(query.to_string(), "title:prog*");
//! ```

use regex::Regex;
use std::fmt;

use super::{check_terms_limit, expansion_to_query, DEFAULT_TERMS_LIMIT};
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{write_boost, Query, QueryNode};

/// Non-wildcard characters required before the first wildcard by default
pub const DEFAULT_MIN_PREFIX_LENGTH: usize = 3;

/// Query that matches terms using wildcard patterns
#[derive(Clone, Debug)]
pub struct WildcardQuery {
    pattern: Term,
    boost: f32,
    min_prefix_length: usize,
    terms_limit: usize,
    /// Terms found by the last rewrite
    matches: Option<Vec<Term>>,
}

impl WildcardQuery {
    pub fn new(pattern: Term) -> Self {
        Self {
            pattern,
            boost: 1.0,
            min_prefix_length: DEFAULT_MIN_PREFIX_LENGTH,
            terms_limit: DEFAULT_TERMS_LIMIT,
            matches: None,
        }
    }

    /// Set the boost factor
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn with_min_prefix_length(mut self, min_prefix_length: usize) -> Self {
        self.min_prefix_length = min_prefix_length;
        self
    }

    /// Cap on expanded terms, 0 disables the check
    pub fn with_terms_limit(mut self, terms_limit: usize) -> Self {
        self.terms_limit = terms_limit;
        self
    }

    pub fn pattern(&self) -> &Term {
        &self.pattern
    }

    /// Convert the wildcard pattern to an anchored regex
    fn pattern_to_regex(&self) -> Result<Regex> {
        let mut regex_pattern = String::from("^");

        for ch in self.pattern.text.chars() {
            match ch {
                '*' => regex_pattern.push_str(".*"),
                '?' => regex_pattern.push('.'),
                _ => regex_pattern.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
            }
        }

        regex_pattern.push('$');

        Regex::new(&regex_pattern).map_err(|e| {
            QueryError::semantic(format!("Invalid wildcard pattern: {}", e))
        })
    }

    /// Literal part of the pattern before the first wildcard
    pub fn extract_prefix(&self) -> &str {
        let end = self
            .pattern
            .text
            .find(['*', '?'])
            .unwrap_or(self.pattern.text.len());
        &self.pattern.text[..end]
    }

    /// Check if the pattern has any wildcards
    pub fn has_wildcards(&self) -> bool {
        self.pattern.text.contains(['*', '?'])
    }
}

impl QueryNode for WildcardQuery {
    fn query_type(&self) -> &'static str {
        "wildcard"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let prefix = self.extract_prefix();
        if prefix.chars().count() < self.min_prefix_length {
            return Err(QueryError::semantic(format!(
                "At least {} non-wildcard characters are required at the beginning of pattern.",
                self.min_prefix_length
            )));
        }

        let fields = match self.pattern.field() {
            Some(field) => vec![field.to_string()],
            None => index.field_names(true),
        };
        let regex = self.pattern_to_regex()?;

        let mut matches = Vec::new();
        for field in fields {
            for text in index.terms(&field) {
                if text.starts_with(prefix) && regex.is_match(&text) {
                    matches.push(Term::in_field(field.clone(), text));
                    check_terms_limit(matches.len(), self.terms_limit)?;
                }
            }
        }

        tracing::trace!(pattern = %self.pattern, matched = matches.len(), "wildcard expanded");
        let query = expansion_to_query(&matches, self.boost);
        self.matches = Some(matches);
        Ok(query)
    }

    unrewritten_execution!(
        "Wildcard query should not be directly used for search. Use rewrite() first."
    );
}

impl fmt::Display for WildcardQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)?;
        write_boost(f, self.boost)
    }
}
