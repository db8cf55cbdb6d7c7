//! Fuzzy query - matches terms within an edit-distance similarity
//!
//! Similarity between the query term and a vocabulary term is derived from
//! their Levenshtein distance, normalized by the shorter word length. Both
//! words must share the first `prefix_length` characters exactly.
//!
//! # Example
//!
//! ```rust
//! use quarry::index::Term;
//! use quarry::query::nodes::FuzzyQuery;
//!
//! // "roust" is close enough to "rust"
//! let query = FuzzyQuery::new(Term::in_field("body", "roust"), 0.5, 1).unwrap();
//! assert_eq!(query.to_string(), "body:roust~0.5");
//! ```

use std::cmp::Ordering;
use std::fmt;

use super::{check_terms_limit, BooleanQuery, TermQuery, DEFAULT_TERMS_LIMIT};
use crate::error::{QueryError, Result};
use crate::index::{IndexReader, Term};
use crate::query::ast::{format_number, write_boost, Query, QueryNode};
use crate::query::Occur;

pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;

/// Exact-match prefix used when none is configured
pub const DEFAULT_PREFIX_LENGTH: usize = 3;

/// Upper bound on clauses of the rewritten boolean query
const MAX_CLAUSE_COUNT: usize = 1024;

/// Query that matches terms similar to the query term
#[derive(Clone, Debug)]
pub struct FuzzyQuery {
    term: Term,
    min_similarity: f32,
    prefix_length: usize,
    boost: f32,
    terms_limit: usize,
    matches: Option<Vec<Term>>,
}

impl FuzzyQuery {
    /// Create a fuzzy query, rejecting a similarity outside `[0, 1)`
    pub fn new(term: Term, min_similarity: f32, prefix_length: usize) -> Result<Self> {
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
            term,
            min_similarity,
            prefix_length,
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

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn min_similarity(&self) -> f32 {
        self.min_similarity
    }

    /// Similarity of a candidate sharing the prefix, given both suffixes
    fn similarity(&self, prefix_len: usize, rest: &str, target: &str) -> f32 {
        let rest_len = rest.chars().count();
        let target_len = target.chars().count();

        if rest_len == 0 {
            return if prefix_len == 0 {
                0.0
            } else {
                1.0 - target_len as f32 / prefix_len as f32
            };
        }
        if target_len == 0 {
            return if prefix_len == 0 {
                0.0
            } else {
                1.0 - rest_len as f32 / prefix_len as f32
            };
        }

        let shorter = rest_len.min(target_len);
        let max_distance =
            ((1.0 - self.min_similarity) * (shorter + prefix_len) as f32).floor() as usize;
        if max_distance < rest_len.abs_diff(target_len) {
            return 0.0;
        }

        1.0 - levenshtein_distance(rest, target) as f32 / (prefix_len + shorter) as f32
    }
}

impl QueryNode for FuzzyQuery {
    fn query_type(&self) -> &'static str {
        "fuzzy"
    }

    fn boost(&self) -> f32 {
        self.boost
    }

    fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    fn rewrite(&mut self, index: &dyn IndexReader) -> Result<Query> {
        let fields = match self.term.field() {
            Some(field) => vec![field.to_string()],
            None => index.field_names(true),
        };

        let prefix: String = self.term.text.chars().take(self.prefix_length).collect();
        let prefix_len = prefix.chars().count();
        let rest = &self.term.text[prefix.len()..];
        let scale = 1.0 / (1.0 - self.min_similarity);

        let mut scored: Vec<(Term, f32)> = Vec::new();
        for field in fields {
            for text in index.terms(&field) {
                let Some(target) = text.strip_prefix(prefix.as_str()) else {
                    continue;
                };

                let similarity = self.similarity(prefix_len, rest, target);
                if similarity > self.min_similarity {
                    scored.push((
                        Term::in_field(field.clone(), text.clone()),
                        (similarity - self.min_similarity) * scale,
                    ));
                    check_terms_limit(scored.len(), self.terms_limit)?;
                }
            }
        }

        scored.sort_by(|(a, a_score), (b, b_score)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        tracing::trace!(term = %self.term, matched = scored.len(), "fuzzy expanded");

        let query = match scored.as_slice() {
            [] => Query::empty_result(),
            [(term, _)] => TermQuery::new(term.clone()).with_boost(self.boost).into(),
            _ => {
                let mut query = BooleanQuery::new().with_boost(self.boost);
                for (term, score) in scored.iter().take(MAX_CLAUSE_COUNT) {
                    query.add_subquery(
                        TermQuery::new(term.clone()).with_boost(*score).into(),
                        Occur::Optional,
                    );
                }
                query.into()
            }
        };

        self.matches = Some(scored.into_iter().map(|(term, _)| term).collect());
        Ok(query)
    }

    unrewritten_execution!(
        "Fuzzy query should not be directly used for search. Use rewrite() first."
    );
}

impl fmt::Display for FuzzyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.term, format_number(self.min_similarity))?;
        write_boost(f, self.boost)
    }
}

/// Calculate Levenshtein distance between two strings
///
/// Uses dynamic programming with O(m*n) time and O(min(m,n)) space.
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    let (shorter, longer) = if s1_chars.len() <= s2_chars.len() {
        (&s1_chars, &s2_chars)
    } else {
        (&s2_chars, &s1_chars)
    };
    if shorter.is_empty() {
        return longer.len();
    }

    // two rows of the DP table
    let mut prev_row: Vec<usize> = (0..=shorter.len()).collect();
    let mut curr_row = vec![0; shorter.len() + 1];

    for (i, long_ch) in longer.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, short_ch) in shorter.iter().enumerate() {
            let cost = usize::from(long_ch != short_ch);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[shorter.len()]
}
