//! Parsed query entries, before folding into a query tree

use std::sync::Arc;

use crate::error::{QueryError, Result};
use crate::query::ast::{Query, QueryNode};
use crate::query::context::QueryContext;
use crate::query::nodes::{
    PreprocessingFuzzy, PreprocessingPhrase, PreprocessingTerm, DEFAULT_MIN_SIMILARITY,
};

/// One element of a parser scope: a word, a phrase or a finished subquery
#[derive(Debug, Clone)]
pub enum QueryEntry {
    Term {
        word: String,
        field: Option<String>,
        /// Minimum similarity once `~` was applied
        fuzzy: Option<f32>,
        boost: f32,
    },
    Phrase {
        phrase: String,
        field: Option<String>,
        /// Slop once `~` was applied
        proximity: Option<u32>,
        boost: f32,
    },
    Subquery {
        query: Query,
        boost: f32,
    },
}

impl QueryEntry {
    pub fn term(word: impl Into<String>, field: Option<String>) -> Self {
        QueryEntry::Term {
            word: word.into(),
            field,
            fuzzy: None,
            boost: 1.0,
        }
    }

    pub fn phrase(phrase: impl Into<String>, field: Option<String>) -> Self {
        QueryEntry::Phrase {
            phrase: phrase.into(),
            field,
            proximity: None,
            boost: 1.0,
        }
    }

    pub fn subquery(query: Query) -> Self {
        QueryEntry::Subquery { query, boost: 1.0 }
    }

    /// Apply `~` with its optional parameter
    pub fn process_fuzzy_proximity_modifier(&mut self, parameter: Option<f32>) -> Result<()> {
        match self {
            QueryEntry::Term { fuzzy, .. } => {
                *fuzzy = Some(parameter.unwrap_or(DEFAULT_MIN_SIMILARITY));
                Ok(())
            }
            QueryEntry::Phrase { proximity, .. } => {
                // fractional distances are truncated
                *proximity = Some(parameter.map_or(0, |distance| distance.max(0.0) as u32));
                Ok(())
            }
            QueryEntry::Subquery { .. } => {
                Err(QueryError::syntax("'~' sign must follow term or phrase"))
            }
        }
    }

    /// Multiply the entry boost
    pub fn boost(&mut self, factor: f32) {
        match self {
            QueryEntry::Term { boost, .. }
            | QueryEntry::Phrase { boost, .. }
            | QueryEntry::Subquery { boost, .. } => *boost *= factor,
        }
    }

    /// Build the query node of this entry
    pub fn into_query(self, context: &Arc<QueryContext>) -> Result<Query> {
        match self {
            QueryEntry::Term {
                word,
                field,
                fuzzy: Some(similarity),
                boost,
            } => Ok(
                PreprocessingFuzzy::new(word, field, similarity, Arc::clone(context))?
                    .with_boost(boost)
                    .into(),
            ),
            QueryEntry::Term {
                word,
                field,
                fuzzy: None,
                boost,
            } => Ok(PreprocessingTerm::new(word, field, Arc::clone(context))
                .with_boost(boost)
                .into()),
            QueryEntry::Phrase {
                phrase,
                field,
                proximity,
                boost,
            } => Ok(PreprocessingPhrase::new(phrase, field, Arc::clone(context))
                .with_slop(proximity.unwrap_or(0))
                .with_boost(boost)
                .into()),
            QueryEntry::Subquery { mut query, boost } => {
                let combined = query.boost() * boost;
                query.set_boost(combined);
                Ok(query)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::nodes::preprocessing::test_context;

    #[test]
    fn test_term_entry() {
        let context = test_context();
        let mut entry = QueryEntry::term("rust", Some("title".to_string()));
        entry.boost(2.0);
        entry.boost(1.5);
        assert_eq!(entry.into_query(&context).unwrap().to_string(), "title:rust^3");
    }

    #[test]
    fn test_fuzzy_term_entry() {
        let context = test_context();

        let mut entry = QueryEntry::term("roam", None);
        entry.process_fuzzy_proximity_modifier(None).unwrap();
        assert_eq!(entry.into_query(&context).unwrap().to_string(), "roam~");

        let mut entry = QueryEntry::term("roam", None);
        entry.process_fuzzy_proximity_modifier(Some(0.8)).unwrap();
        assert_eq!(entry.into_query(&context).unwrap().to_string(), "roam~0.8");

        let mut entry = QueryEntry::term("roam", None);
        entry.process_fuzzy_proximity_modifier(Some(2.0)).unwrap();
        assert!(entry.into_query(&context).is_err());
    }

    #[test]
    fn test_phrase_entry() {
        let context = test_context();
        let mut entry = QueryEntry::phrase("rust guide", Some("body".to_string()));
        entry.process_fuzzy_proximity_modifier(Some(3.0)).unwrap();
        assert_eq!(
            entry.into_query(&context).unwrap().to_string(),
            "body:\"rust guide\"~3"
        );
    }

    #[test]
    fn test_subquery_entry() {
        let context = test_context();
        let mut entry = QueryEntry::subquery(Query::insignificant());
        assert!(entry.process_fuzzy_proximity_modifier(None).is_err());

        let inner = QueryEntry::term("rust", None).into_query(&context).unwrap();
        let mut entry = QueryEntry::subquery(inner);
        entry.boost(4.0);
        assert_eq!(entry.into_query(&context).unwrap().to_string(), "rust^4");
    }
}
