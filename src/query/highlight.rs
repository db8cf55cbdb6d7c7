//! Highlighting seam
//!
//! Query nodes only report the words they matched; marking those words in a
//! document is left to the implementor.

/// Receives the words a rewritten query matched
pub trait Highlighter {
    fn highlight(&mut self, words: &[String]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Term;
    use crate::query::ast::{Query, QueryNode};
    use crate::query::nodes::{MultiTermQuery, TermQuery};
    use crate::query::Occur;

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl Highlighter for Collect {
        fn highlight(&mut self, words: &[String]) {
            self.0.extend_from_slice(words);
        }
    }

    #[test]
    fn test_prohibited_terms_are_not_highlighted() {
        let mut multi = MultiTermQuery::new();
        multi.add_term(Term::in_field("body", "rust"), Occur::Required);
        multi.add_term(Term::in_field("body", "java"), Occur::Prohibited);
        let query = Query::from(multi);

        let mut collect = Collect::default();
        query.highlight_matches(&mut collect).unwrap();
        assert_eq!(collect.0, vec!["rust"]);
    }

    #[test]
    fn test_term_highlight() {
        let query = Query::from(TermQuery::new(Term::in_field("body", "quarry")));
        let mut collect = Collect::default();
        query.highlight_matches(&mut collect).unwrap();
        assert_eq!(collect.0, vec!["quarry"]);
    }
}
