//! Recognizer for `AND`/`OR`/`NOT` expressions
//!
//! Turns a flat sequence of literals and operators into disjunctive normal
//! form: a list of conjunctions, each a list of `(literal, positive)` pairs.
//! `AND` binds tighter than `OR`; `NOT` negates the next literal only and,
//! directly after a literal, also implies the default operator.

use crate::config::BooleanOperator;
use crate::error::{QueryError, Result};

/// Logical operator between two entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Literal,
    Not,
    And,
    Or,
}

/// One conjunction of the recognized expression
pub type Conjunction<T> = Vec<(T, bool)>;

#[derive(Debug)]
pub struct BooleanExpressionRecognizer<T> {
    state: State,
    /// Operator implied between two adjacent literals
    implicit: BooleanOperator,
    negative: bool,
    current: Conjunction<T>,
    conjunctions: Vec<Conjunction<T>>,
}

impl<T> BooleanExpressionRecognizer<T> {
    pub fn new(implicit: BooleanOperator) -> Self {
        Self {
            state: State::Start,
            implicit,
            negative: false,
            current: Vec::new(),
            conjunctions: Vec::new(),
        }
    }

    /// A literal is accepted in every state; after another literal it
    /// implies the configured default operator
    pub fn process_literal(&mut self, literal: T) {
        if self.state == State::Literal && self.implicit == BooleanOperator::Or {
            self.close_conjunction();
        }

        self.current.push((literal, !self.negative));
        self.negative = false;
        self.state = State::Literal;
    }

    pub fn process_operator(&mut self, operator: Operator) -> Result<()> {
        self.state = match (self.state, operator) {
            (State::Literal, Operator::And) => State::And,
            (State::Literal, Operator::Or) => {
                self.close_conjunction();
                State::Or
            }
            (State::Start | State::And | State::Or, Operator::Not) => {
                self.negative = true;
                State::Not
            }
            // `a NOT b` reads as `a <default operator> NOT b`
            (State::Literal, Operator::Not) => {
                if self.implicit == BooleanOperator::Or {
                    self.close_conjunction();
                }
                self.negative = true;
                State::Not
            }
            (State::Start | State::Not | State::And | State::Or, _) => {
                return Err(expression_error("Literal expected."))
            }
        };
        Ok(())
    }

    /// Conjunctions of the expression, in source order
    pub fn finish(mut self) -> Result<Vec<Conjunction<T>>> {
        if self.state != State::Literal {
            return Err(expression_error("Literal expected."));
        }

        self.close_conjunction();
        Ok(self.conjunctions)
    }

    fn close_conjunction(&mut self) {
        if !self.current.is_empty() {
            self.conjunctions.push(std::mem::take(&mut self.current));
        }
    }
}

fn expression_error(reason: &str) -> QueryError {
    QueryError::syntax(format!(
        "Boolean expression error. Error message: '{}'.",
        reason
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Item {
        Lit(&'static str),
        Op(Operator),
    }

    fn recognize(
        items: &[Item],
        implicit: BooleanOperator,
    ) -> Result<Vec<Vec<(&'static str, bool)>>> {
        let mut recognizer = BooleanExpressionRecognizer::new(implicit);
        for item in items {
            match *item {
                Item::Lit(literal) => recognizer.process_literal(literal),
                Item::Op(operator) => recognizer.process_operator(operator)?,
            }
        }
        recognizer.finish()
    }

    use Item::{Lit, Op};

    #[test]
    fn test_and_binds_tighter() {
        let result = recognize(
            &[Lit("a"), Op(Operator::Or), Lit("b"), Op(Operator::And), Lit("c")],
            BooleanOperator::Or,
        )
        .unwrap();
        assert_eq!(result, vec![vec![("a", true)], vec![("b", true), ("c", true)]]);
    }

    #[test]
    fn test_not_negates_next_literal() {
        let result = recognize(
            &[Lit("a"), Op(Operator::And), Op(Operator::Not), Lit("b")],
            BooleanOperator::Or,
        )
        .unwrap();
        assert_eq!(result, vec![vec![("a", true), ("b", false)]]);
    }

    #[test]
    fn test_implicit_operator() {
        let items = [Lit("a"), Lit("b"), Op(Operator::And), Lit("c")];
        assert_eq!(
            recognize(&items, BooleanOperator::Or).unwrap(),
            vec![vec![("a", true)], vec![("b", true), ("c", true)]]
        );
        assert_eq!(
            recognize(&items, BooleanOperator::And).unwrap(),
            vec![vec![("a", true), ("b", true), ("c", true)]]
        );
    }

    #[test]
    fn test_not_after_literal_implies_default_operator() {
        let items = [
            Lit("a"),
            Op(Operator::Not),
            Lit("b"),
            Op(Operator::And),
            Lit("c"),
        ];
        assert_eq!(
            recognize(&items, BooleanOperator::Or).unwrap(),
            vec![vec![("a", true)], vec![("b", false), ("c", true)]]
        );
        assert_eq!(
            recognize(&items, BooleanOperator::And).unwrap(),
            vec![vec![("a", true), ("b", false), ("c", true)]]
        );
    }

    #[test]
    fn test_malformed_expressions() {
        let dangling = recognize(&[Lit("a"), Op(Operator::And)], BooleanOperator::Or);
        assert_eq!(
            dangling.unwrap_err().to_string(),
            "Boolean expression error. Error message: 'Literal expected.'."
        );

        assert!(recognize(&[Op(Operator::Or), Lit("a")], BooleanOperator::Or).is_err());
        assert!(recognize(&[Lit("a"), Op(Operator::Not)], BooleanOperator::Or).is_err());
        assert!(recognize(&[Op(Operator::Not), Op(Operator::Not), Lit("a")], BooleanOperator::Or).is_err());
    }
}
