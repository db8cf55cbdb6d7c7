//! Parser state machine
//!
//! Transitions are a total function of (state, lexeme kind); actions are
//! looked up in tables supplied by the driver through [`Actions`].

use crate::error::{QueryError, Result};

use super::lexer::{Lexeme, LexemeKind};

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    /// Any query element outside a range
    Common,
    /// After `[`
    ClosedStart,
    ClosedFirst,
    ClosedTo,
    ClosedLast,
    /// After `{`
    OpenedStart,
    OpenedFirst,
    OpenedTo,
    OpenedLast,
}

impl ParserState {
    /// Next state, `None` when the lexeme is not accepted here
    pub fn transition(self, kind: LexemeKind) -> Option<ParserState> {
        use LexemeKind as K;
        use ParserState as S;

        match (self, kind) {
            (S::Common, K::RangeInclStart) => Some(S::ClosedStart),
            (S::Common, K::RangeExclStart) => Some(S::OpenedStart),
            (
                S::Common,
                K::Word
                | K::Phrase
                | K::Field
                | K::Required
                | K::Prohibited
                | K::FuzzyProx
                | K::Boost
                | K::SubqueryStart
                | K::SubqueryEnd
                | K::And
                | K::Or
                | K::Not
                | K::Number,
            ) => Some(S::Common),

            (S::ClosedStart, K::Word) => Some(S::ClosedFirst),
            (S::ClosedFirst, K::To) => Some(S::ClosedTo),
            (S::ClosedTo, K::Word) => Some(S::ClosedLast),
            (S::ClosedLast, K::RangeInclEnd) => Some(S::Common),

            (S::OpenedStart, K::Word) => Some(S::OpenedFirst),
            (S::OpenedFirst, K::To) => Some(S::OpenedTo),
            (S::OpenedTo, K::Word) => Some(S::OpenedLast),
            (S::OpenedLast, K::RangeExclEnd) => Some(S::Common),

            _ => None,
        }
    }
}

/// Semantic action run by the machine
pub type Action<R> = fn(&mut R, &Lexeme) -> Result<()>;

/// Action tables of a machine driver
pub trait Actions: Sized {
    /// Action run when `kind` is consumed in `state`
    fn input_action(state: ParserState, kind: LexemeKind) -> Option<Action<Self>>;

    /// Action run when `state` is entered from another state
    fn entry_action(state: ParserState) -> Option<Action<Self>>;
}

#[derive(Debug)]
pub struct StateMachine {
    state: ParserState,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: ParserState::Common,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Consume one lexeme: input action, transition, then entry action
    ///
    /// Syntax errors raised by actions without a position get the
    /// lexeme's position.
    pub fn process<R: Actions>(&mut self, driver: &mut R, lexeme: &Lexeme) -> Result<()> {
        let source = self.state;
        let target = source.transition(lexeme.kind).ok_or(QueryError::Syntax {
            message: "Syntax error".to_string(),
            position: Some(lexeme.position),
        })?;

        if let Some(action) = R::input_action(source, lexeme.kind) {
            action(driver, lexeme).map_err(|e| e.at_position(lexeme.position))?;
        }

        self.state = target;
        if source != target {
            if let Some(action) = R::entry_action(target) {
                action(driver, lexeme).map_err(|e| e.at_position(lexeme.position))?;
            }
        }

        Ok(())
    }
}
