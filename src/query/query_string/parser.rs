//! Query string parser driver
//!
//! A [`QueryParser`] holds only immutable configuration and can be shared
//! across threads. Every call builds its own run state with a fresh state
//! machine and context stack.

use std::mem;
use std::sync::Arc;

use crate::analysis::{Analyzer, StandardAnalyzer};
use crate::config::{BooleanOperator, QueryParserConfig};
use crate::error::{QueryError, Result};
use crate::index::Term;
use crate::query::ast::Query;
use crate::query::context::QueryContext;
use crate::query::nodes::{MultiTermQuery, RangeQuery};
use crate::query::Occur;

use super::boolean_expr::Operator;
use super::entry::QueryEntry;
use super::fields::FieldPolicy;
use super::fsm::{Action, Actions, ParserState, StateMachine};
use super::lexer::{Lexeme, LexemeKind, Lexer};
use super::literal::ProtectedQuery;
use super::parser_context::ParserContext;

/// Result of [`QueryParser::parse_detailed`]
#[derive(Debug)]
pub struct ParseOutcome {
    pub query: Query,
    /// The syntax error replaced by the fallback term query, if any
    pub suppressed: Option<QueryError>,
}

/// Query string parser
///
/// # Example
///
/// ```
/// use quarry::config::QueryParserConfig;
/// use quarry::query::QueryParser;
///
/// let parser = QueryParser::new(QueryParserConfig::default()).unwrap();
/// let query = parser.parse("title:rust AND guide^2").unwrap();
/// assert_eq!(query.to_string(), "+(title:rust) +(guide^2)");
/// ```
#[derive(Debug, Clone)]
pub struct QueryParser {
    config: Arc<QueryParserConfig>,
    fields: FieldPolicy,
    context: Arc<QueryContext>,
}

impl QueryParser {
    /// Validate the configuration and build its analyzer
    pub fn new(config: QueryParserConfig) -> Result<Self> {
        config.validate()?;
        let analyzer = Arc::new(StandardAnalyzer::new(&config.analyzer)?);

        Ok(Self {
            fields: FieldPolicy::from_config(&config),
            context: Arc::new(QueryContext::from_config(&config, analyzer)),
            config: Arc::new(config),
        })
    }

    /// Swap the analyzer used for range bounds, rewrite and the fallback
    pub fn with_analyzer(mut self, analyzer: Arc<dyn Analyzer>) -> Self {
        self.context = Arc::new(QueryContext::from_config(&self.config, analyzer));
        self
    }

    pub fn config(&self) -> &QueryParserConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<QueryContext> {
        &self.context
    }

    /// Lex a query string, keeping IPv6 literals whole
    pub fn tokenize(&self, query: &str) -> Result<Vec<Lexeme>> {
        let protected = ProtectedQuery::protect(query);
        let mut lexemes = Lexer::new(protected.text()).tokenize()?;
        protected.restore(&mut lexemes);

        tracing::trace!(count = lexemes.len(), "query lexed");
        Ok(lexemes)
    }

    /// Parse a query string into an un-rewritten query tree
    ///
    /// With `suppress_exceptions` set, a syntax error yields a term query
    /// over the analyzed query text instead.
    pub fn parse(&self, query: &str) -> Result<Query> {
        self.parse_detailed(query).map(|outcome| outcome.query)
    }

    /// Like [`parse`](Self::parse), also reporting a suppressed error
    pub fn parse_detailed(&self, query: &str) -> Result<ParseOutcome> {
        match self.parse_strict(query) {
            Ok(parsed) => Ok(ParseOutcome {
                query: parsed,
                suppressed: None,
            }),
            Err(e) if self.config.suppress_exceptions && e.is_suppressible() => {
                tracing::debug!(error = %e, query, "query parsing failed, using term fallback");
                Ok(ParseOutcome {
                    query: self.fallback_query(query),
                    suppressed: Some(e),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Prefix every character with `\`
    pub fn escape(keyword: &str) -> String {
        let mut escaped = String::with_capacity(keyword.len() * 2);
        for ch in keyword.chars() {
            escaped.push('\\');
            escaped.push(ch);
        }
        escaped
    }

    fn parse_strict(&self, query: &str) -> Result<Query> {
        let lexemes = self.tokenize(query)?;
        if lexemes.is_empty() {
            return Ok(Query::insignificant());
        }

        let mut machine = StateMachine::new();
        let mut run = ParseRun::new(self);
        for lexeme in &lexemes {
            machine.process(&mut run, lexeme)?;
            run.last_kind = Some(lexeme.kind);
        }

        if machine.state() != ParserState::Common {
            return Err(QueryError::syntax("Syntax Error: range query is not closed."));
        }
        run.finish()
    }

    fn fallback_query(&self, query: &str) -> Query {
        let occur = match self.config.default_operator {
            BooleanOperator::And => Occur::Required,
            BooleanOperator::Or => Occur::Optional,
        };

        MultiTermQuery::from_terms(
            self.context
                .tokenize(query)
                .into_iter()
                .map(|token| (Term::unqualified(token.text), occur)),
        )
        .into()
    }
}

/// Mutable state of one parse call
struct ParseRun<'a> {
    parser: &'a QueryParser,
    context: ParserContext,
    stack: Vec<ParserContext>,
    last_kind: Option<LexemeKind>,
    range_first_term: String,
}

impl<'a> ParseRun<'a> {
    fn new(parser: &'a QueryParser) -> Self {
        Self {
            parser,
            context: ParserContext::new(None, parser.config.default_operator),
            stack: Vec::new(),
            last_kind: None,
            range_first_term: String::new(),
        }
    }

    fn finish(self) -> Result<Query> {
        if !self.stack.is_empty() {
            return Err(QueryError::syntax(
                "Syntax Error: mismatched parentheses, every opening must have closing.",
            ));
        }
        self.context.into_query(&self.parser.context)
    }

    /// Field of the next entry after the explicit-field check, validated and mapped
    fn entry_field(&self, missing: &str) -> Result<Option<String>> {
        let field = self.context.field();
        if self.parser.config.require_explicit_field && field.is_none() {
            return Err(QueryError::semantic(missing));
        }
        self.parser.fields.resolve(field)
    }

    fn add_term_entry(&mut self, lexeme: &Lexeme) -> Result<()> {
        let field = self.entry_field("A term without a specified field is not allowed.")?;
        self.context
            .add_entry(QueryEntry::term(lexeme.text.clone(), field));
        Ok(())
    }

    fn add_phrase_entry(&mut self, lexeme: &Lexeme) -> Result<()> {
        let field = self.entry_field("A phrase without a specified field is not allowed.")?;
        self.context
            .add_entry(QueryEntry::phrase(lexeme.text.clone(), field));
        Ok(())
    }

    fn set_field(&mut self, lexeme: &Lexeme) -> Result<()> {
        self.context.set_next_entry_field(lexeme.text.clone());
        Ok(())
    }

    fn set_sign(&mut self, lexeme: &Lexeme) -> Result<()> {
        let sign = match lexeme.kind {
            LexemeKind::Required => Occur::Required,
            LexemeKind::Prohibited => Occur::Prohibited,
            other => return Err(QueryError::Internal(format!("Unrecognized sign type {}.", other))),
        };
        self.context.set_next_entry_sign(sign)
    }

    fn fuzzy_proximity_modifier(&mut self, _lexeme: &Lexeme) -> Result<()> {
        self.context.process_fuzzy_proximity_modifier(None)
    }

    fn modifier_parameter(&mut self, lexeme: &Lexeme) -> Result<()> {
        let value: f32 = lexeme
            .text
            .parse()
            .map_err(|_| QueryError::Internal(format!("Wrong number syntax '{}'.", lexeme.text)))?;

        match self.last_kind {
            Some(LexemeKind::FuzzyProx) => self.context.process_fuzzy_proximity_modifier(Some(value)),
            Some(LexemeKind::Boost) => self.context.boost(value),
            // the lexer only emits numbers after a modifier
            _ => Err(QueryError::Internal(
                "Lexeme modifier parameter must follow lexeme modifier.".to_string(),
            )),
        }
    }

    fn subquery_start(&mut self, _lexeme: &Lexeme) -> Result<()> {
        let scope = ParserContext::new(self.context.field(), self.context.default_operator());
        let parent = mem::replace(&mut self.context, scope);
        self.stack.push(parent);
        Ok(())
    }

    fn subquery_end(&mut self, lexeme: &Lexeme) -> Result<()> {
        let Some(parent) = self.stack.pop() else {
            return Err(QueryError::Syntax {
                message: "Syntax Error: mismatched parentheses, every opening must have closing."
                    .to_string(),
                position: Some(lexeme.position),
            });
        };

        let scope = mem::replace(&mut self.context, parent);
        let query = scope.into_query(&self.parser.context)?;
        self.context.add_entry(QueryEntry::subquery(query));
        Ok(())
    }

    fn logical_operator(&mut self, lexeme: &Lexeme) -> Result<()> {
        let operator = match lexeme.kind {
            LexemeKind::And => Operator::And,
            LexemeKind::Or => Operator::Or,
            LexemeKind::Not => Operator::Not,
            other => {
                return Err(QueryError::Internal(format!(
                    "Unrecognized logical operator {}.",
                    other
                )))
            }
        };
        self.context.add_logical_operator(operator, lexeme.position)
    }

    fn range_first_term(&mut self, lexeme: &Lexeme) -> Result<()> {
        self.range_first_term = lexeme.text.clone();
        Ok(())
    }

    fn closed_range_last_term(&mut self, lexeme: &Lexeme) -> Result<()> {
        self.add_range_entry(lexeme, true)
    }

    fn opened_range_last_term(&mut self, lexeme: &Lexeme) -> Result<()> {
        self.add_range_entry(lexeme, false)
    }

    fn add_range_entry(&mut self, last: &Lexeme, inclusive: bool) -> Result<()> {
        let lower = self.range_boundary(&self.range_first_term)?;
        let upper = self.range_boundary(&last.text)?;
        if lower.is_none() && upper.is_none() {
            return Err(QueryError::semantic(
                "At least one range query boundary term must be non-empty term",
            ));
        }

        let field = self.context.field();
        if self.parser.config.require_explicit_field && field.is_none() {
            return Err(QueryError::semantic("Field declaration is missing in range."));
        }
        let field = self.parser.fields.resolve(field)?;

        let range = RangeQuery::new(
            lower.map(|text| Term::new(text, field.clone())),
            upper.map(|text| Term::new(text, field)),
            inclusive,
        )?
        .with_terms_limit(self.parser.context.terms_limit());
        self.context.add_entry(QueryEntry::subquery(range.into()));
        Ok(())
    }

    /// Analyzed boundary text, `None` for an open boundary
    fn range_boundary(&self, text: &str) -> Result<Option<String>> {
        let mut tokens = self.parser.context.tokenize(text);
        if tokens.len() > 1 {
            return Err(QueryError::semantic(
                "Range query boundary terms must be non-multiple word terms",
            ));
        }
        Ok(tokens.pop().map(|token| token.text))
    }
}

impl<'a> Actions for ParseRun<'a> {
    fn input_action(state: ParserState, kind: LexemeKind) -> Option<Action<Self>> {
        if state != ParserState::Common {
            return None;
        }

        let action: Action<Self> = match kind {
            LexemeKind::Word => Self::add_term_entry,
            LexemeKind::Phrase => Self::add_phrase_entry,
            LexemeKind::Field => Self::set_field,
            LexemeKind::Required | LexemeKind::Prohibited => Self::set_sign,
            LexemeKind::FuzzyProx => Self::fuzzy_proximity_modifier,
            LexemeKind::Number => Self::modifier_parameter,
            LexemeKind::SubqueryStart => Self::subquery_start,
            LexemeKind::SubqueryEnd => Self::subquery_end,
            LexemeKind::And | LexemeKind::Or | LexemeKind::Not => Self::logical_operator,
            // boost is applied by its number
            LexemeKind::Boost
            | LexemeKind::RangeInclStart
            | LexemeKind::RangeInclEnd
            | LexemeKind::RangeExclStart
            | LexemeKind::RangeExclEnd
            | LexemeKind::To => return None,
        };
        Some(action)
    }

    fn entry_action(state: ParserState) -> Option<Action<Self>> {
        let action: Action<Self> = match state {
            ParserState::ClosedFirst | ParserState::OpenedFirst => Self::range_first_term,
            ParserState::ClosedLast => Self::closed_range_last_term,
            ParserState::OpenedLast => Self::opened_range_last_term,
            ParserState::Common
            | ParserState::ClosedStart
            | ParserState::ClosedTo
            | ParserState::OpenedStart
            | ParserState::OpenedTo => return None,
        };
        Some(action)
    }
}
