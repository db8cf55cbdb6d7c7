//! Per-scope accumulator of the parser
//!
//! A scope is the whole query or one parenthesized subquery. It collects
//! entries in one of two styles, never both: sign style (`+a -b c`) or
//! boolean style (`a AND NOT b OR c`). The style is fixed by the first sign
//! or operator seen.

use std::sync::Arc;

use crate::config::BooleanOperator;
use crate::error::{QueryError, Result};
use crate::query::ast::Query;
use crate::query::context::QueryContext;
use crate::query::nodes::BooleanQuery;
use crate::query::Occur;

use super::boolean_expr::{BooleanExpressionRecognizer, Operator};
use super::entry::QueryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupingMode {
    Signs,
    Boolean,
}

#[derive(Debug)]
enum Item {
    Entry(QueryEntry),
    /// Operator with the position of its lexeme
    Operator(Operator, usize),
}

const MIXED_STYLES: &str = "It's not allowed to mix boolean and signs styles in the same subquery.";

#[derive(Debug)]
pub struct ParserContext {
    /// Field inherited from the enclosing scope
    default_field: Option<String>,
    next_entry_field: Option<String>,
    next_entry_sign: Option<Occur>,
    default_operator: BooleanOperator,
    mode: Option<GroupingMode>,
    items: Vec<Item>,
    /// Sign of each entry, sign style only
    signs: Vec<Option<Occur>>,
}

impl ParserContext {
    pub fn new(default_field: Option<String>, default_operator: BooleanOperator) -> Self {
        Self {
            default_field,
            next_entry_field: None,
            next_entry_sign: None,
            default_operator,
            mode: None,
            items: Vec::new(),
            signs: Vec::new(),
        }
    }

    /// Field of the next entry: the pending field, else the inherited one
    pub fn field(&self) -> Option<String> {
        self.next_entry_field
            .clone()
            .or_else(|| self.default_field.clone())
    }

    pub fn default_operator(&self) -> BooleanOperator {
        self.default_operator
    }

    pub fn set_next_entry_field(&mut self, field: impl Into<String>) {
        self.next_entry_field = Some(field.into());
    }

    pub fn set_next_entry_sign(&mut self, sign: Occur) -> Result<()> {
        if self.mode == Some(GroupingMode::Boolean) {
            return Err(QueryError::syntax(MIXED_STYLES));
        }

        self.mode = Some(GroupingMode::Signs);
        self.next_entry_sign = Some(sign);
        Ok(())
    }

    /// Append an entry, consuming the pending field and sign
    pub fn add_entry(&mut self, entry: QueryEntry) {
        if self.mode != Some(GroupingMode::Boolean) {
            self.signs.push(self.next_entry_sign);
        }

        self.items.push(Item::Entry(entry));
        self.next_entry_field = None;
        self.next_entry_sign = None;
    }

    pub fn add_logical_operator(&mut self, operator: Operator, position: usize) -> Result<()> {
        if self.mode == Some(GroupingMode::Signs) {
            return Err(QueryError::syntax(MIXED_STYLES));
        }

        self.mode = Some(GroupingMode::Boolean);
        self.items.push(Item::Operator(operator, position));
        Ok(())
    }

    pub fn process_fuzzy_proximity_modifier(&mut self, parameter: Option<f32>) -> Result<()> {
        let entry = self
            .last_entry_mut()
            .ok_or_else(|| QueryError::syntax("'~' modifier must follow word or phrase."))?;
        entry.process_fuzzy_proximity_modifier(parameter)
    }

    pub fn boost(&mut self, factor: f32) -> Result<()> {
        let entry = self.last_entry_mut().ok_or_else(|| {
            QueryError::syntax("'^' modifier must follow word, phrase or subquery.")
        })?;
        entry.boost(factor);
        Ok(())
    }

    /// The entry a modifier applies to, if the modifier is well placed
    fn last_entry_mut(&mut self) -> Option<&mut QueryEntry> {
        if self.next_entry_field.is_some() || self.next_entry_sign.is_some() {
            return None;
        }

        match self.items.last_mut() {
            Some(Item::Entry(entry)) => Some(entry),
            Some(Item::Operator(..)) | None => None,
        }
    }

    /// Fold the scope into a single query node
    pub fn into_query(self, context: &Arc<QueryContext>) -> Result<Query> {
        match self.mode {
            Some(GroupingMode::Boolean) => self.boolean_style_query(context),
            Some(GroupingMode::Signs) | None => self.sign_style_query(context),
        }
    }

    fn sign_style_query(self, context: &Arc<QueryContext>) -> Result<Query> {
        let default_sign = match self.default_operator {
            BooleanOperator::And => Occur::Required,
            BooleanOperator::Or => Occur::Optional,
        };

        let mut query = BooleanQuery::new();
        for (item, sign) in self.items.into_iter().zip(self.signs) {
            if let Item::Entry(entry) = item {
                query.add_subquery(entry.into_query(context)?, sign.unwrap_or(default_sign));
            }
        }
        Ok(query.into())
    }

    /// Expression errors point at the offending operator; a dangling one
    /// is always the last operator of the scope
    fn boolean_style_query(self, context: &Arc<QueryContext>) -> Result<Query> {
        let mut recognizer = BooleanExpressionRecognizer::new(self.default_operator);
        let mut last_operator = None;
        for item in self.items {
            match item {
                Item::Entry(entry) => recognizer.process_literal(entry),
                Item::Operator(operator, position) => {
                    last_operator = Some(position);
                    recognizer
                        .process_operator(operator)
                        .map_err(|e| e.at_position(position))?;
                }
            }
        }

        let conjunctions = recognizer.finish().map_err(|e| match last_operator {
            Some(position) => e.at_position(position),
            None => e,
        })?;

        let mut subqueries = Vec::new();
        for conjunction in conjunctions {
            // a purely negative conjunction matches nothing on its own
            if conjunction.iter().all(|(_, positive)| !positive) {
                continue;
            }

            if conjunction.len() == 1 {
                if let Some((entry, _)) = conjunction.into_iter().next() {
                    subqueries.push(entry.into_query(context)?);
                }
                continue;
            }

            let mut subquery = BooleanQuery::new();
            for (entry, positive) in conjunction {
                let occur = if positive {
                    Occur::Required
                } else {
                    Occur::Prohibited
                };
                subquery.add_subquery(entry.into_query(context)?, occur);
            }
            subqueries.push(subquery.into());
        }

        Ok(match subqueries.len() {
            0 => Query::insignificant(),
            1 => subqueries.remove(0),
            _ => BooleanQuery::from_clauses(
                subqueries
                    .into_iter()
                    .map(|subquery| (subquery, Occur::Optional)),
            )
            .into(),
        })
    }
}
