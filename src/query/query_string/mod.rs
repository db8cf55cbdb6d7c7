//! Lucene-style query string parser
//!
//! Supports syntax like:
//! - `title:rust AND body:cargo`
//! - `+required -prohibited optional`
//! - `body:"exact phrase"~2`
//! - `title:prog*`, `author:jon~0.7`
//! - `year:[2020 TO 2024]`, `name:{a TO m}`
//! - `(rust OR cargo)^2`
//! - `ip:[2a02:5180::1 TO 2a02:5180::ffff]`
//!
//! # Pipeline
//!
//! ```text
//! query string
//!   -> literal pass (IPv6 colons protected)
//!   -> lexer (lexemes)
//!   -> state machine + parser context stack
//!   -> query tree of preprocessing nodes
//! ```
//!
//! # Example
//!
//! ```rust
//! use quarry::config::QueryParserConfig;
//! use quarry::query::query_string::QueryParser;
//!
//! let parser = QueryParser::new(QueryParserConfig::default()).unwrap();
//! let query = parser.parse("+title:rust -body:java").unwrap();
//! assert_eq!(query.to_string(), "+(title:rust) -(body:java)");
//! ```

pub mod boolean_expr;
pub mod entry;
pub mod fields;
pub mod fsm;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod parser_context;

pub use boolean_expr::{BooleanExpressionRecognizer, Operator};
pub use entry::QueryEntry;
pub use fields::FieldPolicy;
pub use fsm::{ParserState, StateMachine};
pub use lexer::{Lexeme, LexemeKind, Lexer};
pub use literal::ProtectedQuery;
pub use parser::{ParseOutcome, QueryParser};
pub use parser_context::ParserContext;
