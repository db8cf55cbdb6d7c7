//! Query language front end and query tree
//!
//! [`QueryParser`] turns a query string into a tree of [`Query`] nodes. The
//! tree is then rewritten against an [`IndexReader`](crate::index::IndexReader),
//! optimized, and executed:
//!
//! ```
//! use std::sync::Arc;
//! use quarry::analysis::StandardAnalyzer;
//! use quarry::config::{AnalyzerConfig, QueryParserConfig};
//! use quarry::index::{Document, MemoryIndex};
//! use quarry::query::{QueryNode, QueryParser};
//!
//! let analyzer = Arc::new(StandardAnalyzer::new(&AnalyzerConfig::default()).unwrap());
//! let mut index = MemoryIndex::new(analyzer);
//! index.add_document(Document::new().text("title", "Rust in Action"));
//! index.add_document(Document::new().text("title", "Java Basics"));
//!
//! let parser = QueryParser::new(QueryParserConfig::default()).unwrap();
//! let mut query = parser.parse("rust").unwrap();
//! let mut query = query.rewrite(&index).unwrap().optimize(&index).unwrap();
//!
//! query.execute(&index, None).unwrap();
//! let docs: Vec<u32> = query.matched_docs().unwrap().iter().collect();
//! assert_eq!(docs, vec![0]);
//! assert!(query.score(0, &index).unwrap() > 0.0);
//! ```

pub mod ast;
pub mod context;
pub mod highlight;
pub mod nodes;
pub mod query_string;
pub mod types;
pub mod weight;

pub use ast::{Query, QueryNode};
pub use context::{QueryContext, QueryContextBuilder};
pub use highlight::Highlighter;
pub use query_string::{Lexeme, LexemeKind, ParseOutcome, QueryParser};
pub use types::Occur;
pub use weight::Weight;
