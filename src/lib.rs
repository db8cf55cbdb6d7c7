pub mod analysis;
pub mod config;
pub mod error;
pub mod index;
pub mod query;

pub use config::{AnalyzerConfig, AnalyzerKind, BooleanOperator, QueryParserConfig};
pub use error::{QueryError, Result};
pub use index::{IndexReader, MemoryIndex, Term};
pub use query::{Query, QueryNode, QueryParser};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
