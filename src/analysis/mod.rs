//! Text analysis: word splitting and token filters

pub mod analyzer;
pub mod filter;
pub mod ipv6;

pub use analyzer::{Analyzer, StandardAnalyzer, Token};
pub use filter::{LengthFilter, LowerCaseFilter, StemmerFilter, StopWordsFilter, TokenFilter};
