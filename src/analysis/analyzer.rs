use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use super::filter::{LengthFilter, LowerCaseFilter, StemmerFilter, StopWordsFilter, TokenFilter};
use super::ipv6::ipv6_with_cidr_pattern;
use crate::config::{AnalyzerConfig, AnalyzerKind};
use crate::error::{QueryError, Result};

/// A word produced by an analyzer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Byte offset of the first char in the source text
    pub start_offset: usize,
    /// Byte offset past the last char
    pub end_offset: usize,
    /// Distance from the previous token (1 for adjacent words)
    pub position_increment: u32,
}

impl Token {
    pub fn new(text: impl Into<String>, start_offset: usize, end_offset: usize) -> Self {
        Self {
            text: text.into(),
            start_offset,
            end_offset,
            position_increment: 1,
        }
    }
}

/// Splits text into terms, used both to resolve query words and to index documents
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

#[derive(Debug)]
enum Splitter {
    Pattern(Regex),
    UnicodeWords,
}

impl Splitter {
    fn for_kind(kind: AnalyzerKind) -> Result<Self> {
        let pattern = match kind {
            AnalyzerKind::Text => "[a-zA-Z]+".to_string(),
            AnalyzerKind::TextNum => "[a-zA-Z0-9]+".to_string(),
            AnalyzerKind::TextNumWithDot => r"[a-zA-Z0-9\.]+".to_string(),
            AnalyzerKind::TextNumWithDotAndIpV6 => {
                format!(r"{}|[a-zA-Z0-9\.]+", ipv6_with_cidr_pattern())
            }
            AnalyzerKind::UnicodeWords => return Ok(Splitter::UnicodeWords),
        };

        Regex::new(&pattern)
            .map(Splitter::Pattern)
            .map_err(|e| QueryError::Config(format!("invalid analyzer pattern: {}", e)))
    }

    fn split(&self, text: &str) -> Vec<Token> {
        match self {
            Splitter::Pattern(regex) => regex
                .find_iter(text)
                .map(|m| Token::new(m.as_str(), m.start(), m.end()))
                .collect(),
            Splitter::UnicodeWords => text
                .unicode_word_indices()
                .map(|(start, word)| Token::new(word, start, start + word.len()))
                .collect(),
        }
    }
}

/// Configurable analyzer: a splitter followed by a filter chain
///
/// # Example
///
/// ```
/// use quarry::analysis::{Analyzer, StandardAnalyzer};
/// use quarry::config::AnalyzerConfig;
///
/// let analyzer = StandardAnalyzer::new(&AnalyzerConfig::default()).unwrap();
/// let tokens = analyzer.tokenize("Block 2a02:5180::/64 now");
/// let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
/// assert_eq!(words, vec!["block", "2a02:5180::/64", "now"]);
/// ```
#[derive(Debug)]
pub struct StandardAnalyzer {
    splitter: Splitter,
    filters: Vec<Box<dyn TokenFilter>>,
}

impl StandardAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Result<Self> {
        let mut filters: Vec<Box<dyn TokenFilter>> = Vec::new();

        if config.lowercase {
            filters.push(Box::new(LowerCaseFilter));
        }
        if config.remove_stopwords || !config.stop_words.is_empty() {
            let filter = if config.remove_stopwords {
                StopWordsFilter::for_language(&config.language, &config.stop_words)
            } else {
                StopWordsFilter::from_words(config.stop_words.iter().map(|s| s.to_lowercase()))
            };
            filters.push(Box::new(filter));
        }
        filters.push(Box::new(LengthFilter::new(
            config.min_token_length,
            config.max_token_length,
        )));
        if config.stem {
            if let Some(stemmer) = StemmerFilter::for_language(&config.language) {
                filters.push(Box::new(stemmer));
            }
        }

        Ok(Self {
            splitter: Splitter::for_kind(config.kind)?,
            filters,
        })
    }

    /// Append a filter at the end of the chain
    pub fn with_filter(mut self, filter: impl TokenFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Analyzer for StandardAnalyzer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        // increments of removed tokens move to the next kept one
        let mut pending_increment = 0u32;

        'tokens: for raw in self.splitter.split(text) {
            pending_increment += raw.position_increment;
            let mut token = raw;
            for filter in &self.filters {
                match filter.filter(token) {
                    Some(kept) => token = kept,
                    None => continue 'tokens,
                }
            }
            token.position_increment = pending_increment;
            pending_increment = 0;
            tokens.push(token);
        }

        tokens
    }
}
