//! Rewrite context
//!
//! The `QueryContext` carries what preprocessing nodes need to turn raw query
//! text into index terms: the analyzer, the fan-out fields and the expansion
//! limits. It is built once per parser and shared by every node it produces.

use std::sync::Arc;

use super::nodes::{DEFAULT_MIN_PREFIX_LENGTH, DEFAULT_PREFIX_LENGTH, DEFAULT_TERMS_LIMIT};
use crate::analysis::{Analyzer, Token};
use crate::config::QueryParserConfig;
use crate::index::IndexReader;

/// Settings shared by preprocessing nodes during rewrite
#[derive(Debug)]
pub struct QueryContext {
    analyzer: Arc<dyn Analyzer>,

    /// Fan-out targets for field-less terms; empty means every indexed field
    default_search_fields: Vec<String>,

    wildcard_min_prefix_length: usize,

    fuzzy_prefix_length: usize,

    /// Cap on terms produced by one expansion (0 disables)
    terms_limit: usize,
}

impl QueryContext {
    /// Create a context with default limits
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self::builder(analyzer).build()
    }

    /// Create a context builder
    pub fn builder(analyzer: Arc<dyn Analyzer>) -> QueryContextBuilder {
        QueryContextBuilder::new(analyzer)
    }

    /// Create a context from parser configuration
    pub fn from_config(config: &QueryParserConfig, analyzer: Arc<dyn Analyzer>) -> Self {
        Self::builder(analyzer)
            .default_search_fields(config.default_search_fields.clone())
            .wildcard_min_prefix_length(config.wildcard_min_prefix_length)
            .fuzzy_prefix_length(config.fuzzy_prefix_length)
            .terms_limit(config.terms_per_query_limit)
            .build()
    }

    pub fn analyzer(&self) -> &dyn Analyzer {
        self.analyzer.as_ref()
    }

    /// Analyze text with the context analyzer
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.analyzer.tokenize(text)
    }

    /// Fields a field-less term fans out to
    pub fn search_fields(&self, index: &dyn IndexReader) -> Vec<String> {
        if self.default_search_fields.is_empty() {
            index.field_names(true)
        } else {
            self.default_search_fields.clone()
        }
    }

    pub fn wildcard_min_prefix_length(&self) -> usize {
        self.wildcard_min_prefix_length
    }

    pub fn fuzzy_prefix_length(&self) -> usize {
        self.fuzzy_prefix_length
    }

    pub fn terms_limit(&self) -> usize {
        self.terms_limit
    }
}

/// Builder for QueryContext
#[derive(Debug)]
pub struct QueryContextBuilder {
    analyzer: Arc<dyn Analyzer>,
    default_search_fields: Vec<String>,
    wildcard_min_prefix_length: usize,
    fuzzy_prefix_length: usize,
    terms_limit: usize,
}

impl QueryContextBuilder {
    fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            default_search_fields: Vec::new(),
            wildcard_min_prefix_length: DEFAULT_MIN_PREFIX_LENGTH,
            fuzzy_prefix_length: DEFAULT_PREFIX_LENGTH,
            terms_limit: DEFAULT_TERMS_LIMIT,
        }
    }

    /// Set the fan-out fields for field-less terms
    pub fn default_search_fields(mut self, fields: Vec<String>) -> Self {
        self.default_search_fields = fields;
        self
    }

    pub fn wildcard_min_prefix_length(mut self, length: usize) -> Self {
        self.wildcard_min_prefix_length = length;
        self
    }

    pub fn fuzzy_prefix_length(mut self, length: usize) -> Self {
        self.fuzzy_prefix_length = length;
        self
    }

    pub fn terms_limit(mut self, limit: usize) -> Self {
        self.terms_limit = limit;
        self
    }

    /// Build the QueryContext
    pub fn build(self) -> QueryContext {
        QueryContext {
            analyzer: self.analyzer,
            default_search_fields: self.default_search_fields,
            wildcard_min_prefix_length: self.wildcard_min_prefix_length,
            fuzzy_prefix_length: self.fuzzy_prefix_length,
            terms_limit: self.terms_limit,
        }
    }
}
