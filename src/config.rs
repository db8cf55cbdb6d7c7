use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{QueryError, Result};

/// Operator applied between two entries when the query names none
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    /// Entries are optional unless signed
    #[default]
    Or,
    /// Entries are required unless signed
    And,
}

/// Word splitting strategy of the standard analyzer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// Runs of ASCII letters
    Text,
    /// Runs of ASCII letters and digits
    TextNum,
    /// Runs of ASCII letters, digits and dots
    TextNumWithDot,
    /// Like `TextNumWithDot`, but IPv6 addresses stay whole
    #[default]
    TextNumWithDotAndIpV6,
    /// Unicode word boundaries
    UnicodeWords,
}

/// Analyzer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub kind: AnalyzerKind,
    pub lowercase: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub min_token_length: usize,
    pub max_token_length: usize,
    pub language: String,
    /// Extra stop words on top of the language list
    pub stop_words: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            kind: AnalyzerKind::default(),
            lowercase: true,
            remove_stopwords: false,
            stem: false,
            min_token_length: 1,
            max_token_length: 255,
            language: "english".to_string(),
            stop_words: Vec::new(),
        }
    }
}

/// Query parser configuration
///
/// Built once and shared read-only by every parse call.
///
/// # Example
///
/// ```
/// use quarry::config::{BooleanOperator, QueryParserConfig};
///
/// let config = QueryParserConfig::default()
///     .with_default_search_fields(["title", "body"])
///     .with_default_operator(BooleanOperator::And)
///     .with_suppress_exceptions(false);
///
/// assert_eq!(config.default_search_fields.len(), 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParserConfig {
    /// Fan-out targets for field-less terms (empty: every indexed field)
    pub default_search_fields: Vec<String>,
    pub default_operator: BooleanOperator,
    pub encoding: String,
    /// Replace syntax errors with a best-effort term query
    pub suppress_exceptions: bool,
    /// Query field name to index field name
    pub field_mapping: HashMap<String, String>,
    /// Field allow-list (empty: every field is allowed)
    pub allowed_fields: Vec<String>,
    /// Allowed but never listed in authorization errors
    pub private_fields: Vec<String>,
    pub require_explicit_field: bool,
    pub wildcard_min_prefix_length: usize,
    pub fuzzy_prefix_length: usize,
    /// 0 disables the limit
    pub terms_per_query_limit: usize,
    pub analyzer: AnalyzerConfig,
}

impl Default for QueryParserConfig {
    fn default() -> Self {
        Self {
            default_search_fields: Vec::new(),
            default_operator: BooleanOperator::Or,
            encoding: "UTF-8".to_string(),
            suppress_exceptions: true,
            field_mapping: HashMap::new(),
            allowed_fields: Vec::new(),
            private_fields: Vec::new(),
            require_explicit_field: false,
            wildcard_min_prefix_length: 3,
            fuzzy_prefix_length: 3,
            terms_per_query_limit: 1024,
            analyzer: AnalyzerConfig::default(),
        }
    }
}

impl QueryParserConfig {
    /// Parse a JSON configuration document; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        let encoding = self.encoding.to_ascii_lowercase().replace(['-', '_'], "");
        if encoding != "utf8" {
            return Err(QueryError::Config(format!(
                "unsupported encoding '{}', only UTF-8 is accepted",
                self.encoding
            )));
        }

        if self.analyzer.min_token_length > self.analyzer.max_token_length {
            return Err(QueryError::Config(format!(
                "analyzer min_token_length {} exceeds max_token_length {}",
                self.analyzer.min_token_length, self.analyzer.max_token_length
            )));
        }

        if let Some(field) = self
            .private_fields
            .iter()
            .find(|field| !self.allowed_fields.is_empty() && !self.allowed_fields.contains(field))
        {
            return Err(QueryError::Config(format!(
                "private field '{}' is not in the allow-list",
                field
            )));
        }

        Ok(())
    }

    pub fn with_default_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default_operator(mut self, operator: BooleanOperator) -> Self {
        self.default_operator = operator;
        self
    }

    pub fn with_suppress_exceptions(mut self, suppress: bool) -> Self {
        self.suppress_exceptions = suppress;
        self
    }

    pub fn with_field_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.field_mapping.insert(from.into(), to.into());
        self
    }

    pub fn with_allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_private_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.private_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_require_explicit_field(mut self, require: bool) -> Self {
        self.require_explicit_field = require;
        self
    }

    pub fn with_wildcard_min_prefix_length(mut self, length: usize) -> Self {
        self.wildcard_min_prefix_length = length;
        self
    }

    pub fn with_fuzzy_prefix_length(mut self, length: usize) -> Self {
        self.fuzzy_prefix_length = length;
        self
    }

    /// Cap on terms one wildcard/fuzzy/range expansion may produce, 0 disables it
    pub fn with_terms_per_query_limit(mut self, limit: usize) -> Self {
        self.terms_per_query_limit = limit;
        self
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = QueryParserConfig::default();
        assert_eq!(config.default_operator, BooleanOperator::Or);
        assert!(config.suppress_exceptions);
        assert_eq!(config.wildcard_min_prefix_length, 3);
        assert_eq!(config.analyzer.kind, AnalyzerKind::TextNumWithDotAndIpV6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_encoding_validation() {
        let mut config = QueryParserConfig::default();
        config.encoding = "utf8".to_string();
        assert!(config.validate().is_ok());

        config.encoding = "ISO-8859-1".to_string();
        assert!(matches!(config.validate(), Err(QueryError::Config(_))));
    }

    #[test]
    fn test_private_field_must_be_allowed() {
        let config = QueryParserConfig::default()
            .with_allowed_fields(["title"])
            .with_private_fields(["acl"]);
        assert!(config.validate().is_err());

        let config = config.with_allowed_fields(["title", "acl"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = QueryParserConfig::from_json_str(
            r#"{"default_operator": "and", "analyzer": {"kind": "text_num"}}"#,
        )
        .unwrap();

        assert_eq!(config.default_operator, BooleanOperator::And);
        assert_eq!(config.analyzer.kind, AnalyzerKind::TextNum);
        assert!(config.analyzer.lowercase);
        assert!(config.suppress_exceptions);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"default_search_fields": ["contents"], "field_mapping": {{"t": "title"}}}}"#
        )
        .unwrap();

        let config = QueryParserConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_search_fields, vec!["contents".to_string()]);
        assert_eq!(config.field_mapping.get("t"), Some(&"title".to_string()));
    }
}
