use thiserror::Error;

/// Main error type for query parsing, rewriting and execution
#[derive(Error, Debug)]
pub enum QueryError {
    /// Unrecognized character sequence in the query string
    #[error("{message} Char position {position}.")]
    Lexical { message: String, position: usize },

    /// The query string is lexically valid but malformed
    #[error("{}", render_syntax(.message, .position))]
    Syntax {
        message: String,
        position: Option<usize>,
    },

    #[error("{0}")]
    Semantic(String),

    #[error("Field {field} is not authorized. Authorized fields are: {}.", .allowed.join(", "))]
    Unauthorized { field: String, allowed: Vec<String> },

    /// Operation invoked on a node that cannot perform it (e.g. executing an un-rewritten node)
    #[error("{0}")]
    Unsupported(String),

    #[error("Terms per query limit ({limit}) is reached.")]
    TooManyTerms { limit: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for query operations
pub type Result<T> = std::result::Result<T, QueryError>;

fn render_syntax(message: &str, position: &Option<usize>) -> String {
    match position {
        Some(position) => format!(
            "{} at char position {}.",
            message.trim_end_matches('.'),
            position
        ),
        None => message.to_string(),
    }
}

impl QueryError {
    pub fn syntax(message: impl Into<String>) -> Self {
        QueryError::Syntax {
            message: message.into(),
            position: None,
        }
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        QueryError::Semantic(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        QueryError::Unsupported(message.into())
    }

    /// Attach a source position to a syntax error that does not carry one yet
    pub fn at_position(self, at: usize) -> Self {
        match self {
            QueryError::Syntax {
                message,
                position: None,
            } => QueryError::Syntax {
                message,
                position: Some(at),
            },
            other => other,
        }
    }

    /// Source character position (1-based) of the offending lexeme, if known
    pub fn position(&self) -> Option<usize> {
        match self {
            QueryError::Lexical { position, .. } => Some(*position),
            QueryError::Syntax { position, .. } => *position,
            _ => None,
        }
    }

    /// Check if the parser may replace this failure with a best-effort term query
    pub fn is_suppressible(&self) -> bool {
        matches!(self, QueryError::Syntax { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QueryError::Syntax {
            message: "Syntax error".to_string(),
            position: Some(25),
        };
        assert_eq!(err.to_string(), "Syntax error at char position 25.");

        let err = QueryError::Unauthorized {
            field: "secret".to_string(),
            allowed: vec!["title".to_string(), "body".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Field secret is not authorized. Authorized fields are: title, body."
        );
    }

    #[test]
    fn test_at_position_keeps_existing() {
        let err = QueryError::syntax("Boolean expression error.").at_position(4);
        assert_eq!(err.to_string(), "Boolean expression error at char position 4.");
        assert_eq!(err.position(), Some(4));

        let err = err.at_position(9);
        assert_eq!(err.position(), Some(4));
    }

    #[test]
    fn test_suppressible_errors() {
        assert!(QueryError::syntax("x").is_suppressible());
        assert!(!QueryError::semantic("x").is_suppressible());
        assert!(!QueryError::Lexical {
            message: "x".to_string(),
            position: 1
        }
        .is_suppressible());
        assert!(!QueryError::unsupported("x").is_suppressible());
    }
}
