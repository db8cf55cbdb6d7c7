//! Query string lexer
//!
//! Splits a query string into [`Lexeme`]s. Positions are 1-based character
//! offsets of the first character of each lexeme.

use std::fmt;

use crate::error::{QueryError, Result};

/// Characters that always form a lexeme of their own
const SYNTAX_CHARS: &str = ":()[]{}!|&";

/// Kind of a query string lexeme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexemeKind {
    Word,
    Phrase,
    /// A word followed by `:`
    Field,
    /// `+`
    Required,
    /// `-`
    Prohibited,
    /// `~`
    FuzzyProx,
    /// `^`
    Boost,
    /// `[`
    RangeInclStart,
    /// `]`
    RangeInclEnd,
    /// `{`
    RangeExclStart,
    /// `}`
    RangeExclEnd,
    /// `(`
    SubqueryStart,
    /// `)`
    SubqueryEnd,
    /// `AND`, `&&`
    And,
    /// `OR`, `||`
    Or,
    /// `NOT`, `!`
    Not,
    /// `TO` inside a range
    To,
    /// Parameter of a `~` or `^` modifier
    Number,
}

impl fmt::Display for LexemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LexemeKind::Word => "word",
            LexemeKind::Phrase => "phrase",
            LexemeKind::Field => "field",
            LexemeKind::Required => "required",
            LexemeKind::Prohibited => "prohibited",
            LexemeKind::FuzzyProx => "fuzzy",
            LexemeKind::Boost => "boost",
            LexemeKind::RangeInclStart => "range-incl-start",
            LexemeKind::RangeInclEnd => "range-incl-end",
            LexemeKind::RangeExclStart => "range-excl-start",
            LexemeKind::RangeExclEnd => "range-excl-end",
            LexemeKind::SubqueryStart => "subquery-start",
            LexemeKind::SubqueryEnd => "subquery-end",
            LexemeKind::And => "and",
            LexemeKind::Or => "or",
            LexemeKind::Not => "not",
            LexemeKind::To => "to",
            LexemeKind::Number => "number",
        };
        f.write_str(name)
    }
}

/// A classified span of the query string
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    /// Text with escapes resolved (phrases without their quotes)
    pub text: String,
    pub position: usize,
}

impl Lexeme {
    pub fn new(kind: LexemeKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {:?}", self.kind, self.position, self.text)
    }
}

/// Lexer for query strings
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    lexemes: Vec<Lexeme>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            lexemes: Vec::new(),
        }
    }

    /// Split the whole input; blank input yields no lexemes
    pub fn tokenize(mut self) -> Result<Vec<Lexeme>> {
        while self.position < self.input.len() {
            match self.current_char() {
                ch if is_whitespace(ch) => self.advance(),
                '"' => self.read_phrase()?,
                '+' => self.push_single(LexemeKind::Required),
                '-' => self.push_single(LexemeKind::Prohibited),
                '~' => self.read_modifier(LexemeKind::FuzzyProx)?,
                '^' => self.read_modifier(LexemeKind::Boost)?,
                ch if SYNTAX_CHARS.contains(ch) => self.read_syntax(ch)?,
                _ => self.read_word()?,
            }
        }

        Ok(self.lexemes)
    }

    fn read_word(&mut self) -> Result<()> {
        let start = self.position;
        let mut text = String::new();
        let mut escaped = false;

        while self.position < self.input.len() {
            let ch = self.current_char();
            if is_whitespace(ch) || SYNTAX_CHARS.contains(ch) || ch == '~' || ch == '^' {
                break;
            }
            match ch {
                '"' => {
                    return Err(self.error("Quote within lexeme must be escaped by '\\' char."));
                }
                '\\' => {
                    self.advance();
                    if self.position >= self.input.len() {
                        return Err(self.error("Escape character '\\' at the end of query."));
                    }
                    text.push(self.current_char());
                    escaped = true;
                }
                // '+' and '-' only start a lexeme at a lexeme boundary
                _ => text.push(ch),
            }
            self.advance();
        }

        let kind = if escaped {
            LexemeKind::Word
        } else {
            keyword_kind(&text).unwrap_or(LexemeKind::Word)
        };
        self.lexemes.push(Lexeme::new(kind, text, start + 1));
        Ok(())
    }

    fn read_phrase(&mut self) -> Result<()> {
        let start = self.position;
        let mut text = String::new();
        self.advance();

        while self.position < self.input.len() {
            let ch = self.current_char();
            match ch {
                '"' => {
                    self.advance();
                    self.lexemes.push(Lexeme::new(LexemeKind::Phrase, text, start + 1));
                    return Ok(());
                }
                '\\' => {
                    self.advance();
                    if self.position >= self.input.len() {
                        break;
                    }
                    text.push(self.current_char());
                }
                _ => text.push(ch),
            }
            self.advance();
        }

        Err(QueryError::Lexical {
            message: "Unterminated quoted phrase.".to_string(),
            position: start + 1,
        })
    }

    fn read_syntax(&mut self, ch: char) -> Result<()> {
        let kind = match ch {
            '(' => LexemeKind::SubqueryStart,
            ')' => LexemeKind::SubqueryEnd,
            '[' => LexemeKind::RangeInclStart,
            ']' => LexemeKind::RangeInclEnd,
            '{' => LexemeKind::RangeExclStart,
            '}' => LexemeKind::RangeExclEnd,
            '!' => LexemeKind::Not,
            '&' | '|' => return self.read_double_char(ch),
            ':' => return self.mark_field(),
            _ => return Err(self.error("Unexpected syntax character.")),
        };

        self.push_single(kind);
        Ok(())
    }

    /// `&&` and `||`
    fn read_double_char(&mut self, ch: char) -> Result<()> {
        if self.peek() != Some(ch) {
            return Err(self.error("Two chars lexeme expected."));
        }

        let kind = if ch == '&' {
            LexemeKind::And
        } else {
            LexemeKind::Or
        };
        self.lexemes
            .push(Lexeme::new(kind, format!("{ch}{ch}"), self.position + 1));
        self.position += 2;
        Ok(())
    }

    /// `:` turns the preceding word into a field name
    fn mark_field(&mut self) -> Result<()> {
        match self.lexemes.last_mut() {
            Some(last) if last.kind == LexemeKind::Word => {
                last.kind = LexemeKind::Field;
                self.advance();
                Ok(())
            }
            _ => Err(self.error("Field mark ':' must follow field name.")),
        }
    }

    fn read_modifier(&mut self, kind: LexemeKind) -> Result<()> {
        self.push_single(kind);

        match self.input.get(self.position).copied() {
            None => Ok(()),
            Some(ch) if is_whitespace(ch) || SYNTAX_CHARS.contains(ch) => Ok(()),
            Some('~') | Some('^') => Ok(()),
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(),
            Some(_) => Err(self.error(
                "Lexeme modifier character can be followed only by number, white space or query syntax element.",
            )),
        }
    }

    fn read_number(&mut self) -> Result<()> {
        let start = self.position;
        let mut text = String::new();
        let mut has_dot = false;

        while self.position < self.input.len() {
            let ch = self.current_char();
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch == '.' && !has_dot {
                has_dot = true;
                text.push(ch);
            } else if is_whitespace(ch) || SYNTAX_CHARS.contains(ch) || ch == '~' || ch == '^' {
                break;
            } else {
                return Err(self.error("Wrong number syntax."));
            }
            self.advance();
        }

        if !text.chars().any(|ch| ch.is_ascii_digit()) {
            return Err(QueryError::Lexical {
                message: "Wrong number syntax.".to_string(),
                position: start + 1,
            });
        }

        self.lexemes
            .push(Lexeme::new(LexemeKind::Number, text, start + 1));
        Ok(())
    }

    fn push_single(&mut self, kind: LexemeKind) {
        let ch = self.current_char();
        self.lexemes
            .push(Lexeme::new(kind, ch.to_string(), self.position + 1));
        self.advance();
    }

    fn error(&self, message: &str) -> QueryError {
        QueryError::Lexical {
            message: message.to_string(),
            position: self.position + 1,
        }
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }
}

fn is_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n')
}

fn keyword_kind(word: &str) -> Option<LexemeKind> {
    match word.to_ascii_uppercase().as_str() {
        "AND" => Some(LexemeKind::And),
        "OR" => Some(LexemeKind::Or),
        "NOT" => Some(LexemeKind::Not),
        "TO" => Some(LexemeKind::To),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<LexemeKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|lexeme| lexeme.kind)
            .collect()
    }

    fn lexical_error(input: &str) -> (String, usize) {
        match Lexer::new(input).tokenize() {
            Err(QueryError::Lexical { message, position }) => (message, position),
            other => panic!("expected lexical error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(Lexer::new("").tokenize().unwrap().is_empty());
        assert!(Lexer::new(" \t\r\n ").tokenize().unwrap().is_empty());
    }

    #[test]
    fn test_field_value() {
        let lexemes = Lexer::new("title:rust").tokenize().unwrap();
        assert_eq!(
            lexemes,
            vec![
                Lexeme::new(LexemeKind::Field, "title", 1),
                Lexeme::new(LexemeKind::Word, "rust", 7),
            ]
        );
    }

    #[test]
    fn test_boolean_operators() {
        use LexemeKind::*;
        assert_eq!(
            kinds("a AND b or c Not d && e || f !g"),
            vec![Word, And, Word, Or, Word, Not, Word, And, Word, Or, Word, Not, Word]
        );
    }

    #[test]
    fn test_escaped_keyword_is_word() {
        let lexemes = Lexer::new("\\and").tokenize().unwrap();
        assert_eq!(lexemes, vec![Lexeme::new(LexemeKind::Word, "and", 1)]);
    }

    #[test]
    fn test_signs_only_at_lexeme_start() {
        use LexemeKind::*;
        assert_eq!(kinds("+required -excluded"), vec![Required, Word, Prohibited, Word]);

        let lexemes = Lexer::new("rust-lang a+b").tokenize().unwrap();
        assert_eq!(lexemes[0].text, "rust-lang");
        assert_eq!(lexemes[1].text, "a+b");
    }

    #[test]
    fn test_phrase() {
        let lexemes = Lexer::new("\"hello \\\"world\\\"\"~2").tokenize().unwrap();
        assert_eq!(
            lexemes,
            vec![
                Lexeme::new(LexemeKind::Phrase, "hello \"world\"", 1),
                Lexeme::new(LexemeKind::FuzzyProx, "~", 18),
                Lexeme::new(LexemeKind::Number, "2", 19),
            ]
        );
    }

    #[test]
    fn test_modifiers_and_numbers() {
        use LexemeKind::*;
        assert_eq!(kinds("rust^2.5"), vec![Word, Boost, Number]);
        assert_eq!(kinds("rust~"), vec![Word, FuzzyProx]);
        assert_eq!(kinds("rust~0.8^3"), vec![Word, FuzzyProx, Number, Boost, Number]);
        assert_eq!(kinds("(a b)^2"), vec![SubqueryStart, Word, Word, SubqueryEnd, Boost, Number]);
    }

    #[test]
    fn test_range() {
        use LexemeKind::*;
        assert_eq!(
            kinds("year:[2020 TO 2024]"),
            vec![Field, RangeInclStart, Word, To, Word, RangeInclEnd]
        );
        assert_eq!(
            kinds("{a to b}"),
            vec![RangeExclStart, Word, To, Word, RangeExclEnd]
        );
    }

    #[test]
    fn test_escaped_colon_stays_in_word() {
        let lexemes = Lexer::new("ip:2a02\\:5180").tokenize().unwrap();
        assert_eq!(lexemes[1], Lexeme::new(LexemeKind::Word, "2a02:5180", 4));
    }

    #[test]
    fn test_wildcards_are_word_chars() {
        let lexemes = Lexer::new("prog* te?t").tokenize().unwrap();
        assert_eq!(lexemes[0].text, "prog*");
        assert_eq!(lexemes[1].text, "te?t");
    }

    #[test]
    fn test_lexical_errors() {
        assert_eq!(lexical_error("a & b"), ("Two chars lexeme expected.".to_string(), 3));
        assert_eq!(
            lexical_error(":a"),
            ("Field mark ':' must follow field name.".to_string(), 1)
        );
        assert_eq!(lexical_error("ab\"c\"").1, 3);
        assert_eq!(lexical_error("rust~x").1, 6);
        assert_eq!(lexical_error("rust^1.2.3").1, 9);
        assert_eq!(lexical_error("\"open").1, 1);
        assert_eq!(lexical_error("rust\\").1, 6);
    }

    #[test]
    fn test_number_without_digits() {
        assert_eq!(
            lexical_error("rust^."),
            ("Wrong number syntax.".to_string(), 6)
        );
        assert_eq!(lexical_error("roam~. b").1, 6);
        assert!(Lexer::new("rust^.5").tokenize().is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = Lexer::new("a | b").tokenize().unwrap_err();
        assert_eq!(err.to_string(), "Two chars lexeme expected. Char position 3.");
    }
}
