//! IPv6 literal protection around the lexer
//!
//! The lexer treats `:` as a field mark, which would cut an address like
//! `2a02:5180::1` into pieces. Before lexing, every colon inside an address
//! is swapped for [`PLACEHOLDER`]; afterwards lexemes that carry a protected
//! address get their original text back.

use crate::analysis::ipv6::ipv6_regex;

use super::lexer::Lexeme;

/// Private-use character, never part of an address or a query operator
pub const PLACEHOLDER: char = '\u{E000}';

/// Query text prepared for the lexer
#[derive(Debug, Clone)]
pub struct ProtectedQuery {
    text: String,
    literals: Vec<String>,
}

impl ProtectedQuery {
    /// Replace the colons of every address match in `query`
    pub fn protect(query: &str) -> Self {
        let mut text = String::with_capacity(query.len());
        let mut literals = Vec::new();
        let mut last = 0;

        for found in ipv6_regex().find_iter(query) {
            text.push_str(&query[last..found.start()]);
            text.extend(
                found
                    .as_str()
                    .chars()
                    .map(|ch| if ch == ':' { PLACEHOLDER } else { ch }),
            );
            literals.push(found.as_str().to_string());
            last = found.end();
        }
        text.push_str(&query[last..]);

        if !literals.is_empty() {
            tracing::trace!(?literals, "protected address literals");
        }

        Self { text, literals }
    }

    /// Text to feed the lexer
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn literals(&self) -> &[String] {
        &self.literals
    }

    /// Put the original text back on lexemes holding a protected address
    pub fn restore(&self, lexemes: &mut [Lexeme]) {
        if self.literals.is_empty() {
            return;
        }

        for lexeme in lexemes.iter_mut() {
            if !lexeme.text.contains(PLACEHOLDER) {
                continue;
            }
            let restored = lexeme.text.replace(PLACEHOLDER, ":");
            if self
                .literals
                .iter()
                .any(|literal| restored.contains(literal.as_str()))
            {
                lexeme.text = restored;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::query_string::lexer::{LexemeKind, Lexer};

    fn lex(query: &str) -> Vec<Lexeme> {
        let protected = ProtectedQuery::protect(query);
        let mut lexemes = Lexer::new(protected.text()).tokenize().unwrap();
        protected.restore(&mut lexemes);
        lexemes
    }

    #[test]
    fn test_plain_query_untouched() {
        let protected = ProtectedQuery::protect("title:rust AND body:cargo");
        assert_eq!(protected.text(), "title:rust AND body:cargo");
        assert!(protected.literals().is_empty());
    }

    #[test]
    fn test_address_survives_lexing() {
        let lexemes = lex("ip:2a02:5180::1/64");
        assert_eq!(lexemes.len(), 2);
        assert_eq!(lexemes[0].kind, LexemeKind::Field);
        assert_eq!(lexemes[0].text, "ip");
        assert_eq!(lexemes[1].kind, LexemeKind::Word);
        assert_eq!(lexemes[1].text, "2a02:5180::1/64");
        assert_eq!(lexemes[1].position, 4);
    }

    #[test]
    fn test_range_of_addresses() {
        let lexemes = lex("ip:[2a02:5180:0:2669:0:0:0:0 TO 2a02:5180:0:2669:ffff:ffff:ffff:ffff]");
        let words: Vec<&str> = lexemes
            .iter()
            .filter(|lexeme| lexeme.kind == LexemeKind::Word)
            .map(|lexeme| lexeme.text.as_str())
            .collect();
        assert_eq!(
            words,
            vec!["2a02:5180:0:2669:0:0:0:0", "2a02:5180:0:2669:ffff:ffff:ffff:ffff"]
        );
    }

    #[test]
    fn test_duplicate_literals_each_restored() {
        let lexemes = lex("fe80::1 OR fe80::1");
        assert_eq!(lexemes[0].text, "fe80::1");
        assert_eq!(lexemes[2].text, "fe80::1");
    }
}
