//! Token filters applied after word splitting

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fmt;
use stop_words::{get, LANGUAGE};
use tracing::warn;

use super::analyzer::Token;

/// A step in the analyzer filter chain
///
/// Returning `None` removes the token; its position increment is carried
/// over to the next surviving token by the analyzer.
pub trait TokenFilter: Send + Sync + fmt::Debug {
    fn filter(&self, token: Token) -> Option<Token>;
}

#[derive(Debug, Default)]
pub struct LowerCaseFilter;

impl TokenFilter for LowerCaseFilter {
    fn filter(&self, mut token: Token) -> Option<Token> {
        token.text = token.text.to_lowercase();
        Some(token)
    }
}

/// Drops words from a stop list
#[derive(Debug, Default)]
pub struct StopWordsFilter {
    stopwords: HashSet<String>,
}

impl StopWordsFilter {
    /// Stop list for a language plus extra words
    pub fn for_language(language: &str, extra: &[String]) -> Self {
        let mut stopwords: HashSet<String> = match stop_language(language) {
            Some(lang) => get(lang).into_iter().map(|s| s.to_lowercase()).collect(),
            None => {
                warn!(language, "no stop word list for language");
                HashSet::new()
            }
        };
        stopwords.extend(extra.iter().map(|s| s.to_lowercase()));

        Self { stopwords }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stopwords: words.into_iter().map(Into::into).collect(),
        }
    }
}

impl TokenFilter for StopWordsFilter {
    fn filter(&self, token: Token) -> Option<Token> {
        if self.stopwords.contains(&token.text.to_lowercase()) {
            None
        } else {
            Some(token)
        }
    }
}

/// Keeps tokens whose character count lies within bounds
#[derive(Debug)]
pub struct LengthFilter {
    min: usize,
    max: usize,
}

impl LengthFilter {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

impl TokenFilter for LengthFilter {
    fn filter(&self, token: Token) -> Option<Token> {
        let len = token.text.chars().count();
        (len >= self.min && len <= self.max).then_some(token)
    }
}

pub struct StemmerFilter {
    stemmer: Stemmer,
    language: String,
}

impl StemmerFilter {
    /// `None` when the language has no Snowball stemmer
    pub fn for_language(language: &str) -> Option<Self> {
        let algorithm = stem_algorithm(language);
        if algorithm.is_none() {
            warn!(language, "no stemmer for language");
        }
        algorithm.map(|algorithm| Self {
            stemmer: Stemmer::create(algorithm),
            language: language.to_string(),
        })
    }
}

impl fmt::Debug for StemmerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StemmerFilter")
            .field("language", &self.language)
            .finish()
    }
}

impl TokenFilter for StemmerFilter {
    fn filter(&self, mut token: Token) -> Option<Token> {
        token.text = self.stemmer.stem(&token.text).to_string();
        Some(token)
    }
}

fn stem_algorithm(language: &str) -> Option<Algorithm> {
    match language.to_ascii_lowercase().as_str() {
        "english" | "en" => Some(Algorithm::English),
        "french" | "fr" => Some(Algorithm::French),
        "german" | "de" => Some(Algorithm::German),
        "spanish" | "es" => Some(Algorithm::Spanish),
        "italian" | "it" => Some(Algorithm::Italian),
        "portuguese" | "pt" => Some(Algorithm::Portuguese),
        "dutch" | "nl" => Some(Algorithm::Dutch),
        "russian" | "ru" => Some(Algorithm::Russian),
        _ => None,
    }
}

fn stop_language(language: &str) -> Option<LANGUAGE> {
    match language.to_ascii_lowercase().as_str() {
        "english" | "en" => Some(LANGUAGE::English),
        "french" | "fr" => Some(LANGUAGE::French),
        "german" | "de" => Some(LANGUAGE::German),
        "spanish" | "es" => Some(LANGUAGE::Spanish),
        "italian" | "it" => Some(LANGUAGE::Italian),
        "portuguese" | "pt" => Some(LANGUAGE::Portuguese),
        "dutch" | "nl" => Some(LANGUAGE::Dutch),
        "russian" | "ru" => Some(LANGUAGE::Russian),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str) -> Token {
        Token::new(text, 0, text.len())
    }

    #[test]
    fn test_lowercase() {
        let t = LowerCaseFilter.filter(token("Rust")).unwrap();
        assert_eq!(t.text, "rust");
    }

    #[test]
    fn test_stop_words() {
        let filter = StopWordsFilter::for_language("english", &["foo".to_string()]);
        assert!(filter.filter(token("the")).is_none());
        assert!(filter.filter(token("Foo")).is_none());
        assert!(filter.filter(token("rust")).is_some());
    }

    #[test]
    fn test_length_bounds() {
        let filter = LengthFilter::new(2, 4);
        assert!(filter.filter(token("a")).is_none());
        assert!(filter.filter(token("ab")).is_some());
        assert!(filter.filter(token("abcde")).is_none());
    }

    #[test]
    fn test_stemmer() {
        let filter = StemmerFilter::for_language("english").unwrap();
        assert_eq!(filter.filter(token("running")).unwrap().text, "run");
        assert!(StemmerFilter::for_language("klingon").is_none());
    }
}
