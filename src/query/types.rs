//! Core types for the query system

use serde::{Deserialize, Serialize};

/// How a clause participates in a boolean combination
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occur {
    /// Must match (`+`)
    Required,
    /// May match, contributes to score
    #[default]
    Optional,
    /// Must not match (`-`)
    Prohibited,
}

impl Occur {
    /// Sign prefix in canonical query strings
    pub fn prefix(&self) -> &'static str {
        match self {
            Occur::Required => "+",
            Occur::Optional => "",
            Occur::Prohibited => "-",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Occur::Required)
    }

    pub fn is_prohibited(&self) -> bool {
        matches!(self, Occur::Prohibited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes() {
        assert_eq!(Occur::Required.prefix(), "+");
        assert_eq!(Occur::Optional.prefix(), "");
        assert_eq!(Occur::Prohibited.prefix(), "-");
        assert_eq!(Occur::default(), Occur::Optional);
    }
}
