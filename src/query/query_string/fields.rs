//! Field authorization and renaming

use std::collections::HashMap;

use crate::config::QueryParserConfig;
use crate::error::{QueryError, Result};

/// Allow-list and mapping applied to every field named in a query
#[derive(Debug, Clone, Default)]
pub struct FieldPolicy {
    allowed: Vec<String>,
    private: Vec<String>,
    mapping: HashMap<String, String>,
}

impl FieldPolicy {
    pub fn from_config(config: &QueryParserConfig) -> Self {
        Self {
            allowed: config.allowed_fields.clone(),
            private: config.private_fields.clone(),
            mapping: config.field_mapping.clone(),
        }
    }

    /// Reject a field outside a non-empty allow-list
    ///
    /// A missing or empty field is always accepted; private fields are
    /// left out of the error message.
    pub fn validate_field(&self, field: Option<&str>) -> Result<()> {
        let Some(field) = field.filter(|field| !field.is_empty()) else {
            return Ok(());
        };

        if self.allowed.is_empty() || self.allowed.iter().any(|allowed| allowed == field) {
            return Ok(());
        }

        Err(QueryError::Unauthorized {
            field: field.to_string(),
            allowed: self
                .allowed
                .iter()
                .filter(|allowed| !self.private.contains(allowed))
                .cloned()
                .collect(),
        })
    }

    /// Index name of a query field, the field itself when unmapped
    pub fn map_field_name(&self, field: Option<String>) -> Option<String> {
        field.map(|field| self.mapping.get(&field).cloned().unwrap_or(field))
    }

    /// Validate, then map
    pub fn resolve(&self, field: Option<String>) -> Result<Option<String>> {
        self.validate_field(field.as_deref())?;
        Ok(self.map_field_name(field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FieldPolicy {
        FieldPolicy::from_config(
            &QueryParserConfig::default()
                .with_allowed_fields(["title", "body", "acl"])
                .with_private_fields(["acl"])
                .with_field_mapping("body", "contents"),
        )
    }

    #[test]
    fn test_validate_field() {
        let policy = policy();
        assert!(policy.validate_field(Some("title")).is_ok());
        assert!(policy.validate_field(Some("acl")).is_ok());
        assert!(policy.validate_field(None).is_ok());
        assert!(policy.validate_field(Some("")).is_ok());

        let err = policy.validate_field(Some("secret")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field secret is not authorized. Authorized fields are: title, body."
        );
    }

    #[test]
    fn test_empty_allow_list_accepts_all() {
        let policy = FieldPolicy::default();
        assert!(policy.validate_field(Some("anything")).is_ok());
    }

    #[test]
    fn test_map_field_name() {
        let policy = policy();
        assert_eq!(
            policy.map_field_name(Some("body".to_string())),
            Some("contents".to_string())
        );
        assert_eq!(
            policy.map_field_name(Some("title".to_string())),
            Some("title".to_string())
        );
        assert_eq!(policy.map_field_name(None), None);
        assert_eq!(
            policy.resolve(Some("body".to_string())).unwrap(),
            Some("contents".to_string())
        );
    }
}
