//! Validation of document values against a vocabulary.

use crate::extras::parse_term_values;
use crate::store::VocabularyCatalog;
use crate::types::{VocabError, VocabResult};

impl VocabularyCatalog {
    /// Returns true if `name` is a term of the vocabulary.
    pub fn is_valid_term(&self, vocabulary: &str, name: &str) -> bool {
        self.term(vocabulary, name).is_ok()
    }

    /// Checks a raw document value (a bare name or a `{a,b}` array) against
    /// a vocabulary and returns the decoded names.
    ///
    /// # Errors
    /// Fails with `InvalidValue` if the value is malformed, the vocabulary
    /// doesn't exist, or any name is unknown. All unknown names are reported
    /// together.
    pub fn validate_terms(&self, vocabulary: &str, raw: &str) -> VocabResult<Vec<String>> {
        let vocabulary = self.vocabulary(vocabulary).map_err(|e| VocabError::InvalidValue {
            value: raw.to_string(),
            reason: e.to_string(),
        })?;
        let names = parse_term_values(raw)?;

        let unknown: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| self.term_in(vocabulary.id, name).is_err())
            .collect();
        if !unknown.is_empty() {
            return Err(VocabError::InvalidValue {
                value: raw.to_string(),
                reason: format!(
                    "unknown terms for vocabulary {}: {}",
                    vocabulary.name,
                    unknown.join(", ")
                ),
            });
        }

        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use vocab_types::{Labels, Properties};

    use super::*;

    fn catalog() -> VocabularyCatalog {
        let mut catalog = VocabularyCatalog::new();
        let regions = catalog.create_vocabulary("regions", true).unwrap();
        let datatype = catalog.create_vocabulary("datatype", false).unwrap();
        for name in ["150", "380"] {
            catalog
                .create_term(regions.id, name, Labels::new(), None, Properties::new())
                .unwrap();
        }
        catalog
            .create_term(datatype.id, "microdata", Labels::new(), None, Properties::new())
            .unwrap();
        catalog
    }

    #[test]
    fn test_valid_values() {
        let catalog = catalog();
        assert_eq!(catalog.validate_terms("datatype", "microdata").unwrap(), vec!["microdata"]);
        assert_eq!(catalog.validate_terms("regions", "{150,380}").unwrap(), vec!["150", "380"]);
        assert!(catalog.validate_terms("regions", "{}").unwrap().is_empty());
        assert!(catalog.is_valid_term("regions", "380"));
        assert!(!catalog.is_valid_term("datatype", "380"));
    }

    #[test]
    fn test_unknown_names_are_aggregated() {
        let catalog = catalog();
        let err = catalog.validate_terms("regions", "{150,999,microdata}").unwrap_err();
        match err {
            VocabError::InvalidValue { value, reason } => {
                assert_eq!(value, "{150,999,microdata}");
                assert!(reason.ends_with("999, microdata"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_vocabulary_and_malformed_value() {
        let catalog = catalog();
        assert!(matches!(
            catalog.validate_terms("agrovoc", "x"),
            Err(VocabError::InvalidValue { .. })
        ));
        assert!(matches!(
            catalog.validate_terms("regions", "{150"),
            Err(VocabError::InvalidValue { .. })
        ));
    }
}
