//! Vocabulary type.

use crate::VocabularyId;

/// A named collection of controlled terms.
///
/// The name is unique within a store and compared case-sensitively.
/// `has_relations` decides whether terms of this vocabulary may have a parent.
///
/// # Examples
///
/// ```
/// use vocab_types::Vocabulary;
///
/// let datatype = Vocabulary::new(1, "datatype", false);
/// assert!(datatype.is_flat());
/// assert_eq!(datatype.usage_key(), "fao_datatype");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vocabulary {
    /// Store-assigned identifier.
    pub id: VocabularyId,
    /// Unique, case-sensitive name.
    pub name: String,
    /// Whether terms in this vocabulary may reference a parent term.
    pub has_relations: bool,
}

impl Vocabulary {
    /// Creates a vocabulary value.
    pub fn new(id: VocabularyId, name: impl Into<String>, has_relations: bool) -> Self {
        Self {
            id,
            name: name.into(),
            has_relations,
        }
    }

    /// Returns true if terms of this vocabulary can't have parents.
    pub fn is_flat(&self) -> bool {
        !self.has_relations
    }

    /// Key under which documents record membership in this vocabulary.
    pub fn usage_key(&self) -> String {
        crate::well_known::usage_key(&self.name)
    }
}
