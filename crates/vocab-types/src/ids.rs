//! Store-assigned identifiers.

/// Identifier of a vocabulary, assigned by the store on creation.
pub type VocabularyId = u64;

/// Identifier of a term, assigned by the store on creation.
///
/// Ids are never reused within a store, even after a vocabulary is cleared.
pub type TermId = u64;
