//! Well-known vocabulary names and document-extras conventions.
//!
//! # Examples
//!
//! ```
//! use vocab_types::well_known;
//!
//! assert_eq!(well_known::usage_key(well_known::DATATYPE), "fao_datatype");
//! assert_eq!(well_known::EMPTY_TERM_ARRAY, "{}");
//! ```

// =============================================================================
// Vocabularies
// =============================================================================

/// Flat vocabulary of dataset types (`microdata`, `other`, ...).
pub const DATATYPE: &str = "datatype";

/// Hierarchical vocabulary of M49 regions and countries.
pub const M49_REGIONS: &str = "m49_regions";

/// Flat vocabulary of AGROVOC subject terms.
pub const AGROVOC: &str = "agrovoc";

// =============================================================================
// Document extras
// =============================================================================

/// Prefix of the document extra key holding vocabulary membership.
pub const USAGE_KEY_PREFIX: &str = "fao_";

/// Document state that counts towards usage.
pub const ACTIVE_STATE: &str = "active";

/// Encoding of an empty multi-valued membership.
pub const EMPTY_TERM_ARRAY: &str = "{}";

/// Returns the document extra key for a vocabulary (`fao_<name>`).
pub fn usage_key(vocabulary_name: &str) -> String {
    format!("{}{}", USAGE_KEY_PREFIX, vocabulary_name)
}

/// Returns the facet key for labels at `depth` in `lang`
/// (`fao_<name>_l<depth>_<lang>`).
pub fn ancestry_facet_key(vocabulary_name: &str, depth: u32, lang: &str) -> String {
    format!("{}_l{}_{}", usage_key(vocabulary_name), depth, lang)
}
