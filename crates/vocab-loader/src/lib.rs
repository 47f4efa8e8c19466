//! # vocab-loader
//!
//! Store, tabular loader and queries for multilingual controlled vocabularies.
//!
//! - [`VocabularyStore`] is the store handle. Reads see a committed
//!   [`VocabularyCatalog`]; writes run as all-or-nothing transactions.
//! - [`VocabularyStore::load_vocabulary`] replaces a vocabulary's content from
//!   a CSV table whose header declares `term`, `parent`, `lang:<code>` and
//!   `property:<key>` columns. Children may precede their parents.
//! - The query layer searches labels, lists terms with usage counts taken from
//!   a [`DocumentSource`], ranks ancestors and builds localized facets.
//!
//! ## Usage
//!
//! ```rust
//! use vocab_loader::{LoadConfig, VocabularyStore};
//!
//! let store = VocabularyStore::new();
//! let table = "parent,term,lang:en\n,EU,Europe\nEU,031,Italy\n";
//! store
//!     .load_vocabulary("regions", table.as_bytes(), &LoadConfig::hierarchical())
//!     .unwrap();
//!
//! let page = store
//!     .read(|catalog| catalog.search("regions", "en", "ita", 0, 10))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(page.results[0].name, "031");
//! ```

#![warn(missing_docs)]

mod extras;
mod loader;
mod parser;
mod query;
mod store;
mod types;
mod validate;

pub use extras::{
    format_term_values, parse_term_values, DocumentExtra, DocumentExtras, DocumentSource,
    UsageIndex,
};
pub use parser::{
    ColumnRole, TableLayout, TableReader, TableRow, LANG_PREFIX, PARENT_COLUMN, PROPERTY_PREFIX,
    TERM_COLUMN,
};
pub use query::{
    AncestorRank, ListOptions, MatchStrength, SearchHit, SearchPage, TermFilter, TermListing,
    TermMatch, TermOrder,
};
pub use store::{StoreSnapshot, VocabularyCatalog, VocabularyStore};
pub use types::{LoadConfig, LoadStats, VocabError, VocabResult};

// Re-export vocab-types for convenience
pub use vocab_types;
