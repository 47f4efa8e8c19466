//! # vocab-types
//!
//! Type definitions for hierarchical, multilingual controlled vocabularies.
//!
//! A [`Vocabulary`] is a named collection of [`Term`]s. Terms may be arranged
//! in a tree when the owning vocabulary allows relations, carry free-form
//! string properties, and have at most one display [`Label`] per language.
//!
//! ## Features
//!
//! - `serde` (default): Enables serialization/deserialization support via serde.
//!
//! ## Usage
//!
//! ```rust
//! use vocab_types::{Term, Vocabulary};
//!
//! let regions = Vocabulary::new(1, "m49_regions", true);
//! let europe = Term::root(10, regions.id, "150");
//! let italy = Term::child_of(11, &europe, "380");
//!
//! assert_eq!(italy.depth, 1);
//! assert_eq!(italy.path, "150/380");
//! ```

#![warn(missing_docs)]

mod ids;
mod label;
mod term;
mod vocabulary;
pub mod well_known;

pub use ids::{TermId, VocabularyId};
pub use label::Label;
pub use term::{Labels, Properties, Term, PATH_SEPARATOR};
pub use vocabulary::Vocabulary;
