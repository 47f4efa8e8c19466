//! Term type and its derived tree position.

use std::collections::BTreeMap;

use crate::{TermId, VocabularyId};

/// Separator between names in a term's materialized path.
pub const PATH_SEPARATOR: char = '/';

/// Free-form string properties of a term (e.g. ISO codes).
///
/// A missing key means "not set"; values are never defaulted.
pub type Properties = BTreeMap<String, String>;

/// Display labels keyed by language code, as supplied on create/update.
pub type Labels = BTreeMap<String, String>;

/// A single controlled value within a vocabulary.
///
/// `depth` and `path` are derived from the parent chain and are recomputed
/// whenever the term is placed under a (new) parent.
///
/// # Examples
///
/// ```
/// use vocab_types::Term;
///
/// let eu = Term::root(1, 3, "EU");
/// let it = Term::child_of(2, &eu, "031");
///
/// assert!(eu.is_top_level());
/// assert_eq!(it.parent_id, Some(1));
/// assert_eq!(it.depth, 1);
/// assert_eq!(it.path, "EU/031");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Term {
    /// Store-assigned identifier.
    pub id: TermId,
    /// Owning vocabulary.
    pub vocabulary_id: VocabularyId,
    /// Canonical name, unique across the whole store.
    pub name: String,
    /// Parent term, only set in vocabularies with relations.
    pub parent_id: Option<TermId>,
    /// Number of ancestors (0 for top-level terms).
    pub depth: u32,
    /// Names from the root down to this term, joined by [`PATH_SEPARATOR`].
    pub path: String,
    /// Custom properties.
    #[cfg_attr(feature = "serde", serde(default))]
    pub properties: Properties,
}

impl Term {
    /// Creates a top-level term.
    pub fn root(id: TermId, vocabulary_id: VocabularyId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            vocabulary_id,
            path: name.clone(),
            name,
            parent_id: None,
            depth: 0,
            properties: Properties::new(),
        }
    }

    /// Creates a term placed directly under `parent`, in the parent's vocabulary.
    pub fn child_of(id: TermId, parent: &Term, name: impl Into<String>) -> Self {
        let mut term = Self::root(id, parent.vocabulary_id, name);
        term.place_under(Some(parent));
        term
    }

    /// Re-links this term and recomputes `depth` and `path` from `parent`.
    ///
    /// Only this term is touched; descendants keep their previous path.
    pub fn place_under(&mut self, parent: Option<&Term>) {
        match parent {
            Some(parent) => {
                self.parent_id = Some(parent.id);
                self.depth = parent.depth + 1;
                self.path = format!("{}{}{}", parent.path, PATH_SEPARATOR, self.name);
            }
            None => {
                self.parent_id = None;
                self.depth = 0;
                self.path = self.name.clone();
            }
        }
    }

    /// Returns true if the term has no parent.
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Gets a custom property value.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
