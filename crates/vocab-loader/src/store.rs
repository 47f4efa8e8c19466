//! Vocabulary store.
//!
//! [`VocabularyCatalog`] holds vocabularies, terms and labels together with
//! the lookup indexes the registry, term store and queries need.
//! [`VocabularyStore`] is the shared handle around a catalog: reads see the
//! last committed catalog, writes run inside [`VocabularyStore::transaction`]
//! on a private copy that is published only on success.
//!
//! ```ignore
//! let store = VocabularyStore::new();
//! store.transaction(|catalog| {
//!     let regions = catalog.create_vocabulary("m49_regions", true)?;
//!     let europe = catalog.create_term(regions.id, "150", Labels::new(), None, Properties::new())?;
//!     catalog.create_term(regions.id, "380", Labels::new(), Some(europe.id), Properties::new())?;
//!     Ok(())
//! })?;
//!
//! let path = store.read(|catalog| catalog.term("m49_regions", "380").map(|t| t.path.clone()))??;
//! assert_eq!(path, "150/380");
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use vocab_types::{Label, Labels, Properties, Term, TermId, Vocabulary, VocabularyId};

use crate::types::{VocabError, VocabResult};

/// In-memory tables for vocabularies, terms and labels.
#[derive(Clone, Default)]
pub struct VocabularyCatalog {
    /// Vocabularies indexed by id.
    vocabularies: BTreeMap<VocabularyId, Vocabulary>,
    /// Vocabulary ids indexed by name.
    vocabulary_ids_by_name: HashMap<String, VocabularyId>,
    /// Terms indexed by id.
    terms: HashMap<TermId, Term>,
    /// Term ids indexed by name (names are unique across vocabularies).
    term_ids_by_name: HashMap<String, TermId>,
    /// Term ids owned by each vocabulary.
    terms_by_vocabulary: HashMap<VocabularyId, BTreeSet<TermId>>,
    /// Direct children of each parent term.
    children_by_parent: HashMap<TermId, BTreeSet<TermId>>,
    /// Labels of each term, keyed by language.
    labels_by_term: HashMap<TermId, BTreeMap<String, Label>>,
    next_vocabulary_id: VocabularyId,
    next_term_id: TermId,
}

impl std::fmt::Debug for VocabularyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VocabularyCatalog")
            .field("vocabularies", &self.vocabularies.len())
            .field("terms", &self.terms.len())
            .field("children_by_parent", &self.children_by_parent.len())
            .field("labels", &self.label_count())
            .finish()
    }
}

impl VocabularyCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VOCABULARY REGISTRY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Creates a vocabulary.
    ///
    /// # Errors
    /// Fails with `VocabularyAlreadyExists` if the name is taken.
    pub fn create_vocabulary(&mut self, name: &str, has_relations: bool) -> VocabResult<Vocabulary> {
        if name.is_empty() {
            return Err(VocabError::InvalidValue {
                value: name.to_string(),
                reason: "vocabulary name must not be empty".to_string(),
            });
        }
        if self.vocabulary_ids_by_name.contains_key(name) {
            return Err(VocabError::VocabularyAlreadyExists {
                name: name.to_string(),
            });
        }

        self.next_vocabulary_id += 1;
        let vocabulary = Vocabulary::new(self.next_vocabulary_id, name, has_relations);
        self.vocabulary_ids_by_name
            .insert(vocabulary.name.clone(), vocabulary.id);
        self.vocabularies.insert(vocabulary.id, vocabulary.clone());
        Ok(vocabulary)
    }

    /// Gets a vocabulary by name.
    pub fn vocabulary(&self, name: &str) -> VocabResult<&Vocabulary> {
        self.vocabulary_ids_by_name
            .get(name)
            .and_then(|id| self.vocabularies.get(id))
            .ok_or_else(|| VocabError::VocabularyNotFound {
                name: name.to_string(),
            })
    }

    /// Gets a vocabulary by id.
    pub fn vocabulary_by_id(&self, id: VocabularyId) -> VocabResult<&Vocabulary> {
        self.vocabularies.get(&id).ok_or(VocabError::UnknownId {
            entity: "vocabulary",
            id,
        })
    }

    /// Lists all vocabularies ordered by name.
    pub fn vocabularies(&self) -> Vec<&Vocabulary> {
        let mut all: Vec<&Vocabulary> = self.vocabularies.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Deletes all labels of all terms in the vocabulary, then the terms.
    pub fn clear_vocabulary(&mut self, vocabulary_id: VocabularyId) -> VocabResult<()> {
        let name = self.vocabulary_by_id(vocabulary_id)?.name.clone();
        let term_ids = self
            .terms_by_vocabulary
            .remove(&vocabulary_id)
            .unwrap_or_default();

        for id in &term_ids {
            self.labels_by_term.remove(id);
        }
        for id in &term_ids {
            if let Some(term) = self.terms.remove(id) {
                self.term_ids_by_name.remove(&term.name);
            }
            self.children_by_parent.remove(id);
        }

        tracing::debug!(vocabulary = %name, terms = term_ids.len(), "cleared vocabulary");
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TERM STORE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Gets a term by name, scoped by vocabulary name.
    pub fn term(&self, vocabulary_name: &str, name: &str) -> VocabResult<&Term> {
        let vocabulary = self.vocabulary(vocabulary_name)?;
        self.term_in(vocabulary.id, name)
    }

    /// Gets a term by name, scoped by vocabulary id.
    pub fn term_in(&self, vocabulary_id: VocabularyId, name: &str) -> VocabResult<&Term> {
        self.term_ids_by_name
            .get(name)
            .and_then(|id| self.terms.get(id))
            .filter(|term| term.vocabulary_id == vocabulary_id)
            .ok_or_else(|| VocabError::TermNotFound {
                vocabulary: self
                    .vocabularies
                    .get(&vocabulary_id)
                    .map(|v| v.name.clone())
                    .unwrap_or_else(|| format!("#{}", vocabulary_id)),
                name: name.to_string(),
            })
    }

    /// Gets a term by id.
    pub fn term_by_id(&self, id: TermId) -> Option<&Term> {
        self.terms.get(&id)
    }

    /// Returns true if a term with this name exists in any vocabulary.
    pub fn has_term_named(&self, name: &str) -> bool {
        self.term_ids_by_name.contains_key(name)
    }

    /// Iterates over the terms of a vocabulary in creation order.
    pub fn terms(&self, vocabulary_id: VocabularyId) -> impl Iterator<Item = &Term> {
        self.terms_by_vocabulary
            .get(&vocabulary_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.terms.get(id))
    }

    /// Creates a term, computing depth and path from `parent`.
    ///
    /// # Errors
    /// Fails with `TermAlreadyExists` if the name is used in any vocabulary,
    /// and with `InvalidParent` if the parent belongs to another vocabulary
    /// or the vocabulary has no relations.
    pub fn create_term(
        &mut self,
        vocabulary_id: VocabularyId,
        name: &str,
        labels: Labels,
        parent: Option<TermId>,
        properties: Properties,
    ) -> VocabResult<Term> {
        let vocabulary = self.vocabulary_by_id(vocabulary_id)?.clone();
        if name.is_empty() {
            return Err(VocabError::InvalidValue {
                value: name.to_string(),
                reason: "term name must not be empty".to_string(),
            });
        }
        if let Some(existing) = self.term_ids_by_name.get(name).and_then(|id| self.terms.get(id)) {
            return Err(VocabError::TermAlreadyExists {
                name: name.to_string(),
                vocabulary: self
                    .vocabularies
                    .get(&existing.vocabulary_id)
                    .map(|v| v.name.clone())
                    .unwrap_or_default(),
            });
        }
        let parent = self.checked_parent(&vocabulary, name, parent, None)?;

        self.next_term_id += 1;
        let mut term = Term::root(self.next_term_id, vocabulary.id, name);
        term.place_under(parent.as_ref());
        term.properties = properties;

        if let Some(parent_id) = term.parent_id {
            self.children_by_parent
                .entry(parent_id)
                .or_default()
                .insert(term.id);
        }
        self.term_ids_by_name.insert(term.name.clone(), term.id);
        self.terms_by_vocabulary
            .entry(vocabulary.id)
            .or_default()
            .insert(term.id);
        self.terms.insert(term.id, term.clone());
        self.set_labels(term.id, labels);

        Ok(term)
    }

    /// Replaces a term's labels and properties and re-links its parent.
    ///
    /// Depth and path are recomputed for this term only; descendants keep
    /// their previous path until they are updated themselves.
    ///
    /// # Errors
    /// Fails with `InvalidParent` for the same reasons as [`create_term`],
    /// and when the new parent is the term itself or one of its descendants.
    ///
    /// [`create_term`]: Self::create_term
    pub fn update_term(
        &mut self,
        term_id: TermId,
        labels: Labels,
        parent: Option<TermId>,
        properties: Properties,
    ) -> VocabResult<Term> {
        let mut term = self
            .terms
            .get(&term_id)
            .cloned()
            .ok_or(VocabError::UnknownId {
                entity: "term",
                id: term_id,
            })?;
        let vocabulary = self.vocabulary_by_id(term.vocabulary_id)?.clone();
        let parent = self.checked_parent(&vocabulary, &term.name, parent, Some(term_id))?;

        if let Some(old_parent) = term.parent_id {
            if let Some(siblings) = self.children_by_parent.get_mut(&old_parent) {
                siblings.remove(&term_id);
            }
        }
        term.place_under(parent.as_ref());
        if let Some(new_parent) = term.parent_id {
            self.children_by_parent
                .entry(new_parent)
                .or_default()
                .insert(term_id);
        }
        term.properties = properties;

        self.terms.insert(term_id, term.clone());
        self.labels_by_term.remove(&term_id);
        self.set_labels(term_id, labels);

        Ok(term)
    }

    /// Validates a parent reference and returns a copy of the parent term.
    fn checked_parent(
        &self,
        vocabulary: &Vocabulary,
        term_name: &str,
        parent: Option<TermId>,
        updating: Option<TermId>,
    ) -> VocabResult<Option<Term>> {
        let Some(parent_id) = parent else {
            return Ok(None);
        };
        let invalid = |reason: String| VocabError::InvalidParent {
            term: term_name.to_string(),
            reason,
        };

        if !vocabulary.has_relations {
            return Err(invalid(format!(
                "vocabulary {} doesn't support relations",
                vocabulary.name
            )));
        }
        let parent = self
            .terms
            .get(&parent_id)
            .ok_or_else(|| invalid(format!("unknown parent id {}", parent_id)))?;
        if parent.vocabulary_id != vocabulary.id {
            return Err(invalid(format!(
                "parent {} belongs to another vocabulary",
                parent.name
            )));
        }
        if let Some(term_id) = updating {
            if parent_id == term_id || self.ancestors(parent_id).iter().any(|a| a.id == term_id) {
                return Err(invalid(format!(
                    "parent {} would make the term its own ancestor",
                    parent.name
                )));
            }
        }

        Ok(Some(parent.clone()))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LABEL STORE
    // ═══════════════════════════════════════════════════════════════════════════

    fn set_labels(&mut self, term_id: TermId, labels: Labels) {
        if labels.is_empty() {
            return;
        }
        let entry = self.labels_by_term.entry(term_id).or_default();
        for (lang, text) in labels {
            entry.insert(lang.clone(), Label::new(term_id, lang, text));
        }
    }

    /// Gets the label of a term in exactly this language.
    pub fn label_for(&self, term_id: TermId, lang: &str) -> Option<&Label> {
        self.labels_by_term.get(&term_id)?.get(lang)
    }

    /// Iterates over all labels of a term, ordered by language.
    pub fn labels(&self, term_id: TermId) -> impl Iterator<Item = &Label> {
        self.labels_by_term
            .get(&term_id)
            .into_iter()
            .flat_map(|labels| labels.values())
    }

    /// Returns the label in `lang`, or the term's name when there is none.
    pub fn label_or_name<'a>(&'a self, term: &'a Term, lang: &str) -> &'a str {
        self.label_for(term.id, lang)
            .map(|l| l.label.as_str())
            .unwrap_or(term.name.as_str())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HIERARCHY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Gets the direct children of a term.
    pub fn children(&self, term_id: TermId) -> impl Iterator<Item = &Term> {
        self.children_by_parent
            .get(&term_id)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.terms.get(id))
    }

    /// Gets the ancestors of a term, nearest first.
    pub fn ancestors(&self, term_id: TermId) -> Vec<&Term> {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.terms.get(&term_id).and_then(|t| t.parent_id);

        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            match self.terms.get(&id) {
                Some(parent) => {
                    ancestors.push(parent);
                    current = parent.parent_id;
                }
                None => break,
            }
        }

        ancestors
    }

    // Statistics

    /// Returns the number of vocabularies.
    pub fn vocabulary_count(&self) -> usize {
        self.vocabularies.len()
    }

    /// Returns the number of terms across all vocabularies.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Returns the number of labels across all terms.
    pub fn label_count(&self) -> usize {
        self.labels_by_term.values().map(|l| l.len()).sum()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SNAPSHOTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Captures the catalog as a serializable snapshot.
    pub fn to_snapshot(&self) -> StoreSnapshot {
        let mut terms: Vec<Term> = self.terms.values().cloned().collect();
        terms.sort_by_key(|t| t.id);

        let mut labels: Vec<Label> = Vec::with_capacity(self.label_count());
        for term in &terms {
            labels.extend(self.labels(term.id).cloned());
        }

        StoreSnapshot {
            vocabularies: self.vocabularies.values().cloned().collect(),
            terms,
            labels,
            next_vocabulary_id: self.next_vocabulary_id,
            next_term_id: self.next_term_id,
        }
    }

    /// Rebuilds a catalog and its indexes from a snapshot.
    ///
    /// # Errors
    /// Fails with `InvalidValue` when a name is repeated, when a term or label
    /// references a missing owner, or when a parent lies outside the term's
    /// vocabulary.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> VocabResult<Self> {
        let mut catalog = Self {
            next_vocabulary_id: snapshot.next_vocabulary_id,
            next_term_id: snapshot.next_term_id,
            ..Self::default()
        };

        for vocabulary in snapshot.vocabularies {
            catalog.next_vocabulary_id = catalog.next_vocabulary_id.max(vocabulary.id);
            if catalog.vocabularies.contains_key(&vocabulary.id) {
                return Err(corrupt(&vocabulary.name, "vocabulary id is repeated"));
            }
            if catalog
                .vocabulary_ids_by_name
                .insert(vocabulary.name.clone(), vocabulary.id)
                .is_some()
            {
                return Err(corrupt(&vocabulary.name, "vocabulary name is repeated"));
            }
            catalog.vocabularies.insert(vocabulary.id, vocabulary);
        }

        for term in snapshot.terms {
            if !catalog.vocabularies.contains_key(&term.vocabulary_id) {
                return Err(dangling("term", &term.name));
            }
            catalog.next_term_id = catalog.next_term_id.max(term.id);
            if let Some(parent_id) = term.parent_id {
                catalog
                    .children_by_parent
                    .entry(parent_id)
                    .or_default()
                    .insert(term.id);
            }
            if catalog.term_ids_by_name.insert(term.name.clone(), term.id).is_some() {
                return Err(corrupt(&term.name, "term name is repeated"));
            }
            catalog
                .terms_by_vocabulary
                .entry(term.vocabulary_id)
                .or_default()
                .insert(term.id);
            if let Some(previous) = catalog.terms.insert(term.id, term) {
                return Err(corrupt(&previous.name, "term id is repeated"));
            }
        }

        for term in catalog.terms.values() {
            let Some(parent_id) = term.parent_id else {
                continue;
            };
            match catalog.terms.get(&parent_id) {
                None => return Err(dangling("parent", &term.name)),
                Some(parent) if parent.vocabulary_id != term.vocabulary_id => {
                    return Err(corrupt(&term.name, "parent belongs to another vocabulary"));
                }
                Some(_) => {}
            }
        }

        for label in snapshot.labels {
            if !catalog.terms.contains_key(&label.term_id) {
                return Err(dangling("label", &label.label));
            }
            catalog
                .labels_by_term
                .entry(label.term_id)
                .or_default()
                .insert(label.lang.clone(), label);
        }

        Ok(catalog)
    }
}

fn dangling(entity: &str, value: &str) -> VocabError {
    corrupt(value, &format!("{} references a missing owner", entity))
}

fn corrupt(value: &str, reason: &str) -> VocabError {
    VocabError::InvalidValue {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Serializable image of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// All vocabularies.
    pub vocabularies: Vec<Vocabulary>,
    /// All terms, ordered by id.
    pub terms: Vec<Term>,
    /// All labels, grouped by term.
    pub labels: Vec<Label>,
    /// Last vocabulary id handed out.
    #[serde(default)]
    pub next_vocabulary_id: VocabularyId,
    /// Last term id handed out.
    #[serde(default)]
    pub next_term_id: TermId,
}

/// Shared handle to a vocabulary catalog.
///
/// Readers always observe a fully committed catalog. Writers are serialized
/// and work on a private copy, so a failing transaction leaves no trace.
#[derive(Debug, Default)]
pub struct VocabularyStore {
    catalog: RwLock<VocabularyCatalog>,
    writer: Mutex<()>,
}

impl VocabularyStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing catalog.
    pub fn from_catalog(catalog: VocabularyCatalog) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            writer: Mutex::new(()),
        }
    }

    /// Opens a store from a JSON snapshot file.
    pub fn open<P: AsRef<Path>>(path: P) -> VocabResult<Self> {
        let file = File::open(path.as_ref())?;
        let snapshot: StoreSnapshot = serde_json::from_reader(BufReader::new(file))?;
        let catalog = VocabularyCatalog::from_snapshot(snapshot)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            vocabularies = catalog.vocabulary_count(),
            terms = catalog.term_count(),
            "opened vocabulary store"
        );
        Ok(Self::from_catalog(catalog))
    }

    /// Writes the committed catalog to a JSON snapshot file.
    ///
    /// The snapshot is written next to `path` and renamed into place.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> VocabResult<()> {
        let path = path.as_ref();
        let snapshot = self.read(VocabularyCatalog::to_snapshot)?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        let mut writer = BufWriter::new(File::create(tmp_path)?);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;
        drop(writer);
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Runs a read-only closure against the committed catalog.
    pub fn read<T>(&self, f: impl FnOnce(&VocabularyCatalog) -> T) -> VocabResult<T> {
        let catalog = self.catalog.read().map_err(|_| VocabError::LockPoisoned)?;
        Ok(f(&catalog))
    }

    /// Runs a write closure as one all-or-nothing transaction.
    ///
    /// The closure mutates a copy of the catalog; the copy replaces the
    /// committed catalog only if the closure returns `Ok`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut VocabularyCatalog) -> VocabResult<T>,
    ) -> VocabResult<T> {
        // A panicking closure never reaches the commit, so the guard is safe to reclaim.
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut working = self.read(VocabularyCatalog::clone)?;

        let value = f(&mut working)?;

        let mut committed = self.catalog.write().map_err(|_| VocabError::LockPoisoned)?;
        *committed = working;
        Ok(value)
    }

    /// Creates a vocabulary in its own transaction.
    pub fn create_vocabulary(&self, name: &str, has_relations: bool) -> VocabResult<Vocabulary> {
        self.transaction(|catalog| catalog.create_vocabulary(name, has_relations))
    }

    /// Gets a vocabulary by name.
    pub fn vocabulary(&self, name: &str) -> VocabResult<Vocabulary> {
        self.read(|catalog| catalog.vocabulary(name).cloned())?
    }

    /// Lists all vocabularies ordered by name.
    pub fn vocabularies(&self) -> VocabResult<Vec<Vocabulary>> {
        self.read(|catalog| catalog.vocabularies().into_iter().cloned().collect())
    }

    /// Clears a vocabulary in its own transaction.
    pub fn clear_vocabulary(&self, name: &str) -> VocabResult<()> {
        self.transaction(|catalog| {
            let id = catalog.vocabulary(name)?.id;
            catalog.clear_vocabulary(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(lang, text)| (lang.to_string(), text.to_string()))
            .collect()
    }

    fn regions(catalog: &mut VocabularyCatalog) -> (Vocabulary, Term, Term) {
        let vocab = catalog.create_vocabulary("regions", true).unwrap();
        let eu = catalog
            .create_term(vocab.id, "EU", labels(&[("en", "Europe")]), None, Properties::new())
            .unwrap();
        let it = catalog
            .create_term(vocab.id, "031", labels(&[("en", "Italy")]), Some(eu.id), Properties::new())
            .unwrap();
        (vocab, eu, it)
    }

    #[test]
    fn test_create_vocabulary_twice() {
        let mut catalog = VocabularyCatalog::new();
        let datatype = catalog.create_vocabulary("datatype", false).unwrap();
        assert!(datatype.is_flat());

        let err = catalog.create_vocabulary("datatype", true).unwrap_err();
        assert!(matches!(err, VocabError::VocabularyAlreadyExists { .. }));
        assert!(catalog.vocabulary("Datatype").unwrap_err().is_not_found());
    }

    #[test]
    fn test_vocabularies_sorted_by_name() {
        let mut catalog = VocabularyCatalog::new();
        catalog.create_vocabulary("m49_regions", true).unwrap();
        catalog.create_vocabulary("agrovoc", false).unwrap();
        catalog.create_vocabulary("datatype", false).unwrap();

        let names: Vec<&str> = catalog.vocabularies().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["agrovoc", "datatype", "m49_regions"]);
    }

    #[test]
    fn test_depth_and_path() {
        let mut catalog = VocabularyCatalog::new();
        let (vocab, eu, it) = regions(&mut catalog);

        assert_eq!(eu.depth, 0);
        assert_eq!(eu.path, "EU");
        assert_eq!(it.depth, 1);
        assert_eq!(it.path, "EU/031");

        let by_name = catalog.term("regions", "031").unwrap();
        let by_id = catalog.term_in(vocab.id, "031").unwrap();
        assert_eq!(by_name, by_id);
        assert_eq!(catalog.children(eu.id).map(|t| t.id).collect::<Vec<_>>(), vec![it.id]);
    }

    #[test]
    fn test_parent_rejected_on_flat_vocabulary() {
        let mut catalog = VocabularyCatalog::new();
        let flat = catalog.create_vocabulary("datatype", false).unwrap();
        let other = catalog
            .create_term(flat.id, "other", Labels::new(), None, Properties::new())
            .unwrap();

        let err = catalog
            .create_term(flat.id, "microdata", Labels::new(), Some(other.id), Properties::new())
            .unwrap_err();
        assert!(matches!(err, VocabError::InvalidParent { .. }));
    }

    #[test]
    fn test_parent_rejected_across_vocabularies() {
        let mut catalog = VocabularyCatalog::new();
        let (_, eu, _) = regions(&mut catalog);
        let other = catalog.create_vocabulary("areas", true).unwrap();

        let err = catalog
            .create_term(other.id, "north", Labels::new(), Some(eu.id), Properties::new())
            .unwrap_err();
        assert!(matches!(err, VocabError::InvalidParent { .. }));
    }

    #[test]
    fn test_term_names_unique_across_vocabularies() {
        let mut catalog = VocabularyCatalog::new();
        regions(&mut catalog);
        let areas = catalog.create_vocabulary("areas", false).unwrap();

        let err = catalog
            .create_term(areas.id, "EU", Labels::new(), None, Properties::new())
            .unwrap_err();
        assert!(
            matches!(err, VocabError::TermAlreadyExists { ref vocabulary, .. } if vocabulary == "regions")
        );
        assert!(catalog.term_in(areas.id, "EU").unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_replaces_labels_and_properties() {
        let mut catalog = VocabularyCatalog::new();
        let (_, _, it) = regions(&mut catalog);
        let mut props = Properties::new();
        props.insert("iso3".to_string(), "ITA".to_string());
        catalog
            .update_term(it.id, labels(&[("en", "Italy"), ("fr", "Italie")]), it.parent_id, props)
            .unwrap();

        let updated = catalog
            .update_term(it.id, labels(&[("fr", "Italie")]), it.parent_id, Properties::new())
            .unwrap();
        assert!(catalog.label_for(it.id, "en").is_none());
        assert_eq!(catalog.label_for(it.id, "fr").unwrap().label, "Italie");
        assert_eq!(updated.property("iso3"), None);
    }

    #[test]
    fn test_update_relinks_parent_without_cascading() {
        let mut catalog = VocabularyCatalog::new();
        let (vocab, eu, it) = regions(&mut catalog);
        let rome = catalog
            .create_term(vocab.id, "ROM", Labels::new(), Some(it.id), Properties::new())
            .unwrap();
        assert_eq!(rome.path, "EU/031/ROM");

        let world = catalog
            .create_term(vocab.id, "001", Labels::new(), None, Properties::new())
            .unwrap();
        let moved = catalog
            .update_term(eu.id, Labels::new(), Some(world.id), Properties::new())
            .unwrap();
        assert_eq!(moved.depth, 1);
        assert_eq!(moved.path, "001/EU");

        // descendants keep their stale path until updated
        assert_eq!(catalog.term_by_id(it.id).unwrap().path, "EU/031");
        assert_eq!(catalog.term_by_id(rome.id).unwrap().depth, 2);
        assert_eq!(catalog.children(world.id).count(), 1);

        let flattened = catalog
            .update_term(eu.id, Labels::new(), None, Properties::new())
            .unwrap();
        assert!(flattened.is_top_level());
        assert_eq!(catalog.children(world.id).count(), 0);
    }

    #[test]
    fn test_update_rejects_cycles() {
        let mut catalog = VocabularyCatalog::new();
        let (_, eu, it) = regions(&mut catalog);

        let err = catalog
            .update_term(eu.id, Labels::new(), Some(it.id), Properties::new())
            .unwrap_err();
        assert!(matches!(err, VocabError::InvalidParent { .. }));

        let err = catalog
            .update_term(eu.id, Labels::new(), Some(eu.id), Properties::new())
            .unwrap_err();
        assert!(matches!(err, VocabError::InvalidParent { .. }));
    }

    #[test]
    fn test_label_or_name_fallback() {
        let mut catalog = VocabularyCatalog::new();
        let (_, eu, _) = regions(&mut catalog);

        assert_eq!(catalog.label_or_name(&eu, "en"), "Europe");
        assert_eq!(catalog.label_or_name(&eu, "fr"), "EU");
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut catalog = VocabularyCatalog::new();
        let (vocab, _, it) = regions(&mut catalog);
        let rome = catalog
            .create_term(vocab.id, "ROM", Labels::new(), Some(it.id), Properties::new())
            .unwrap();

        let names: Vec<&str> = catalog
            .ancestors(rome.id)
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["031", "EU"]);
    }

    #[test]
    fn test_clear_vocabulary() {
        let mut catalog = VocabularyCatalog::new();
        let (vocab, eu, _) = regions(&mut catalog);
        let datatype = catalog.create_vocabulary("datatype", false).unwrap();
        catalog
            .create_term(datatype.id, "other", labels(&[("en", "Other")]), None, Properties::new())
            .unwrap();

        catalog.clear_vocabulary(vocab.id).unwrap();

        assert_eq!(catalog.terms(vocab.id).count(), 0);
        assert_eq!(catalog.term_count(), 1);
        assert_eq!(catalog.label_count(), 1);
        assert_eq!(catalog.children(eu.id).count(), 0);
        assert!(!catalog.has_term_named("EU"));
        // the name is free again
        catalog
            .create_term(vocab.id, "EU", Labels::new(), None, Properties::new())
            .unwrap();
    }

    #[test]
    fn test_snapshot_rebuilds_indexes() {
        let mut catalog = VocabularyCatalog::new();
        let (vocab, eu, it) = regions(&mut catalog);

        let restored = VocabularyCatalog::from_snapshot(catalog.to_snapshot()).unwrap();
        assert_eq!(restored.term("regions", "031").unwrap(), &it);
        assert_eq!(restored.children(eu.id).count(), 1);
        assert_eq!(restored.label_for(it.id, "en").unwrap().label, "Italy");

        let mut restored = restored;
        let next = restored
            .create_term(vocab.id, "FR", Labels::new(), Some(eu.id), Properties::new())
            .unwrap();
        assert!(next.id > it.id);
    }

    #[test]
    fn test_snapshot_rejects_repeated_term_name() {
        let mut catalog = VocabularyCatalog::new();
        let (_, eu, _) = regions(&mut catalog);

        let mut snapshot = catalog.to_snapshot();
        let mut copy = eu.clone();
        copy.id = snapshot.next_term_id + 1;
        snapshot.terms.push(copy);

        let err = VocabularyCatalog::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, VocabError::InvalidValue { ref value, .. } if value == "EU"));
    }

    #[test]
    fn test_snapshot_rejects_bad_parent() {
        let mut catalog = VocabularyCatalog::new();
        let (_, _, it) = regions(&mut catalog);
        let other = catalog.create_vocabulary("areas", true).unwrap();
        let far = catalog
            .create_term(other.id, "far", Labels::new(), None, Properties::new())
            .unwrap();

        let mut missing = catalog.to_snapshot();
        for term in missing.terms.iter_mut().filter(|t| t.id == it.id) {
            term.parent_id = Some(far.id + 100);
        }
        let err = VocabularyCatalog::from_snapshot(missing).unwrap_err();
        assert!(matches!(err, VocabError::InvalidValue { ref value, .. } if value == "031"));

        let mut foreign = catalog.to_snapshot();
        for term in foreign.terms.iter_mut().filter(|t| t.id == it.id) {
            term.parent_id = Some(far.id);
        }
        let err = VocabularyCatalog::from_snapshot(foreign).unwrap_err();
        assert!(matches!(err, VocabError::InvalidValue { ref value, .. } if value == "031"));
    }

    #[test]
    fn test_transaction_after_panicking_closure() {
        let store = VocabularyStore::new();
        store.create_vocabulary("datatype", false).unwrap();

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: VocabResult<()> = store.transaction(|catalog| {
                let id = catalog.vocabulary("datatype")?.id;
                catalog.create_term(id, "lost", Labels::new(), None, Properties::new())?;
                panic!("closure failed mid-write");
            });
        }));
        assert!(panicked.is_err());
        assert_eq!(store.read(|c| c.term_count()).unwrap(), 0);

        store
            .transaction(|catalog| {
                let id = catalog.vocabulary("datatype")?.id;
                catalog.create_term(id, "microdata", Labels::new(), None, Properties::new())
            })
            .unwrap();
        assert_eq!(store.read(|c| c.term_count()).unwrap(), 1);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = VocabularyStore::new();
        store.create_vocabulary("datatype", false).unwrap();

        let result: VocabResult<()> = store.transaction(|catalog| {
            let id = catalog.vocabulary("datatype")?.id;
            catalog.create_term(id, "other", Labels::new(), None, Properties::new())?;
            catalog.create_vocabulary("datatype", false)?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(store.read(|c| c.term_count()).unwrap(), 0);
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabularies.json");

        let store = VocabularyStore::new();
        store
            .transaction(|catalog| {
                regions(catalog);
                Ok(())
            })
            .unwrap();
        store.save(&path).unwrap();

        let reopened = VocabularyStore::open(&path).unwrap();
        let vocabularies = reopened.vocabularies().unwrap();
        assert_eq!(vocabularies.len(), 1);
        assert!(vocabularies[0].has_relations);
        let path_of_italy = reopened
            .read(|c| c.term("regions", "031").map(|t| t.path.clone()))
            .unwrap()
            .unwrap();
        assert_eq!(path_of_italy, "EU/031");
    }
}
