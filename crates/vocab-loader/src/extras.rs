//! Document extras: the external relation that records which documents
//! reference which terms.
//!
//! Documents store vocabulary membership under the key `fao_<vocabulary>`.
//! The value is a bare term name for single-valued vocabularies, or a
//! `{a,b,c}` array for multi-valued ones (`{}` when empty).

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use vocab_types::well_known::{self, ACTIVE_STATE, EMPTY_TERM_ARRAY};

use crate::types::{VocabError, VocabResult};

/// One `(document, key, value, state)` tuple of the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentExtra {
    /// Document identifier.
    pub document_id: String,
    /// Extra key (e.g. `fao_datatype`).
    pub key: String,
    /// Raw value: a term name or a `{a,b}` array.
    pub value: String,
    /// Document state; only `active` documents count.
    pub state: String,
}

impl DocumentExtra {
    /// Creates an extra for an active document.
    pub fn active(
        document_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            key: key.into(),
            value: value.into(),
            state: ACTIVE_STATE.to_string(),
        }
    }

    /// Returns true if the owning document is active.
    pub fn is_active(&self) -> bool {
        self.state == ACTIVE_STATE
    }

    /// Decodes the term names held by this extra.
    pub fn term_names(&self) -> VocabResult<Vec<String>> {
        parse_term_values(&self.value)
    }
}

/// Source of document extras consulted for usage counts.
///
/// The vocabulary store never owns this data; implement this trait over
/// whatever holds the documents.
pub trait DocumentSource {
    /// Iterates over all extras stored under `key`, whatever their state.
    fn extras_with_key<'a>(&'a self, key: &'a str) -> Box<dyn Iterator<Item = &'a DocumentExtra> + 'a>;
}

/// In-memory document extras table.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtras {
    extras: Vec<DocumentExtra>,
}

impl DocumentExtras {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extra.
    pub fn push(&mut self, extra: DocumentExtra) {
        self.extras.push(extra);
    }

    /// Returns the number of extras.
    pub fn len(&self) -> usize {
        self.extras.len()
    }

    /// Returns true if there are no extras.
    pub fn is_empty(&self) -> bool {
        self.extras.is_empty()
    }

    /// Reads extras from a CSV file with `document_id,key,value[,state]`
    /// columns. A missing or empty state means `active`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> VocabResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// Reads extras from CSV data; see [`from_path`](Self::from_path).
    pub fn from_reader<R: Read>(reader: R) -> VocabResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut extras = Self::new();
        for record in reader.deserialize::<ExtraRecord>() {
            let record = record?;
            extras.push(DocumentExtra {
                document_id: record.document_id,
                key: record.key,
                value: record.value,
                state: record
                    .state
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| ACTIVE_STATE.to_string()),
            });
        }
        Ok(extras)
    }
}

#[derive(Debug, Deserialize)]
struct ExtraRecord {
    document_id: String,
    key: String,
    value: String,
    #[serde(default)]
    state: Option<String>,
}

impl FromIterator<DocumentExtra> for DocumentExtras {
    fn from_iter<I: IntoIterator<Item = DocumentExtra>>(iter: I) -> Self {
        Self {
            extras: iter.into_iter().collect(),
        }
    }
}

impl DocumentSource for DocumentExtras {
    fn extras_with_key<'a>(&'a self, key: &'a str) -> Box<dyn Iterator<Item = &'a DocumentExtra> + 'a> {
        Box::new(self.extras.iter().filter(move |e| e.key == key))
    }
}

/// Decodes a membership value into term names.
///
/// A bare value is a single name; `{a,b}` is an array whose elements may be
/// double-quoted. Empty values and `{}` decode to no names.
///
/// # Errors
/// Fails with `InvalidValue` for unbalanced braces or quotes.
pub fn parse_term_values(raw: &str) -> VocabResult<Vec<String>> {
    let value = raw.trim();
    let invalid = |reason: &str| VocabError::InvalidValue {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    match (value.starts_with('{'), value.ends_with('}')) {
        (false, false) => {
            if value.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![value.to_string()])
            }
        }
        (true, true) if value.len() >= 2 => {
            let inner = &value[1..value.len() - 1];
            if inner.trim().is_empty() {
                return Ok(Vec::new());
            }
            inner
                .split(',')
                .map(|item| {
                    let item = item.trim();
                    let item = match (item.starts_with('"'), item.ends_with('"')) {
                        (true, true) if item.len() >= 2 => &item[1..item.len() - 1],
                        (false, false) => item,
                        _ => return Err(invalid("unbalanced quotes in array element")),
                    };
                    if item.is_empty() {
                        Err(invalid("empty array element"))
                    } else {
                        Ok(item.to_string())
                    }
                })
                .collect()
        }
        _ => Err(invalid("unbalanced braces in array value")),
    }
}

/// Encodes term names as a `{a,b}` array value.
pub fn format_term_values<S: AsRef<str>>(names: &[S]) -> String {
    if names.is_empty() {
        return EMPTY_TERM_ARRAY.to_string();
    }
    let items: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    format!("{{{}}}", items.join(","))
}

/// Active documents referencing each term of one vocabulary.
#[derive(Debug, Clone, Default)]
pub struct UsageIndex {
    documents_by_term: HashMap<String, BTreeSet<String>>,
}

impl UsageIndex {
    /// Builds the index from the extras stored under `fao_<vocabulary_name>`.
    ///
    /// Inactive documents are ignored. A document listing a term more than
    /// once counts once.
    ///
    /// # Errors
    /// Fails with `InvalidValue` if an active document holds a malformed array.
    pub fn build(source: &dyn DocumentSource, vocabulary_name: &str) -> VocabResult<Self> {
        let key = well_known::usage_key(vocabulary_name);
        let mut documents_by_term: HashMap<String, BTreeSet<String>> = HashMap::new();

        for extra in source.extras_with_key(&key) {
            if !extra.is_active() {
                continue;
            }
            for name in extra.term_names()? {
                documents_by_term
                    .entry(name)
                    .or_default()
                    .insert(extra.document_id.clone());
            }
        }

        Ok(Self { documents_by_term })
    }

    /// Number of distinct active documents referencing the term.
    pub fn count(&self, term_name: &str) -> usize {
        self.documents_by_term
            .get(term_name)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    /// Documents referencing the term.
    pub fn documents(&self, term_name: &str) -> impl Iterator<Item = &str> {
        self.documents_by_term
            .get(term_name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}
