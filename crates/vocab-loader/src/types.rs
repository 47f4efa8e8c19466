//! Loader and store types: errors, configuration and statistics.

use thiserror::Error;

/// Errors raised by the vocabulary store, loader and queries.
#[derive(Error, Debug)]
pub enum VocabError {
    /// I/O error reading a table or snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Snapshot (de)serialization error.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// No vocabulary with this name.
    #[error("Vocabulary {name} doesn't exist")]
    VocabularyNotFound {
        /// The requested vocabulary name.
        name: String,
    },

    /// No term with this name in the vocabulary.
    #[error("No term {name} for vocabulary {vocabulary}")]
    TermNotFound {
        /// The vocabulary that was searched.
        vocabulary: String,
        /// The requested term name.
        name: String,
    },

    /// A vocabulary with this name already exists.
    #[error("Vocabulary {name} already exists")]
    VocabularyAlreadyExists {
        /// The duplicate name.
        name: String,
    },

    /// Term names are unique across all vocabularies.
    #[error("Term {name} already exists in vocabulary {vocabulary}")]
    TermAlreadyExists {
        /// The duplicate name.
        name: String,
        /// The vocabulary already holding the name.
        vocabulary: String,
    },

    /// The parent can't be linked to this term.
    #[error("Invalid parent for term {term}: {reason}")]
    InvalidParent {
        /// The term being created or updated.
        term: String,
        /// Why the parent was rejected.
        reason: String,
    },

    /// Missing required column in the table header.
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// The name of the missing column.
        column: String,
    },

    /// A reserved column appears more than once in the header.
    #[error("Duplicate column: {column}")]
    DuplicateColumn {
        /// The repeated column name.
        column: String,
    },

    /// The table has a `parent` column but the vocabulary is flat.
    #[error("Cannot use 'parent' column with vocabulary {vocabulary} that doesn't support relations")]
    UnsupportedRelation {
        /// The flat vocabulary.
        vocabulary: String,
    },

    /// Postponed rows still reference parents that never appeared.
    #[error("Unresolvable hierarchy after {passes} passes: {}", format_pending(pending))]
    UnresolvableHierarchy {
        /// Retry passes attempted.
        passes: usize,
        /// `(term, parent)` pairs left unresolved.
        pending: Vec<(String, String)>,
    },

    /// A term value failed validation or decoding.
    #[error("Invalid value {value}: {reason}")]
    InvalidValue {
        /// The rejected raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No record with this store-assigned id.
    #[error("Unknown {entity} id {id}")]
    UnknownId {
        /// Kind of record ("term" or "vocabulary").
        entity: &'static str,
        /// The requested id.
        id: u64,
    },

    /// A writer panicked while holding the store lock.
    #[error("Vocabulary store lock poisoned")]
    LockPoisoned,
}

impl VocabError {
    /// Returns true for lookup misses, where the caller may choose to create instead.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::VocabularyNotFound { .. }
                | Self::TermNotFound { .. }
                | Self::UnknownId { .. }
        )
    }
}

fn format_pending(pending: &[(String, String)]) -> String {
    pending
        .iter()
        .map(|(term, parent)| format!("{} -> {}", term, parent))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for vocabulary operations.
pub type VocabResult<T> = Result<T, VocabError>;

/// Configuration for loading a table into a vocabulary.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Relations flag used when the loader has to create the vocabulary.
    pub has_relations: bool,
    /// Field delimiter of the tabular source.
    pub delimiter: u8,
    /// Upper bound on retry passes for postponed rows.
    ///
    /// `None` bounds the passes by the number of input rows.
    pub max_retry_passes: Option<usize>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            has_relations: false,
            delimiter: b',',
            max_retry_passes: None,
        }
    }
}

impl LoadConfig {
    /// Creates a config for hierarchical vocabularies.
    pub fn hierarchical() -> Self {
        Self {
            has_relations: true,
            ..Default::default()
        }
    }
}

/// Statistics from loading a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows read from the table.
    pub total_rows: usize,
    /// Terms created.
    pub created: usize,
    /// Terms updated (repeated names within the table).
    pub updated: usize,
    /// Rows skipped because the term cell was empty.
    pub skipped_rows: usize,
    /// Rows postponed at least once waiting for their parent.
    pub postponed_rows: usize,
    /// Retry passes run over the postponed queue.
    pub retry_passes: usize,
    /// Language codes of the table's label columns.
    pub languages: Vec<String>,
    /// Header columns with no role.
    pub ignored_columns: Vec<String>,
    /// Time taken to load in milliseconds.
    pub load_time_ms: u64,
}

impl LoadStats {
    /// Rows committed as terms (creates plus updates).
    pub fn committed(&self) -> usize {
        self.created + self.updated
    }
}
