//! Full-replace loading of a tabular source into a vocabulary.
//!
//! A load reads and types every row up front, then runs as one store
//! transaction: get or create the vocabulary, clear it, commit rows whose
//! parent is known and queue the rest. Queued rows are retried pass by pass
//! until the queue drains or a pass makes no progress.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

use vocab_types::{TermId, Vocabulary};

use crate::parser::{TableReader, TableRow};
use crate::store::{VocabularyCatalog, VocabularyStore};
use crate::types::{LoadConfig, LoadStats, VocabError, VocabResult};

impl VocabularyStore {
    /// Loads a table file into the named vocabulary, replacing its content.
    ///
    /// See [`load_vocabulary`](Self::load_vocabulary).
    pub fn load_vocabulary_path<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        config: &LoadConfig,
    ) -> VocabResult<LoadStats> {
        tracing::info!(vocabulary = name, path = %path.as_ref().display(), "loading vocabulary");
        let table = TableReader::from_path(path, config)?;
        self.load_table(name, table, config)
    }

    /// Loads a table into the named vocabulary, replacing its content.
    ///
    /// The vocabulary is created with `config.has_relations` if it doesn't
    /// exist. Rows may reference parents defined later in the table.
    ///
    /// # Errors
    /// Header errors (`MissingColumn`, `DuplicateColumn`) fail before any
    /// mutation. `UnsupportedRelation`, `UnresolvableHierarchy` and term
    /// errors roll the whole load back.
    pub fn load_vocabulary<R: Read>(
        &self,
        name: &str,
        reader: R,
        config: &LoadConfig,
    ) -> VocabResult<LoadStats> {
        let table = TableReader::from_reader(reader, config)?;
        self.load_table(name, table, config)
    }

    fn load_table<R: Read>(
        &self,
        name: &str,
        mut table: TableReader<R>,
        config: &LoadConfig,
    ) -> VocabResult<LoadStats> {
        let start = Instant::now();

        let rows = table.read_all()?;
        let has_parent = table.layout().has_parent();
        let mut stats = LoadStats {
            total_rows: table.records_read(),
            skipped_rows: table.skipped(),
            languages: table.layout().languages().map(str::to_string).collect(),
            ignored_columns: table.layout().ignored_columns().to_vec(),
            ..Default::default()
        };
        for column in &stats.ignored_columns {
            tracing::warn!(vocabulary = name, column = %column, "ignoring column");
        }

        let tally = self.transaction(|catalog| apply_rows(catalog, name, has_parent, rows, config))?;

        stats.created = tally.created;
        stats.updated = tally.updated;
        stats.postponed_rows = tally.postponed;
        stats.retry_passes = tally.passes;
        stats.load_time_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            vocabulary = name,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped_rows,
            retry_passes = stats.retry_passes,
            elapsed_ms = stats.load_time_ms,
            "loaded vocabulary"
        );
        Ok(stats)
    }
}

#[derive(Debug, Default)]
struct Tally {
    created: usize,
    updated: usize,
    postponed: usize,
    passes: usize,
}

fn apply_rows(
    catalog: &mut VocabularyCatalog,
    name: &str,
    has_parent: bool,
    rows: Vec<TableRow>,
    config: &LoadConfig,
) -> VocabResult<Tally> {
    let vocabulary = match catalog.vocabulary(name) {
        Ok(vocabulary) => vocabulary.clone(),
        Err(e) if e.is_not_found() => catalog.create_vocabulary(name, config.has_relations)?,
        Err(e) => return Err(e),
    };
    if has_parent && !vocabulary.has_relations {
        return Err(VocabError::UnsupportedRelation {
            vocabulary: vocabulary.name,
        });
    }
    catalog.clear_vocabulary(vocabulary.id)?;

    let bound = config.max_retry_passes.unwrap_or(rows.len());
    let mut tally = Tally::default();

    let mut pending = run_pass(catalog, &vocabulary, rows, &mut tally)?;
    tally.postponed = pending.len();

    while !pending.is_empty() {
        if tally.passes >= bound {
            return Err(unresolvable(tally.passes, pending));
        }
        tally.passes += 1;

        let before = pending.len();
        pending = run_pass(catalog, &vocabulary, pending, &mut tally)?;
        tracing::debug!(
            pass = tally.passes,
            resolved = before - pending.len(),
            remaining = pending.len(),
            "retry pass"
        );

        if pending.len() == before {
            return Err(unresolvable(tally.passes, pending));
        }
    }

    Ok(tally)
}

/// Commits rows in order and returns the ones still waiting, in order.
///
/// Once a row for a name is waiting on its parent, every later row for the
/// same name waits behind it, so the last row in the table wins.
fn run_pass(
    catalog: &mut VocabularyCatalog,
    vocabulary: &Vocabulary,
    rows: Vec<TableRow>,
    tally: &mut Tally,
) -> VocabResult<Vec<TableRow>> {
    let mut waiting: HashSet<String> = HashSet::new();
    let mut pending = Vec::new();

    for row in rows {
        if waiting.contains(&row.name) {
            pending.push(row);
            continue;
        }
        if let Some(row) = commit_row(catalog, vocabulary, row, tally)? {
            tracing::debug!(term = %row.name, line = row.line, "postponing row until its parent exists");
            waiting.insert(row.name.clone());
            pending.push(row);
        }
    }

    Ok(pending)
}

/// Commits one row, or hands it back if its parent isn't loaded yet.
fn commit_row(
    catalog: &mut VocabularyCatalog,
    vocabulary: &Vocabulary,
    row: TableRow,
    tally: &mut Tally,
) -> VocabResult<Option<TableRow>> {
    let parent_id: Option<TermId> = match &row.parent {
        None => None,
        Some(parent) => match catalog.term_in(vocabulary.id, parent).map(|t| t.id) {
            Ok(id) => Some(id),
            Err(e) if e.is_not_found() => return Ok(Some(row)),
            Err(e) => return Err(e),
        },
    };

    match catalog.term_in(vocabulary.id, &row.name).map(|t| t.id) {
        Ok(id) => {
            catalog.update_term(id, row.labels, parent_id, row.properties)?;
            tally.updated += 1;
        }
        Err(e) if e.is_not_found() => {
            catalog.create_term(vocabulary.id, &row.name, row.labels, parent_id, row.properties)?;
            tally.created += 1;
        }
        Err(e) => return Err(e),
    }
    Ok(None)
}

fn unresolvable(passes: usize, pending: Vec<TableRow>) -> VocabError {
    VocabError::UnresolvableHierarchy {
        passes,
        pending: pending
            .into_iter()
            .map(|row| (row.name, row.parent.unwrap_or_default()))
            .collect(),
    }
}
