//! Tabular source parser.
//!
//! Classifies header columns into roles and turns data records into typed
//! [`TableRow`]s. The first record of the source is always the header.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};
use vocab_types::{Labels, Properties};

use crate::types::{LoadConfig, VocabError, VocabResult};

/// Column holding the canonical term name.
pub const TERM_COLUMN: &str = "term";
/// Column holding the parent term name.
pub const PARENT_COLUMN: &str = "parent";
/// Prefix of label columns (`lang:<code>`).
pub const LANG_PREFIX: &str = "lang:";
/// Prefix of property columns (`property:<key>`).
pub const PROPERTY_PREFIX: &str = "property:";

/// Role of a header column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRole {
    /// Canonical term name.
    Term,
    /// Parent term name.
    Parent,
    /// Label in the given language.
    Label(String),
    /// Custom property with the given key.
    Property(String),
    /// Column with no meaning to the loader.
    Ignored,
}

impl ColumnRole {
    /// Classifies a single header cell.
    pub fn classify(header: &str) -> Self {
        // UTF-8 BOM at start of file
        let header = header.trim_start_matches('\u{feff}');
        if header == TERM_COLUMN {
            Self::Term
        } else if header == PARENT_COLUMN {
            Self::Parent
        } else if let Some(lang) = header.strip_prefix(LANG_PREFIX).filter(|l| !l.is_empty()) {
            Self::Label(lang.to_string())
        } else if let Some(key) = header.strip_prefix(PROPERTY_PREFIX).filter(|k| !k.is_empty()) {
            Self::Property(key.to_string())
        } else {
            Self::Ignored
        }
    }
}

/// Column roles resolved from a header record.
#[derive(Debug, Clone)]
pub struct TableLayout {
    roles: Vec<ColumnRole>,
    term_index: usize,
    parent_index: Option<usize>,
    ignored: Vec<String>,
}

impl TableLayout {
    /// Builds the layout from a header record.
    ///
    /// # Errors
    /// Fails with `MissingColumn` without a `term` column and with
    /// `DuplicateColumn` when `term` or `parent` appear more than once.
    pub fn from_headers(headers: &StringRecord) -> VocabResult<Self> {
        let mut roles = Vec::with_capacity(headers.len());
        let mut term_index = None;
        let mut parent_index = None;
        let mut ignored = Vec::new();

        for (i, header) in headers.iter().enumerate() {
            let role = ColumnRole::classify(header);
            match role {
                ColumnRole::Term => claim(&mut term_index, i, TERM_COLUMN)?,
                ColumnRole::Parent => claim(&mut parent_index, i, PARENT_COLUMN)?,
                ColumnRole::Ignored => ignored.push(header.to_string()),
                ColumnRole::Label(_) | ColumnRole::Property(_) => {}
            }
            roles.push(role);
        }

        let term_index = term_index.ok_or_else(|| VocabError::MissingColumn {
            column: TERM_COLUMN.to_string(),
        })?;

        Ok(Self {
            roles,
            term_index,
            parent_index,
            ignored,
        })
    }

    /// Returns true if the table has a `parent` column.
    pub fn has_parent(&self) -> bool {
        self.parent_index.is_some()
    }

    /// Header names that were ignored.
    pub fn ignored_columns(&self) -> &[String] {
        &self.ignored
    }

    /// Language codes contributed by `lang:*` columns.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().filter_map(|role| match role {
            ColumnRole::Label(lang) => Some(lang.as_str()),
            _ => None,
        })
    }

    /// Assembles a typed row from a data record.
    ///
    /// Returns `None` when the term cell is empty. Empty label, property and
    /// parent cells are omitted.
    pub fn row(&self, record: &StringRecord, line: u64) -> Option<TableRow> {
        let name = record.get(self.term_index).unwrap_or("").trim();
        if name.is_empty() {
            return None;
        }

        let parent = self
            .parent_index
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let mut labels = Labels::new();
        let mut properties = Properties::new();
        for (role, value) in self.roles.iter().zip(record.iter()) {
            if value.is_empty() {
                continue;
            }
            match role {
                ColumnRole::Label(lang) => {
                    labels.insert(lang.clone(), value.to_string());
                }
                ColumnRole::Property(key) => {
                    properties.insert(key.clone(), value.to_string());
                }
                _ => {}
            }
        }

        Some(TableRow {
            name: name.to_string(),
            parent,
            labels,
            properties,
            line,
        })
    }
}

fn claim(slot: &mut Option<usize>, index: usize, column: &str) -> VocabResult<()> {
    if slot.is_some() {
        return Err(VocabError::DuplicateColumn {
            column: column.to_string(),
        });
    }
    *slot = Some(index);
    Ok(())
}

/// One data row, typed by the header layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Canonical term name.
    pub name: String,
    /// Parent term name, if any.
    pub parent: Option<String>,
    /// Labels by language code.
    pub labels: Labels,
    /// Custom properties.
    pub properties: Properties,
    /// Source line (header is line 1).
    pub line: u64,
}

/// Reads a tabular source into a layout and typed rows.
pub struct TableReader<R: Read> {
    reader: Reader<R>,
    layout: TableLayout,
    records_read: usize,
    skipped: usize,
}

impl TableReader<BufReader<File>> {
    /// Opens a table from a file path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or has an invalid header.
    pub fn from_path<P: AsRef<Path>>(path: P, config: &LoadConfig) -> VocabResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), config)
    }
}

impl<R: Read> TableReader<R> {
    /// Creates a table reader and validates its header.
    pub fn from_reader(reader: R, config: &LoadConfig) -> VocabResult<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(config.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let layout = TableLayout::from_headers(csv_reader.headers()?)?;

        Ok(Self {
            reader: csv_reader,
            layout,
            records_read: 0,
            skipped: 0,
        })
    }

    /// Returns the resolved column layout.
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Returns the number of data records read so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Returns the number of records skipped for an empty term cell.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Reads all remaining rows into memory.
    pub fn read_all(&mut self) -> VocabResult<Vec<TableRow>> {
        let mut rows = Vec::new();
        for row in self.by_ref() {
            rows.push(row?);
        }
        Ok(rows)
    }
}

impl<R: Read> Iterator for TableReader<R> {
    type Item = VocabResult<TableRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut record = StringRecord::new();
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    self.records_read += 1;
                    let line = record.position().map(|p| p.line()).unwrap_or(0);
                    match self.layout.row(&record, line) {
                        Some(row) => return Some(Ok(row)),
                        None => {
                            self.skipped += 1;
                            tracing::warn!(line, "skipping row with empty term");
                            continue;
                        }
                    }
                }
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
