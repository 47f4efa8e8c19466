//! Command implementations.
//!
//! Every command opens the store snapshot, runs against it and, for writes,
//! saves it back. Output goes to the given writer as tab-separated lines.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use vocab_loader::{
    DocumentExtras, DocumentSource, ListOptions, LoadConfig, TermFilter, VocabResult,
    VocabularyCatalog, VocabularyStore,
};

use crate::cli::{Cli, Command, LoadArgs, SearchArgs, TermsArgs};

/// Runs the parsed command line.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let store_path = cli.store.as_path();
    match &cli.command {
        Command::Init { force } => run_init(store_path, *force, out),
        Command::List => run_list(store_path, out),
        Command::Create { name, relations } => run_create(store_path, name, *relations, out),
        Command::Load(args) => run_load(store_path, args, out),
        Command::Search(args) => run_search(store_path, args, out),
        Command::Terms(args) => run_terms(store_path, args, out),
        Command::Show { vocabulary, term } => run_show(store_path, vocabulary, term, out),
    }
}

fn open_store(path: &Path) -> Result<VocabularyStore> {
    if !path.exists() {
        bail!(
            "store {} doesn't exist; run `vocab init` first",
            path.display()
        );
    }
    VocabularyStore::open(path).with_context(|| format!("failed to open store {}", path.display()))
}

fn save_store(store: &VocabularyStore, path: &Path) -> Result<()> {
    store
        .save(path)
        .with_context(|| format!("failed to save store {}", path.display()))?;
    tracing::debug!(store = %path.display(), "saved store");
    Ok(())
}

fn read<T>(
    store: &VocabularyStore,
    f: impl FnOnce(&VocabularyCatalog) -> VocabResult<T>,
) -> Result<T> {
    Ok(store.read(f)??)
}

fn run_init(path: &Path, force: bool, out: &mut impl Write) -> Result<()> {
    if path.exists() && !force {
        bail!("store {} already exists; use --force to replace it", path.display());
    }
    save_store(&VocabularyStore::new(), path)?;
    writeln!(out, "Initialized vocabulary store at {}", path.display())?;
    Ok(())
}

fn run_list(path: &Path, out: &mut impl Write) -> Result<()> {
    let store = open_store(path)?;
    let rows = store.read(|catalog| {
        catalog
            .vocabularies()
            .into_iter()
            .map(|v| (v.name.clone(), v.has_relations, catalog.terms(v.id).count()))
            .collect::<Vec<_>>()
    })?;

    if rows.is_empty() {
        writeln!(out, "No vocabularies")?;
    }
    for (name, has_relations, terms) in rows {
        let kind = if has_relations { "hierarchical" } else { "flat" };
        writeln!(out, "{name}\t{kind}\t{terms}")?;
    }
    Ok(())
}

fn run_create(path: &Path, name: &str, relations: bool, out: &mut impl Write) -> Result<()> {
    let store = open_store(path)?;
    store.create_vocabulary(name, relations)?;
    save_store(&store, path)?;
    writeln!(out, "Created vocabulary {name}")?;
    Ok(())
}

fn run_load(path: &Path, args: &LoadArgs, out: &mut impl Write) -> Result<()> {
    if !args.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character");
    }
    let config = LoadConfig {
        has_relations: args.relations,
        delimiter: args.delimiter as u8,
        max_retry_passes: args.max_retry_passes,
    };

    let store = open_store(path)?;
    let stats = store
        .load_vocabulary_path(&args.name, &args.path, &config)
        .with_context(|| format!("failed to load {} into {}", args.path.display(), args.name))?;
    save_store(&store, path)?;

    writeln!(
        out,
        "Loaded {} terms into {} ({} created, {} updated, {} skipped, {} retry passes) in {} ms",
        stats.committed(),
        args.name,
        stats.created,
        stats.updated,
        stats.skipped_rows,
        stats.retry_passes,
        stats.load_time_ms
    )?;
    if !stats.languages.is_empty() {
        writeln!(out, "Languages: {}", stats.languages.join(", "))?;
    }
    if !stats.ignored_columns.is_empty() {
        writeln!(out, "Ignored columns: {}", stats.ignored_columns.join(", "))?;
    }
    Ok(())
}

fn run_search(path: &Path, args: &SearchArgs, out: &mut impl Write) -> Result<()> {
    let store = open_store(path)?;
    let page = read(&store, |catalog| {
        catalog.search(&args.vocabulary, &args.lang, &args.query, args.offset, args.limit)
    })?;

    for hit in &page.results {
        writeln!(out, "{}\t{}", hit.name, hit.label)?;
    }
    writeln!(out, "{} of {} matches", page.results.len(), page.total)?;
    Ok(())
}

fn run_terms(path: &Path, args: &TermsArgs, out: &mut impl Write) -> Result<()> {
    let store = open_store(path)?;
    let documents = match &args.usage {
        Some(extras) => {
            let documents = DocumentExtras::from_path(extras)
                .with_context(|| format!("failed to read document extras {}", extras.display()))?;
            if documents.is_empty() {
                tracing::warn!(extras = %extras.display(), "no document extras; all usage counts are zero");
            }
            Some(documents)
        }
        None => None,
    };

    if let (Some(limit), Some(documents)) = (args.top_ancestors, &documents) {
        let ranks = read(&store, |catalog| {
            catalog.most_frequent_ancestor(&args.vocabulary, &args.lang, limit, documents)
        })?;
        for rank in ranks {
            writeln!(out, "{}\t{}\t{}", rank.name, rank.label, rank.usage_count)?;
        }
        return Ok(());
    }

    let options = ListOptions {
        usage: documents.as_ref().map(|d| d as &dyn DocumentSource),
        filter: TermFilter {
            depth: args.depth,
            parent: args.parent.clone(),
            min_usage: args.min_usage,
        },
        order: args.order.map(Into::into),
    };
    let rows = read(&store, |catalog| {
        catalog.list_terms(&args.vocabulary, &args.lang, &options)
    })?;

    for row in rows {
        match row.usage_count {
            Some(count) => writeln!(out, "{}\t{}\t{}\t{}", row.name, row.label, row.depth, count)?,
            None => writeln!(out, "{}\t{}\t{}", row.name, row.label, row.depth)?,
        }
    }
    Ok(())
}

fn run_show(path: &Path, vocabulary: &str, name: &str, out: &mut impl Write) -> Result<()> {
    let store = open_store(path)?;
    let lines = read(&store, |catalog| {
        let term = catalog.term(vocabulary, name)?;
        let mut lines = vec![
            format!("name\t{}", term.name),
            format!("vocabulary\t{vocabulary}"),
            format!("path\t{}", term.path),
            format!("depth\t{}", term.depth),
        ];
        if let Some(parent) = term.parent_id.and_then(|id| catalog.term_by_id(id)) {
            lines.push(format!("parent\t{}", parent.name));
        }
        for label in catalog.labels(term.id) {
            lines.push(format!("label:{}\t{}", label.lang, label.label));
        }
        for (key, value) in &term.properties {
            lines.push(format!("property:{key}\t{value}"));
        }
        let children: Vec<&str> = catalog.children(term.id).map(|c| c.name.as_str()).collect();
        if !children.is_empty() {
            lines.push(format!("children\t{}", children.join(", ")));
        }
        Ok(lines)
    })?;

    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
