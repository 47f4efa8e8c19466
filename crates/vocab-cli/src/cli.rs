//! Command line argument definitions.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use vocab_loader::TermOrder;

/// Store file used when neither `--store` nor `VOCAB_STORE` is set.
pub const DEFAULT_STORE: &str = "vocabularies.json";

#[derive(Parser, Debug)]
#[command(
    name = "vocab",
    version,
    about = "Load and query multilingual controlled vocabularies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Vocabulary store snapshot file.
    #[arg(long, env = "VOCAB_STORE", default_value = DEFAULT_STORE, global = true)]
    pub store: PathBuf,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty store file.
    Init {
        /// Overwrite an existing store.
        #[arg(long)]
        force: bool,
    },

    /// List vocabularies with their term counts.
    List,

    /// Create an empty vocabulary.
    Create {
        /// Vocabulary name.
        name: String,

        /// Allow terms to have parents.
        #[arg(long)]
        relations: bool,
    },

    /// Load a CSV table into a vocabulary, replacing its terms.
    Load(LoadArgs),

    /// Search terms by label or name.
    Search(SearchArgs),

    /// List the terms of a vocabulary.
    Terms(TermsArgs),

    /// Show one term with its labels, properties and ancestry.
    Show {
        /// Vocabulary name.
        vocabulary: String,

        /// Term name.
        term: String,
    },
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Vocabulary name; created if it doesn't exist.
    pub name: String,

    /// CSV table with `term`, `parent`, `lang:<code>` and `property:<key>` columns.
    #[arg(value_name = "TABLE")]
    pub path: PathBuf,

    /// Create the vocabulary with relations enabled.
    #[arg(long)]
    pub relations: bool,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Give up after this many retry passes over rows waiting for a parent.
    #[arg(long, value_name = "N")]
    pub max_retry_passes: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Vocabulary name.
    pub vocabulary: String,

    /// Text to look for; empty matches every term.
    #[arg(default_value = "")]
    pub query: String,

    /// Label language.
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Number of results to skip.
    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    /// Maximum number of results.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug)]
pub struct TermsArgs {
    /// Vocabulary name.
    pub vocabulary: String,

    /// Label language.
    #[arg(long, default_value = "en")]
    pub lang: String,

    /// Only terms at this depth.
    #[arg(long)]
    pub depth: Option<u32>,

    /// Only direct children of this term.
    #[arg(long)]
    pub parent: Option<String>,

    /// Document extras CSV (`document_id,key,value[,state]`) to count usage from.
    #[arg(long, value_name = "EXTRAS")]
    pub usage: Option<PathBuf>,

    /// Only terms used by at least this many documents (needs --usage).
    #[arg(long, requires = "usage")]
    pub min_usage: Option<usize>,

    /// Sort order.
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,

    /// Print the top-level terms ranked by the usage of their children instead.
    #[arg(long, requires = "usage", value_name = "LIMIT")]
    pub top_ancestors: Option<usize>,
}

/// CLI sort order choices.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OrderArg {
    Name,
    Label,
    Path,
    Usage,
}

impl From<OrderArg> for TermOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Name => TermOrder::Name,
            OrderArg::Label => TermOrder::Label,
            OrderArg::Path => TermOrder::Path,
            OrderArg::Usage => TermOrder::UsageDesc,
        }
    }
}
