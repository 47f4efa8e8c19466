//! Library side of the `vocab` command line tool.

pub mod cli;
pub mod commands;
pub mod logging;
