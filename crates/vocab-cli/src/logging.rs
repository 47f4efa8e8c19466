//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Without `-v`/`-q` the filter comes from `RUST_LOG`, defaulting to `info`.
//! Logs go to stderr so command output on stdout stays clean.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Level forced by the verbosity flags, if any.
pub fn level_from_flags(verbose: u8, quiet: bool) -> Option<LevelFilter> {
    match (quiet, verbose) {
        (true, _) => Some(LevelFilter::ERROR),
        (false, 0) => None,
        (false, 1) => Some(LevelFilter::DEBUG),
        (false, _) => Some(LevelFilter::TRACE),
    }
}

/// Installs the global subscriber.
pub fn init_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let filter = match level_from_flags(verbose, quiet) {
        Some(level) => EnvFilter::default().add_directive(level.into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(level_from_flags(0, false), None);
        assert_eq!(level_from_flags(1, false), Some(LevelFilter::DEBUG));
        assert_eq!(level_from_flags(3, false), Some(LevelFilter::TRACE));
        assert_eq!(level_from_flags(0, true), Some(LevelFilter::ERROR));
    }
}
