//! Logging setup for the graft CLI.
//!
//! Log lines go to stderr so command output on stdout stays pipeable.
//! Level selection, in order: `--verbose` (debug for graft crates),
//! `--quiet` (errors only), `RUST_LOG`, then info for graft crates.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const GRAFT_CRATES: &[&str] = &[
    "graft",
    "graft_analyzer",
    "graft_graph",
    "graft_adapter",
    "graft_gen",
    "graft_config",
    "graft_cli",
];

/// Filter directive enabling `level` for every graft crate.
pub fn graft_directives(level: &str) -> String {
    GRAFT_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new(graft_directives("debug"))
    } else if quiet {
        EnvFilter::new(graft_directives("error"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(graft_directives("info")))
    };

    init_logger_with_filter(filter, no_color || !should_use_colors());
}

/// Install the global subscriber with a custom filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Whether stderr should get ANSI colors (`NO_COLOR`, `FORCE_COLOR`, then
/// terminal detection).
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process, so
    // these only cover filter construction.

    #[test]
    fn test_directives_cover_every_crate() {
        let directives = graft_directives("debug");
        assert!(directives.starts_with("graft=debug,"));
        assert!(directives.contains("graft_gen=debug"));
        assert_eq!(directives.split(',').count(), GRAFT_CRATES.len());
    }

    #[test]
    fn test_env_filter_accepts_directives() {
        let _verbose = EnvFilter::new(graft_directives("debug"));
        let _quiet = EnvFilter::new(graft_directives("error"));
    }
}
