//! Logger setup for the `fabrica` binary.

use env_logger::Env;

/// Level chosen from the command line, overriding everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (_, true) => Verbosity::Verbose,
            (true, false) => Verbosity::Quiet,
            _ => Verbosity::Normal,
        }
    }
}

/// The filter to install: flags first, then `RUST_LOG`, then the configured
/// level.
pub fn filter_for(verbosity: Verbosity, configured: &str) -> String {
    match verbosity {
        Verbosity::Verbose => "debug".to_string(),
        Verbosity::Quiet => "error".to_string(),
        Verbosity::Normal => std::env::var("RUST_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| configured.to_lowercase()),
    }
}

/// Install the global logger. Repeated calls are ignored.
pub fn init(verbosity: Verbosity, configured: &str) {
    let filter = filter_for(verbosity, configured);
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(filter.as_str()))
        .parse_filters(&filter)
        .format_timestamp(None)
        .try_init();
}
