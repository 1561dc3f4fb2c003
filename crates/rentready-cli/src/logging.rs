//! Logging setup
//!
//! Logs go to `log_file` when configured, stderr otherwise. `RUST_LOG`
//! replaces the default filter; `--verbose` raises both crates to info.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use rentready_core::Config;

const DEFAULT_FILTER: &str = "rentready_core=warn,rentready_cli=warn";
const VERBOSE_FILTER: &str = "rentready_core=info,rentready_cli=info";

/// Install the global subscriber (ignored if one is already set)
pub fn init(config: &Config, verbose: bool) {
    let env_filter = filter(verbose, std::env::var("RUST_LOG").ok().as_deref());

    let (writer, ansi) = match &config.log_file {
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                (BoxMakeWriter::new(std::io::stderr), true)
            }
        },
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init();
}

fn filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_FILTER);
    }
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_FILTER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_filter_selection() {
        assert_eq!(filter(false, None).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(filter(false, Some("  ")).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(filter(false, Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(filter(true, Some("debug")).max_level_hint(), Some(LevelFilter::INFO));
    }
}
