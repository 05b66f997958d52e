//! Tracing setup for the command-line binary

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::error::{TaxboxError, TaxboxResult};

/// Crates that log more than a CLI user wants to see
const QUIET_CRATES: &[&str] = &["reqwest=warn", "hyper=warn", "rustls=warn"];

fn directive(spec: &str) -> TaxboxResult<Directive> {
    spec.parse()
        .map_err(|e| TaxboxError::Config(format!("Invalid log directive '{}': {}", spec, e)))
}

/// Install the global subscriber; logs go to stderr
///
/// `verbose` lowers the default level to DEBUG, `quiet` raises it to WARN.
/// `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool, quiet: bool) -> TaxboxResult<()> {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    for spec in QUIET_CRATES {
        filter = filter.add_directive(directive(spec)?);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init()
        .map_err(|e| TaxboxError::Config(format!("Logging already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_crate_directives_parse() {
        for spec in QUIET_CRATES {
            assert!(directive(spec).is_ok(), "{}", spec);
        }
        assert!(directive("taxbox=notalevel").is_err());
    }
}
