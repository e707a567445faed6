//! Log output for applications that embed this library.
//!
//! The library itself only emits `tracing` events. Call `init_logger` once at startup to print
//! them to stderr.

use crate::Result;
use tracing_subscriber::EnvFilter;

pub use tracing_subscriber::filter::LevelFilter;

/// Initializes the tracing subscriber. `RUST_LOG` wins when it is set, otherwise only this crate's
/// events at `level` and above are printed.
///
/// # Errors
/// - When a global subscriber has already been set.
pub fn init_logger(level: LevelFilter) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Unable to initialize logging: {e}"))
}

fn filter(level: LevelFilter) -> EnvFilter {
    match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        None => EnvFilter::new(default_directive(level)),
    }
}

fn default_directive(level: LevelFilter) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(
            default_directive(LevelFilter::DEBUG).to_lowercase(),
            "finanzas_sync=debug"
        );
        assert_eq!(
            default_directive(LevelFilter::WARN).to_lowercase(),
            "finanzas_sync=warn"
        );
    }
}
