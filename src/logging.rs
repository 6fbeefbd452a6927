//! `tracing` subscriber setup for the command-line front-end.

use crate::config::{LogFormat, LoggingConfig};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Filter directive for a configured level raised by `-v` flags.
fn directive(level: &str, verbosity: u8) -> String {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    let base = LEVELS
        .iter()
        .position(|known| known.eq_ignore_ascii_case(level))
        .unwrap_or(2);
    let index = (base + usize::from(verbosity)).min(LEVELS.len() - 1);
    LEVELS[index].to_string()
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Calling this twice keeps the first subscriber.
pub fn init(config: &LoggingConfig, verbosity: u8) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(&config.level, verbosity)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // The writer type differs per branch, so each one finishes the subscriber.
    let result = match (&config.file, config.format) {
        (Some(path), format) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let builder = builder.with_ansi(false).with_writer(Mutex::new(file));
            match format {
                LogFormat::Json => builder.json().try_init(),
                LogFormat::Pretty => builder.pretty().try_init(),
                LogFormat::Compact => builder.compact().try_init(),
            }
        }
        (None, format) => {
            let builder = builder.with_writer(std::io::stderr);
            match format {
                LogFormat::Json => builder.json().try_init(),
                LogFormat::Pretty => builder.pretty().try_init(),
                LogFormat::Compact => builder.compact().try_init(),
            }
        }
    };

    if result.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}
