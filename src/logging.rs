//! `env_logger` setup for applications embedding the engine.
//!
//! The library only emits `log` records: skipped scan entries, filter
//! rejections (trace), trash mutations (info) and per-item deletion failures
//! (warn). [`init_logging`] installs a logger that shows them.
//!
//! Without `RUST_LOG` the `nuke` target follows the verbosity flags
//! (`quiet` = error, 0 = info, 1 = debug, 2+ = trace) while every other
//! crate stays at warn, so jwalk or rayon internals never drown out deletion
//! reports. `RUST_LOG`, when set, replaces that policy entirely.
//!
//! ```rust,no_run
//! use nuke::logging::init_logging;
//!
//! init_logging(1, false).expect("logger already installed");
//! log::debug!("Scanning {}", "/tmp/build");
//! ```

use env_logger::Builder;
use log::{LevelFilter, SetLoggerError};
use std::env;
use std::io::Write;

/// Log target prefix of every record this crate emits.
pub const CRATE_TARGET: &str = "nuke";

/// Level applied to other crates unless `RUST_LOG` says otherwise.
const DEPENDENCY_LEVEL: LevelFilter = LevelFilter::Warn;

/// Install the global logger.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<(), SetLoggerError> {
    let rust_log = env::var("RUST_LOG").ok();
    logger_builder(verbose, quiet, rust_log.as_deref()).try_init()?;

    match rust_log {
        Some(spec) => log::debug!("Logging initialized from RUST_LOG={}", spec),
        None => log::debug!(
            "Logging initialized, {} at {}",
            CRATE_TARGET,
            crate_level(verbose, quiet)
        ),
    }
    Ok(())
}

/// Configure a builder without installing it. `rust_log` is a `RUST_LOG`
/// style directive string that overrides the flags.
#[must_use]
pub fn logger_builder(verbose: u8, quiet: bool, rust_log: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    match rust_log {
        Some(spec) => {
            builder.parse_filters(spec);
        }
        None => {
            let level = crate_level(verbose, quiet);
            builder
                .filter_level(level.min(DEPENDENCY_LEVEL))
                .filter_module(CRATE_TARGET, level);
        }
    }

    builder.format(move |buf, record| {
        let level_style = buf.default_level_style(record.level());
        if verbose >= 1 {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} [{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                record.level(),
                record.args()
            )
        }
    });
    builder
}

/// Level for this crate's own records.
fn crate_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
