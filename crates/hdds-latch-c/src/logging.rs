// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialization for the pubsub C FFI
//!
//! The level applies to this library's log targets (`hdds_latch` and
//! `hdds_latch_c`) only; records from other Rust crates linked into the same
//! host stay off unless `RUST_LOG` enables them.

use super::PubsubError;
use log::LevelFilter;

/// Log targets owned by this library.
const TARGETS: [&str; 2] = ["hdds_latch", "hdds_latch_c"];

/// Log level for pubsub logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubsubLogLevel {
    PubsubLogOff = 0,
    PubsubLogError = 1,
    PubsubLogWarn = 2,
    PubsubLogInfo = 3,
    PubsubLogDebug = 4,
    PubsubLogTrace = 5,
}

impl From<PubsubLogLevel> for LevelFilter {
    fn from(level: PubsubLogLevel) -> Self {
        match level {
            PubsubLogLevel::PubsubLogOff => LevelFilter::Off,
            PubsubLogLevel::PubsubLogError => LevelFilter::Error,
            PubsubLogLevel::PubsubLogWarn => LevelFilter::Warn,
            PubsubLogLevel::PubsubLogInfo => LevelFilter::Info,
            PubsubLogLevel::PubsubLogDebug => LevelFilter::Debug,
            PubsubLogLevel::PubsubLogTrace => LevelFilter::Trace,
        }
    }
}

/// Builder with `level` on [`TARGETS`], everything else off, then the
/// directives in `overrides` (`RUST_LOG` syntax) on top.
fn scoped_builder(level: LevelFilter, overrides: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Off);
    for target in TARGETS {
        builder.filter_module(target, level);
    }
    if let Some(directives) = overrides {
        builder.parse_filters(directives);
    }
    builder.format_timestamp_millis();
    builder
}

/// Initialize console logging for the pubsub library
///
/// `RUST_LOG`, when set, is applied on top of `level` (for example
/// `hdds_latch::pubsub=trace`).
///
/// # Safety
/// Must be called from a single thread during initialization.
///
/// # Returns
/// `PubsubOk` on success, `PubsubOperationFailed` if a logger is already
/// installed
///
/// # Example (C)
/// ```c
/// pubsub_logging_init(PUBSUB_LOG_DEBUG);
/// ```
#[no_mangle]
pub unsafe extern "C" fn pubsub_logging_init(level: PubsubLogLevel) -> PubsubError {
    let overrides = std::env::var("RUST_LOG").ok();
    match scoped_builder(level.into(), overrides.as_deref()).try_init() {
        Ok(()) => PubsubError::PubsubOk,
        Err(_) => PubsubError::PubsubOperationFailed, // Already initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Record};

    fn enabled(logger: &env_logger::Logger, target: &str, level: Level) -> bool {
        logger.matches(&Record::builder().target(target).level(level).build())
    }

    #[test]
    fn test_level_scoped_to_library_targets() {
        let logger = scoped_builder(LevelFilter::Debug, None).build();

        assert_eq!(logger.filter(), LevelFilter::Debug);
        assert!(enabled(&logger, "hdds_latch::pubsub::topic", Level::Debug));
        assert!(enabled(&logger, "hdds_latch_c", Level::Info));
        assert!(!enabled(&logger, "hdds_latch", Level::Trace));
        assert!(!enabled(&logger, "host_app::net", Level::Error));
    }

    #[test]
    fn test_overrides_apply_on_top() {
        let logger = scoped_builder(LevelFilter::Warn, Some("hdds_latch::rt=trace,host_app=info"))
            .build();

        assert!(enabled(&logger, "hdds_latch::rt::wait", Level::Trace));
        assert!(!enabled(&logger, "hdds_latch::pubsub", Level::Info));
        assert!(enabled(&logger, "host_app", Level::Info));
    }

    #[test]
    fn test_off_disables_everything() {
        let logger = scoped_builder(LevelFilter::Off, None).build();
        assert_eq!(logger.filter(), LevelFilter::Off);
        assert!(!enabled(&logger, "hdds_latch", Level::Error));
    }
}
