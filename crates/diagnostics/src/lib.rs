//! Logging setup shared by the segzone crates.
//!
//! Structured events go through `emit` and are written to stderr. The level is
//! chosen by the `SEGZONE_LOG` environment variable:
//! - `SEGZONE_LOG=off` (default) - no logs
//! - `SEGZONE_LOG=info` - stage progress and row counts
//! - `SEGZONE_LOG=debug` - generated SQL and per-statement detail

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable consulted by [`init_diagnostics`].
pub const LOG_ENV: &str = "SEGZONE_LOG";

static INIT: Once = Once::new();

/// How much the process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Off,
    Min(emit::Level),
}

/// Parse a `SEGZONE_LOG` value. Returns `None` for unrecognized values.
#[must_use]
pub fn parse_verbosity(value: &str) -> Option<Verbosity> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" | "none" => Some(Verbosity::Off),
        "debug" => Some(Verbosity::Min(emit::Level::Debug)),
        "info" => Some(Verbosity::Min(emit::Level::Info)),
        "warn" => Some(Verbosity::Min(emit::Level::Warn)),
        "error" => Some(Verbosity::Min(emit::Level::Error)),
        _ => None,
    }
}

/// Initialize diagnostics from the `SEGZONE_LOG` environment variable.
///
/// Safe to call more than once; only the first call (of this function or
/// [`init_with`]) installs a runtime.
pub fn init_diagnostics() {
    let raw = std::env::var(LOG_ENV).unwrap_or_default();
    match parse_verbosity(&raw) {
        Some(verbosity) => init_with(verbosity),
        None => {
            init_with(Verbosity::Min(emit::Level::Info));
            // Bootstrap warning - shown even before a level is known
            eprintln!("Warning: Unknown {LOG_ENV} value '{raw}', using 'info'");
        }
    }
}

/// Initialize diagnostics with an explicit verbosity, ignoring the environment.
pub fn init_with(verbosity: Verbosity) {
    INIT.call_once(|| {
        let Verbosity::Min(level) = verbosity else {
            return;
        };
        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The runtime lives for the whole process.
        std::mem::forget(rt);
    });
}

/// Log stage progress (partition started, rows written, export finished).
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (generated SQL, bound values, skipped steps).
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable problems (cleanup failures, fallbacks).
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures, including the recoverable export failures.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
