#![deny(missing_docs)]
//! Shared logging utilities for the miner workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a per-thread run-epoch context that prefixes log lines while a mining run
//! is active, and a minimal test initializer for the global logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Epoch of the mining run the current thread is working on (0 = none).
    static RUN_EPOCH: Cell<u64> = const { Cell::new(0) };
}

/// Sets the run epoch used to prefix log lines on the current thread.
/// The app loop calls this after every dispatched message; pass 0 to clear.
pub fn set_run_epoch(epoch: u64) {
    RUN_EPOCH.with(|v| v.set(epoch));
}

/// Retrieves the run epoch for the current thread, or 0 when no run is active.
pub fn current_run_epoch() -> u64 {
    RUN_EPOCH.with(|v| v.get())
}

/// Logs at the given level, prefixed with `[run N]` when a run epoch is set.
#[macro_export]
macro_rules! engine_log {
    ($lvl:expr, $($arg:tt)*) => {{
        match $crate::current_run_epoch() {
            0 => $crate::log::log!($lvl, $($arg)*),
            epoch => $crate::log::log!($lvl, "[run {}] {}", epoch, format_args!($($arg)*)),
        }
    }};
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        $crate::engine_log!($crate::log::Level::Trace, $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        $crate::engine_log!($crate::log::Level::Info, $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        $crate::engine_log!($crate::log::Level::Debug, $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        $crate::engine_log!($crate::log::Level::Warn, $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        $crate::engine_log!($crate::log::Level::Error, $($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
