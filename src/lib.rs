// Library surface for the binary and for headless/integration tests.
// The terminal UI lives in main.rs; everything here is UI-agnostic.
pub mod app_dirs;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod format;
pub mod log_store;
pub mod logging;
pub mod persistence;
pub mod question_timer;
pub mod runtime;
pub mod session;

pub use controller::{Command, Controller, Reply, StudyState, View};
pub use error::{Result, StudyError};
pub use log_store::{LogEntry, LogStore, Outcome};

/// Redraw cadence of the UI loop; timers still advance in whole seconds.
pub const TICK_RATE_MS: u64 = 100;
