//! Process-wide log handler.
//!
//! One handler serves every session in the process. Installation and
//! replacement are thread-safe; records may be emitted from any thread,
//! including backend completion-delivery threads. There is no implicit
//! teardown: a handler stays installed until replaced or cleared.

use std::sync::{Arc, RwLock};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Lifecycle milestones.
    Info,
    /// Recoverable anomalies.
    Warning,
    /// Failed operations.
    Error,
}

/// One log message emitted by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Subsystem that produced the record, e.g. `"session"`.
    pub category: &'static str,
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
}

type Handler = Arc<dyn Fn(&LogRecord) + Send + Sync>;

static LOG_HANDLER: RwLock<Option<Handler>> = RwLock::new(None);

/// Install or replace the process-wide log handler.
pub fn set_log_handler(handler: impl Fn(&LogRecord) + Send + Sync + 'static) {
    if let Ok(mut slot) = LOG_HANDLER.write() {
        *slot = Some(Arc::new(handler));
    }
}

/// Uninstall the process-wide log handler, if any.
pub fn clear_log_handler() {
    if let Ok(mut slot) = LOG_HANDLER.write() {
        *slot = None;
    }
}

/// Deliver a record to the installed handler, if any.
pub(crate) fn emit(level: LogLevel, category: &'static str, message: String) {
    // Clone the handler out so user code runs without holding the lock
    let handler = match LOG_HANDLER.read() {
        Ok(slot) => slot.clone(),
        Err(_) => return,
    };
    if let Some(handler) = handler {
        handler(&LogRecord { category, level, message });
    }
}
