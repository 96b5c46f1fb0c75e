//! Pluggable logging collaborator for lifecycle diagnostics.
//!
//! Components never talk to a global logger directly; they hold an injected
//! [`LogSink`] and default to [`NullLog`]. Use [`FacadeLog`] to route
//! diagnostics into the `log` crate (and whatever backend the application
//! installed, e.g. `env_logger`).

use std::fmt;

/// Receives human-readable diagnostics around lifecycle transitions.
///
/// `debug` is called at entry of `start`/`stop`/`finish`/`join` and around
/// the run loop; `error` is called for unhandled faults. Implementations
/// must be cheap and non-blocking, since messages are emitted from worker
/// threads.
pub trait LogSink: Send + Sync {
    /// Records a debug-level diagnostic message.
    fn debug(&self, message: &str);

    /// Records an error-level diagnostic message.
    fn error(&self, message: &str);
}

/// Discards every message. The default sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLog;

impl LogSink for NullLog {
    fn debug(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}

/// Forwards messages to the `log` crate macros.
#[derive(Clone, Copy, Debug, Default)]
pub struct FacadeLog;

impl LogSink for FacadeLog {
    fn debug(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn error(&self, message: &str) {
        log::error!("{}", message);
    }
}

impl fmt::Debug for dyn LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogSink")
    }
}

/// Test-only sink that captures messages for assertions.
#[cfg(test)]
pub(crate) mod testing {
    use super::LogSink;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Captures messages for assertions.
    #[derive(Clone, Default)]
    pub(crate) struct MemoryLog {
        pub(crate) lines: Arc<Mutex<Vec<String>>>,
    }

    impl MemoryLog {
        pub(crate) fn contains(&self, needle: &str) -> bool {
            self.lines.lock().iter().any(|line| line.contains(needle))
        }
    }

    impl LogSink for MemoryLog {
        fn debug(&self, message: &str) {
            self.lines.lock().push(format!("debug: {message}"));
        }

        fn error(&self, message: &str) {
            self.lines.lock().push(format!("error: {message}"));
        }
    }
}
