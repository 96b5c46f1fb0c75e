//! The execution loop shared by every thread-backed lifecycle.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::core::error::{panic_message, LifecycleError, Result};
use crate::core::flag::Flag;
use crate::core::log::{LogSink, NullLog};
use crate::thread::task::Task;

/// Handler invoked on the worker thread when the run loop catches a fault.
///
/// The handler customizes reporting, not retry: after it returns (or
/// panics), the loop still stops. It must not block.
pub type ExceptionHandler = Arc<dyn Fn(&LifecycleError) + Send + Sync>;

/// Plain configuration for a thread-backed lifecycle.
#[derive(Clone)]
pub struct ThreadConfig {
    /// Print name, used for the OS thread and diagnostics.
    pub name: String,
    /// If true, the callback is re-invoked after every success until the
    /// thread is stopped. If false, it runs exactly once.
    pub looping: bool,
    /// If true, the join handle is detached at spawn; `join` then waits on
    /// the `stopped` flag only.
    pub daemon: bool,
    /// Logging collaborator for lifecycle diagnostics.
    pub log: Arc<dyn LogSink>,
    /// Optional fault handler.
    pub exception: Option<ExceptionHandler>,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            name: "thread".to_string(),
            looping: false,
            daemon: false,
            log: Arc::new(NullLog),
            exception: None,
        }
    }
}

impl ThreadConfig {
    /// Create a configuration with the given thread name.
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the thread name.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Set whether the callback loops until stopped.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Set whether the thread is detached at spawn.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    /// Set the logging collaborator.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Set the fault handler.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_exception_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&LifecycleError) + Send + Sync + 'static,
    {
        self.exception = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for ThreadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadConfig")
            .field("name", &self.name)
            .field("looping", &self.looping)
            .field("daemon", &self.daemon)
            .field("exception", &self.exception.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

/// Handle passed to the loop body, letting the running task request its own
/// stop.
///
/// Cloneable and cheap; `stop` only clears the owning thread's `running`
/// flag, so the current invocation always completes before the loop exits.
#[derive(Clone, Debug)]
pub struct StopToken {
    running: Flag,
}

impl StopToken {
    pub(crate) fn new(running: Flag) -> Self {
        Self { running }
    }

    /// Requests that the owning thread's loop end after this invocation.
    pub fn stop(&self) {
        self.running.clear();
    }

    /// Returns true while the owning thread has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.running.is_set()
    }
}

/// Shared state of one thread-backed lifecycle.
pub(crate) struct ThreadCore {
    pub(crate) running: Flag,
    pub(crate) stopped: Flag,
    pub(crate) name: String,
    pub(crate) log: Arc<dyn LogSink>,
}

impl ThreadCore {
    pub(crate) fn new(name: String, log: Arc<dyn LogSink>) -> Self {
        Self {
            running: Flag::new(),
            stopped: Flag::new(),
            name,
            log,
        }
    }
}

/// Drives a task on the spawned thread.
///
/// Setup faults abort the loop before `running` is ever set. A fault in the
/// body (an `Err` or a caught panic) is routed to the handler when one is
/// configured, otherwise logged, and always ends the loop; `looping` only
/// re-invokes on success. `stopped` is set unconditionally on exit, so
/// `join` callers are never stranded while the thread itself terminates.
pub(crate) fn run_thread_loop<T: Task>(
    core: Arc<ThreadCore>,
    mut task: T,
    exception: Option<ExceptionHandler>,
    looping: bool,
) {
    let token = StopToken::new(core.running.clone());
    core.log.debug(&format!("{}: run: before", core.name));

    match catch_unwind(AssertUnwindSafe(|| task.pre_run(&token))) {
        Ok(Ok(())) => {}
        Ok(Err(fault)) => {
            core.log
                .error(&format!("{}: setup failed: {}", core.name, fault));
            core.stopped.set();
            return;
        }
        Err(payload) => {
            core.log.error(&format!(
                "{}: setup panicked: {}",
                core.name,
                panic_message(&*payload)
            ));
            core.stopped.set();
            return;
        }
    }

    core.running.set();

    while core.running.is_set() {
        match catch_unwind(AssertUnwindSafe(|| task.run(&token))) {
            Ok(Ok(())) => {
                if !looping {
                    core.running.clear();
                }
            }
            Ok(Err(fault)) => report_fault(&core, exception.as_ref(), &fault),
            Err(payload) => {
                let fault = LifecycleError::panicked(&core.name, panic_message(&*payload));
                report_fault(&core, exception.as_ref(), &fault);
            }
        }
    }

    core.stopped.set();
    core.log.debug(&format!("{}: run: after", core.name));
}

fn report_fault(core: &ThreadCore, exception: Option<&ExceptionHandler>, fault: &LifecycleError) {
    match exception {
        Some(handler) => {
            if catch_unwind(AssertUnwindSafe(|| handler(fault))).is_err() {
                core.log.error(&format!(
                    "{}: exception handler failed for: {}",
                    core.name, fault
                ));
            }
        }
        None => core.log.error(&format!("{}: {}", core.name, fault)),
    }
    core.running.clear();
}
