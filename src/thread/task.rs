//! The "is a thread" form: implement [`Task`], wrap it in [`TaskThread`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::error::{panic_message, LifecycleError, Result};
use crate::core::flag::Flag;
use crate::core::lifecycle::Lifecycle;
use crate::thread::base::{run_thread_loop, ExceptionHandler, StopToken, ThreadConfig, ThreadCore};

/// A unit of work driven by a thread's run loop.
///
/// `run` is invoked once, or repeatedly while the loop mode is
/// [`looping`](ThreadConfig::looping), on a dedicated thread. The token lets
/// the task request its own stop.
pub trait Task: Send + 'static {
    /// Setup hook invoked on the new thread before `running` is set.
    ///
    /// A fault here aborts the loop: `running` is never set and `stopped`
    /// is set immediately.
    fn pre_run(&mut self, _token: &StopToken) -> Result<()> {
        Ok(())
    }

    /// The loop body.
    fn run(&mut self, token: &StopToken) -> Result<()>;
}

/// A lifecycle that *is* a thread: it owns a [`Task`] implementation and
/// drives it with the standard run-loop semantics.
///
/// Prefer [`OwnedThread`](crate::thread::OwnedThread) when a plain callback
/// is enough; `TaskThread` suits tasks that carry their own state or need
/// the setup hook.
///
/// # Example
///
/// ```rust
/// use thread_lifecycle::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct Counter {
///     ticks: Arc<AtomicUsize>,
/// }
///
/// impl Task for Counter {
///     fn run(&mut self, token: &StopToken) -> Result<()> {
///         if self.ticks.fetch_add(1, Ordering::SeqCst) + 1 >= 4 {
///             token.stop();
///         }
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<()> {
/// let ticks = Arc::new(AtomicUsize::new(0));
/// let thread = TaskThread::with_config(
///     Counter { ticks: Arc::clone(&ticks) },
///     ThreadConfig::new("counter").looping(true),
/// );
/// {
///     let _thread = thread.scoped()?;
/// }
/// assert_eq!(ticks.load(Ordering::SeqCst), 4);
/// assert!(thread.stopped().is_set());
/// # Ok(())
/// # }
/// ```
pub struct TaskThread<T: Task> {
    core: Arc<ThreadCore>,
    task: Mutex<Option<T>>,
    looping: bool,
    daemon: bool,
    exception: Option<ExceptionHandler>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    started: AtomicBool,
}

impl<T: Task> TaskThread<T> {
    /// Creates a thread around the task with default configuration.
    pub fn new(task: T) -> Self {
        Self::with_config(task, ThreadConfig::default())
    }

    /// Creates a thread around the task with the given configuration.
    pub fn with_config(task: T, config: ThreadConfig) -> Self {
        let core = Arc::new(ThreadCore::new(config.name, config.log));
        Self {
            core,
            task: Mutex::new(Some(task)),
            looping: config.looping,
            daemon: config.daemon,
            exception: config.exception,
            handle: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// The thread's print name.
    pub fn name(&self) -> &str {
        &self.core.name
    }
}

impl<T: Task> Lifecycle for TaskThread<T> {
    fn running(&self) -> &Flag {
        &self.core.running
    }

    fn stopped(&self) -> &Flag {
        &self.core.stopped
    }

    fn start(&self) -> Result<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LifecycleError::already_started(&self.core.name));
        }
        self.core.log.debug(&format!("{}: start", self.core.name));

        let task = self
            .task
            .lock()
            .take()
            .ok_or_else(|| LifecycleError::already_started(&self.core.name))?;
        let core = Arc::clone(&self.core);
        let exception = self.exception.clone();
        let looping = self.looping;

        let spawned = thread::Builder::new()
            .name(self.core.name.clone())
            .spawn(move || run_thread_loop(core, task, exception, looping));

        match spawned {
            Ok(handle) => {
                if !self.daemon {
                    *self.handle.lock() = Some(handle);
                }
                Ok(())
            }
            Err(source) => {
                // the loop never ran, so release joiners here
                self.core.stopped.set();
                Err(LifecycleError::spawn(&self.core.name, source))
            }
        }
    }

    fn stop(&self) {
        self.core.log.debug(&format!("{}: stop", self.core.name));
        self.core.running.clear();
    }

    fn finish(&self) {
        // the loop ends on its own once the in-flight invocation completes
        self.core.log.debug(&format!("{}: finish", self.core.name));
    }

    fn join(&self, timeout: Option<Duration>) -> Result<()> {
        self.core.log.debug(&format!("{}: join", self.core.name));
        if !self.started.load(Ordering::Acquire) {
            return Ok(());
        }
        if !self.core.stopped.wait(timeout) {
            return Err(LifecycleError::join_timeout(
                &self.core.name,
                timeout.unwrap_or_default(),
            ));
        }
        if let Some(handle) = self.handle.lock().take() {
            handle.join().map_err(|payload| {
                LifecycleError::panicked(&self.core.name, panic_message(&*payload))
            })?;
        }
        Ok(())
    }
}
