//! The "has a thread" form: a lifecycle constructed from a plain callback.

use std::time::Duration;

use crate::core::error::Result;
use crate::core::flag::Flag;
use crate::core::lifecycle::Lifecycle;
use crate::thread::base::{StopToken, ThreadConfig};
use crate::thread::task::{Task, TaskThread};

/// Callback invoked on the owned thread; receives a token for requesting
/// stop.
pub type RunCallback = Box<dyn FnMut(&StopToken) -> Result<()> + Send + 'static>;

struct CallbackTask {
    callback: RunCallback,
}

impl Task for CallbackTask {
    fn run(&mut self, token: &StopToken) -> Result<()> {
        (self.callback)(token)
    }
}

/// A lifecycle that owns a lazily spawned background thread bound to a
/// callback.
///
/// This is the composition form: many instances can share the same callback
/// shape (pool workers do), configured with
/// [`ThreadConfig`](crate::thread::ThreadConfig) instead of a dedicated
/// type. For tasks with their own state or a setup hook, use
/// [`TaskThread`](crate::thread::TaskThread).
///
/// # Example
///
/// ```rust
/// use thread_lifecycle::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let ticks = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&ticks);
/// let thread = OwnedThread::with_config(
///     move |token: &StopToken| {
///         if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 4 {
///             token.stop();
///         }
///         Ok(())
///     },
///     ThreadConfig::new("ticker").looping(true),
/// );
/// {
///     let _thread = thread.scoped()?;
/// }
/// assert_eq!(ticks.load(Ordering::SeqCst), 4);
/// # Ok(())
/// # }
/// ```
pub struct OwnedThread {
    thread: TaskThread<CallbackTask>,
}

impl OwnedThread {
    /// Creates a thread around the callback with default configuration.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&StopToken) -> Result<()> + Send + 'static,
    {
        Self::with_config(callback, ThreadConfig::default())
    }

    /// Creates a thread around the callback with the given configuration.
    pub fn with_config<F>(callback: F, config: ThreadConfig) -> Self
    where
        F: FnMut(&StopToken) -> Result<()> + Send + 'static,
    {
        Self {
            thread: TaskThread::with_config(
                CallbackTask {
                    callback: Box::new(callback),
                },
                config,
            ),
        }
    }

    /// The thread's print name.
    pub fn name(&self) -> &str {
        self.thread.name()
    }
}

impl Lifecycle for OwnedThread {
    fn running(&self) -> &Flag {
        self.thread.running()
    }

    fn stopped(&self) -> &Flag {
        self.thread.stopped()
    }

    fn start(&self) -> Result<()> {
        self.thread.start()
    }

    fn stop(&self) {
        self.thread.stop();
    }

    fn finish(&self) {
        self.thread.finish();
    }

    fn join(&self, timeout: Option<Duration>) -> Result<()> {
        self.thread.join(timeout)
    }
}
