//! Observable boolean condition with edge callbacks and blocking wait.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::error::panic_message;

/// Observer invoked after every `set`/`clear`. Runs on the mutating thread
/// and must not block.
type Observer = Arc<dyn Fn() + Send + Sync>;

struct FlagInner {
    value: Mutex<bool>,
    cond: Condvar,
    observers: Mutex<Vec<Observer>>,
}

/// A boolean condition variable with edge-triggered callbacks.
///
/// `Flag` is a cheaply cloneable handle to shared state, so the same flag can
/// be mutated from one thread and observed from many others. Every call to
/// [`set()`](Self::set) or [`clear()`](Self::clear) wakes all waiters and
/// invokes the registered observers in registration order, even if the value
/// did not change.
///
/// Observers run without the flag's value lock held, so an observer may touch
/// other flags without risking a lock-order deadlock. An observer that panics
/// is caught and reported through the `log` facade; the remaining observers
/// still run and the mutating caller never sees the fault.
///
/// # Example
///
/// ```rust
/// use thread_lifecycle::Flag;
/// use std::time::Duration;
///
/// let flag = Flag::new();
/// assert!(!flag.is_set());
/// assert!(!flag.wait(Some(Duration::from_millis(1))));
///
/// flag.set();
/// assert!(flag.wait(None));
/// ```
#[derive(Clone)]
pub struct Flag {
    inner: Arc<FlagInner>,
}

impl Flag {
    /// Creates a new flag, initially false, with no observers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FlagInner {
                value: Mutex::new(false),
                cond: Condvar::new(),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Sets the flag to true, wakes all waiters, and invokes every observer.
    pub fn set(&self) {
        self.store(true);
    }

    /// Sets the flag to false, wakes all waiters, and invokes every observer.
    pub fn clear(&self) {
        self.store(false);
    }

    /// Returns the current value.
    pub fn is_set(&self) -> bool {
        *self.inner.value.lock()
    }

    /// Blocks until the flag is true or the timeout elapses.
    ///
    /// With `None` this waits indefinitely and always returns `true`.
    /// With a timeout it returns the value observed when the wait ended.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut value = self.inner.value.lock();
        match timeout {
            None => {
                while !*value {
                    self.inner.cond.wait(&mut value);
                }
                true
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !*value {
                    if self.inner.cond.wait_until(&mut value, deadline).timed_out() {
                        break;
                    }
                }
                *value
            }
        }
    }

    /// Registers an observer invoked after every `set`/`clear`.
    ///
    /// The observer runs synchronously on whichever thread mutates the flag,
    /// so it must be non-blocking.
    pub fn on_set<F>(&self, observer: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.observers.lock().push(Arc::new(observer));
    }

    /// Returns true when both handles observe the same underlying flag.
    pub fn same_flag(&self, other: &Flag) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn store(&self, value: bool) {
        {
            let mut guard = self.inner.value.lock();
            *guard = value;
            self.inner.cond.notify_all();
        }
        // snapshot so observers run without any flag lock held
        let observers: Vec<Observer> = self.inner.observers.lock().clone();
        for observer in observers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| observer())) {
                log::error!("flag observer panicked: {}", panic_message(&*payload));
            }
        }
    }
}

impl Default for Flag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("value", &self.is_set())
            .field("observers", &self.inner.observers.lock().len())
            .finish()
    }
}
