//! The start/stop/finish/join contract shared by every component.

use std::ops::Deref;
use std::time::Duration;

use crate::core::error::Result;
use crate::core::flag::Flag;

/// An object that can be started, run, stopped, finished, and joined.
///
/// Every lifecycle exposes two observable flags:
///
/// - [`running()`](Self::running) is false before setup completes and after
///   [`stop()`](Self::stop);
/// - [`stopped()`](Self::stopped) is false until the work has fully ended,
///   and once set it never reverts.
///
/// The two are never simultaneously true except during the stop transition,
/// where `running` is cleared and then `stopped` is set. Instances are
/// one-shot: a stopped lifecycle cannot be restarted.
///
/// Stopping requests immediate termination; finishing says there is no more
/// work coming, complete what is outstanding and then stop.
pub trait Lifecycle: Send + Sync {
    /// Flag that is true while the component is up and doing work.
    fn running(&self) -> &Flag;

    /// Flag that is true once all work has ceased. Never reverts.
    fn stopped(&self) -> &Flag;

    /// Begins setup. `running` may flip asynchronously after this returns.
    fn start(&self) -> Result<()>;

    /// Requests termination as soon as possible. Never fails and is safe to
    /// call repeatedly; `stopped` may flip asynchronously after this returns.
    fn stop(&self);

    /// Requests an orderly shutdown where outstanding work completes first.
    ///
    /// The default delegates to [`stop()`](Self::stop). Components with
    /// queued work override this to drain the queue first; thread-backed
    /// components override it to a no-op so the in-flight invocation ends
    /// the loop on its own.
    fn finish(&self) {
        self.stop();
    }

    /// Blocks until the underlying thread(s) terminate or the timeout
    /// elapses. A no-op for non-threaded implementations. Expiry reports an
    /// error but cancels nothing.
    fn join(&self, timeout: Option<Duration>) -> Result<()> {
        let _ = timeout;
        Ok(())
    }

    /// Whether [`Scope`] joins this lifecycle on normal exit.
    fn join_on_exit(&self) -> bool {
        true
    }
}

/// Extension methods available on every [`Lifecycle`].
pub trait LifecycleExt: Lifecycle {
    /// Starts the lifecycle and returns a guard that shuts it down when
    /// dropped.
    ///
    /// On a normal drop the guard calls `finish()` and then, if
    /// [`join_on_exit()`](Lifecycle::join_on_exit) is true, `join(None)`.
    /// When dropped during a panic unwind it calls `stop()` only, so a
    /// failing caller observes the fault without risking an indefinite join.
    ///
    /// # Example
    ///
    /// ```rust
    /// use thread_lifecycle::prelude::*;
    ///
    /// # fn main() -> Result<()> {
    /// let thread = OwnedThread::new(|_token: &StopToken| Ok(()));
    /// {
    ///     let _thread = thread.scoped()?;
    /// }
    /// assert!(thread.stopped().is_set());
    /// # Ok(())
    /// # }
    /// ```
    fn scoped(&self) -> Result<Scope<'_, Self>> {
        Scope::enter(self)
    }
}

impl<L: Lifecycle + ?Sized> LifecycleExt for L {}

/// Guard returned by [`LifecycleExt::scoped`]; derefs to the lifecycle.
pub struct Scope<'a, L: Lifecycle + ?Sized> {
    lifecycle: &'a L,
}

impl<'a, L: Lifecycle + ?Sized> Scope<'a, L> {
    fn enter(lifecycle: &'a L) -> Result<Self> {
        lifecycle.start()?;
        Ok(Self { lifecycle })
    }
}

impl<L: Lifecycle + ?Sized> Deref for Scope<'_, L> {
    type Target = L;

    fn deref(&self) -> &L {
        self.lifecycle
    }
}

impl<L: Lifecycle + ?Sized> Drop for Scope<'_, L> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.lifecycle.stop();
        } else {
            self.lifecycle.finish();
            if self.lifecycle.join_on_exit() {
                let _ = self.lifecycle.join(None);
            }
        }
    }
}
