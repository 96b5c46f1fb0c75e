//! Adapter presenting an arbitrary external object as a [`Lifecycle`].

use std::sync::Arc;
use std::time::Duration;

use crate::core::error::Result;
use crate::core::flag::Flag;
use crate::core::lifecycle::Lifecycle;
use crate::core::log::{LogSink, NullLog};

type Hook = Box<dyn Fn() + Send + Sync>;
type JoinHook = Box<dyn Fn(Option<Duration>) + Send + Sync>;

/// Wraps an external object that exposes some subset of start/stop/join.
///
/// The wrapped object's capabilities are supplied as hooks at construction
/// time; whichever hooks are absent become no-ops. The adapter keeps its own
/// `running`/`stopped` flags with base semantics (`start` sets `running`;
/// `stop` clears it and sets `stopped`), then invokes the matching hook.
///
/// This makes foreign handles usable inside a
/// [`LifecycleGroup`](crate::group::LifecycleGroup) or a scoped block.
///
/// # Example
///
/// ```rust
/// use thread_lifecycle::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// # fn main() -> Result<()> {
/// let actions = Arc::new(Mutex::new(Vec::new()));
///
/// let on_stop = Arc::clone(&actions);
/// let on_join = Arc::clone(&actions);
/// let wrapped = LifecycleAdapter::new("external")
///     .on_stop(move || on_stop.lock().unwrap().push("stop"))
///     .on_join(move |_timeout| on_join.lock().unwrap().push("join"));
///
/// {
///     let _wrapped = wrapped.scoped()?;
/// }
///
/// assert_eq!(*actions.lock().unwrap(), ["stop", "join"]);
/// # Ok(())
/// # }
/// ```
pub struct LifecycleAdapter {
    running: Flag,
    stopped: Flag,
    name: String,
    log: Arc<dyn LogSink>,
    start_hook: Option<Hook>,
    stop_hook: Option<Hook>,
    join_hook: Option<JoinHook>,
}

impl LifecycleAdapter {
    /// Creates an adapter with no hooks.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            running: Flag::new(),
            stopped: Flag::new(),
            name: name.into(),
            log: Arc::new(NullLog),
            start_hook: None,
            stop_hook: None,
            join_hook: None,
        }
    }

    /// Registers the wrapped object's start capability.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.start_hook = Some(Box::new(hook));
        self
    }

    /// Registers the wrapped object's stop capability.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop_hook = Some(Box::new(hook));
        self
    }

    /// Registers the wrapped object's join capability.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn on_join<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<Duration>) + Send + Sync + 'static,
    {
        self.join_hook = Some(Box::new(hook));
        self
    }

    /// Sets the logging collaborator.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// The adapter's print name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Lifecycle for LifecycleAdapter {
    fn running(&self) -> &Flag {
        &self.running
    }

    fn stopped(&self) -> &Flag {
        &self.stopped
    }

    fn start(&self) -> Result<()> {
        self.log.debug(&format!("{}: start", self.name));
        self.running.set();
        if let Some(hook) = &self.start_hook {
            hook();
        }
        Ok(())
    }

    fn stop(&self) {
        self.log.debug(&format!("{}: stop", self.name));
        self.running.clear();
        self.stopped.set();
        if let Some(hook) = &self.stop_hook {
            hook();
        }
    }

    fn join(&self, timeout: Option<Duration>) -> Result<()> {
        self.log.debug(&format!("{}: join", self.name));
        if let Some(hook) = &self.join_hook {
            hook(timeout);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lifecycle::LifecycleExt;
    use parking_lot::Mutex;

    #[test]
    fn test_scoped_stops_before_joining() {
        let actions = Arc::new(Mutex::new(Vec::new()));

        let on_stop = Arc::clone(&actions);
        let on_join = Arc::clone(&actions);
        let wrapped = LifecycleAdapter::new("duck")
            .on_stop(move || on_stop.lock().push("stop"))
            .on_join(move |_timeout| on_join.lock().push("join"));

        {
            let _wrapped = wrapped.scoped().unwrap();
        }

        assert_eq!(*actions.lock(), vec!["stop", "join"]);
        assert!(wrapped.stopped().is_set());
        assert!(!wrapped.running().is_set());
    }

    #[test]
    fn test_start_hook_runs_after_running_set() {
        let saw_running = Arc::new(Mutex::new(None));
        let adapter = LifecycleAdapter::new("probe");
        let running = adapter.running().clone();
        let saw = Arc::clone(&saw_running);
        let adapter = adapter.on_start(move || {
            *saw.lock() = Some(running.is_set());
        });

        adapter.start().unwrap();
        assert_eq!(*saw_running.lock(), Some(true));
    }

    #[test]
    fn test_missing_hooks_are_noops() {
        let adapter = LifecycleAdapter::new("bare");
        adapter.start().unwrap();
        adapter.stop();
        adapter.join(Some(Duration::from_millis(1))).unwrap();
        assert!(adapter.stopped().is_set());
    }

    #[test]
    fn test_timeout_reaches_join_hook() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let adapter =
            LifecycleAdapter::new("timed").on_join(move |timeout| *sink.lock() = Some(timeout));

        adapter.join(Some(Duration::from_millis(250))).unwrap();
        assert_eq!(*seen.lock(), Some(Some(Duration::from_millis(250))));
    }
}
