//! Aggregation of multiple lifecycles into one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::{LifecycleError, Result};
use crate::core::flag::Flag;
use crate::core::lifecycle::Lifecycle;
use crate::core::log::{LogSink, NullLog};

/// A lifecycle composed of N child lifecycles.
///
/// The group's `running` flips true exactly once, when **all** children
/// report running; its `stopped` flips true exactly once, when all children
/// report stopped. Children are started in insertion order and stopped,
/// finished, and joined in reverse insertion order, so downstream children
/// (added later) shut down before the upstream ones they depend on.
///
/// The child list is fixed at construction. A group with no children
/// behaves as an inert lifecycle: `start` sets `running`, `stop` settles
/// both flags.
///
/// # Example
///
/// ```rust
/// use thread_lifecycle::prelude::*;
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let first: Arc<dyn Lifecycle> = Arc::new(OwnedThread::new(|_token: &StopToken| Ok(())));
/// let second: Arc<dyn Lifecycle> = Arc::new(OwnedThread::new(|_token: &StopToken| Ok(())));
/// let group = LifecycleGroup::new(vec![first, second]);
///
/// {
///     let _group = group.scoped()?;
/// }
/// assert!(group.stopped().is_set());
/// # Ok(())
/// # }
/// ```
pub struct LifecycleGroup {
    inner: Arc<GroupInner>,
    started: AtomicBool,
}

struct GroupInner {
    children: Vec<Arc<dyn Lifecycle>>,
    running: Flag,
    stopped: Flag,
    // latches guaranteeing each derived transition happens exactly once
    running_done: AtomicBool,
    stopped_done: AtomicBool,
    name: String,
    log: Arc<dyn LogSink>,
}

impl GroupInner {
    fn child_running_edge(&self) {
        if self.running_done.load(Ordering::Acquire) {
            return;
        }
        if self.children.iter().all(|child| child.running().is_set())
            && self
                .running_done
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.running.set();
        }
    }

    fn child_stopped_edge(&self) {
        if self.stopped_done.load(Ordering::Acquire) {
            return;
        }
        if !self.children.is_empty()
            && self.children.iter().all(|child| child.stopped().is_set())
            && self
                .stopped_done
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.running.clear();
            self.stopped.set();
        }
    }
}

impl LifecycleGroup {
    /// Creates a group over the given children.
    pub fn new(children: Vec<Arc<dyn Lifecycle>>) -> Self {
        Self::with_options(children, "group", Arc::new(NullLog))
    }

    /// Creates a named group over the given children.
    pub fn named<S: Into<String>>(children: Vec<Arc<dyn Lifecycle>>, name: S) -> Self {
        Self::with_options(children, name, Arc::new(NullLog))
    }

    /// Creates a group with a name and logging collaborator.
    pub fn with_options<S: Into<String>>(
        children: Vec<Arc<dyn Lifecycle>>,
        name: S,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                children,
                running: Flag::new(),
                stopped: Flag::new(),
                running_done: AtomicBool::new(false),
                stopped_done: AtomicBool::new(false),
                name: name.into(),
                log,
            }),
            started: AtomicBool::new(false),
        }
    }

    /// The group's children, in insertion order.
    pub fn children(&self) -> &[Arc<dyn Lifecycle>] {
        &self.inner.children
    }

    /// The group's print name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl FromIterator<Arc<dyn Lifecycle>> for LifecycleGroup {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Lifecycle>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Lifecycle for LifecycleGroup {
    fn running(&self) -> &Flag {
        &self.inner.running
    }

    fn stopped(&self) -> &Flag {
        &self.inner.stopped
    }

    fn start(&self) -> Result<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(LifecycleError::already_started(&self.inner.name));
        }
        self.inner.log.debug(&format!("{}: start", self.inner.name));

        if self.inner.children.is_empty() {
            self.inner.running_done.store(true, Ordering::Release);
            self.inner.running.set();
            return Ok(());
        }

        // subscribe before starting so no edge can be missed
        for child in &self.inner.children {
            let weak = Arc::downgrade(&self.inner);
            child.running().on_set(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.child_running_edge();
                }
            });
            let weak = Arc::downgrade(&self.inner);
            child.stopped().on_set(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.child_stopped_edge();
                }
            });
        }

        for child in &self.inner.children {
            child.start()?;
        }

        // children already running or stopped produce no further edges
        self.inner.child_running_edge();
        self.inner.child_stopped_edge();
        Ok(())
    }

    fn stop(&self) {
        self.inner.log.debug(&format!("{}: stop", self.inner.name));
        // block any late running edge from flipping the group back on
        self.inner.running_done.store(true, Ordering::Release);
        self.inner.running.clear();
        for child in self.inner.children.iter().rev() {
            child.stop();
        }
        if self.inner.children.is_empty()
            && self
                .inner
                .stopped_done
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.inner.stopped.set();
        }
    }

    fn finish(&self) {
        self.inner
            .log
            .debug(&format!("{}: finish", self.inner.name));
        if self.inner.children.is_empty() {
            self.stop();
            return;
        }
        for child in self.inner.children.iter().rev() {
            child.finish();
        }
    }

    fn join(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.log.debug(&format!("{}: join", self.inner.name));
        let mut first_err = None;
        for child in self.inner.children.iter().rev() {
            if let Err(e) = child.join(timeout) {
                self.inner
                    .log
                    .error(&format!("{}: join failed: {}", self.inner.name, e));
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}
