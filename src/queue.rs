//! Multi-consumer worker-pool queue with cooperative shutdown.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::core::error::{LifecycleError, Result};
use crate::core::flag::Flag;
use crate::core::lifecycle::Lifecycle;
use crate::core::log::{LogSink, NullLog};
use crate::group::LifecycleGroup;
use crate::thread::{ExceptionHandler, OwnedThread, StopToken, ThreadConfig};

/// Queue message. `Finish` is the shutdown sentinel; callers can only ever
/// enqueue `Item`s, so the sentinel is never confusable with real work.
enum Message<T> {
    Item(T),
    Finish,
}

/// Callback invoked with each dequeued item, on whichever worker polled it.
pub type ItemCallback<T> = Arc<dyn Fn(T) -> Result<()> + Send + Sync>;

/// Configuration for a [`WorkQueue`].
#[derive(Clone)]
pub struct WorkQueueConfig {
    /// Number of worker threads servicing the queue.
    pub thread_count: usize,
    /// Queue capacity; 0 means unbounded. When bounded and full, `put`
    /// blocks until a worker makes room.
    pub maxsize: usize,
    /// How long an idle worker waits on the queue before re-checking
    /// whether the pool is still running. Bounds stop latency.
    pub timeout: Duration,
    /// Print name; workers are named `{name}-{index}`.
    pub name: String,
    /// If true, worker threads are detached at spawn.
    pub daemon: bool,
    /// Whether a scoped queue joins its workers on normal exit.
    pub join_on_exit: bool,
    /// Logging collaborator shared by the pool and its workers.
    pub log: Arc<dyn LogSink>,
    /// Optional fault handler shared by all workers.
    pub exception: Option<ExceptionHandler>,
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        Self {
            thread_count: 1,
            maxsize: 0,
            timeout: Duration::from_millis(100),
            name: "work_queue".to_string(),
            daemon: false,
            join_on_exit: true,
            log: Arc::new(NullLog),
            exception: None,
        }
    }
}

impl WorkQueueConfig {
    /// Create a configuration with the given queue name.
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the number of worker threads.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Set the queue capacity (0 = unbounded).
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_maxsize(mut self, maxsize: usize) -> Self {
        self.maxsize = maxsize;
        self
    }

    /// Set the idle-worker poll timeout.
    ///
    /// # Panics
    ///
    /// Panics if the timeout is zero.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(!timeout.is_zero(), "poll timeout must be non-zero");
        self.timeout = timeout;
        self
    }

    /// Set the queue name.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Set whether worker threads are detached at spawn.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    /// Set whether a scoped queue joins on normal exit.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn join_on_exit(mut self, join_on_exit: bool) -> Self {
        self.join_on_exit = join_on_exit;
        self
    }

    /// Set the logging collaborator.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_log(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Set the fault handler shared by all workers.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_exception_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&LifecycleError) + Send + Sync + 'static,
    {
        self.exception = Some(Arc::new(handler));
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.thread_count == 0 {
            return Err(LifecycleError::invalid_config(
                "thread_count",
                "number of worker threads must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for WorkQueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueueConfig")
            .field("thread_count", &self.thread_count)
            .field("maxsize", &self.maxsize)
            .field("timeout", &self.timeout)
            .field("name", &self.name)
            .field("daemon", &self.daemon)
            .field("join_on_exit", &self.join_on_exit)
            .field("exception", &self.exception.as_ref().map(|_| "<handler>"))
            .finish()
    }
}

/// A multi-producer, multi-consumer FIFO queue with one lifecycle-managed
/// worker thread per consumer.
///
/// All workers share a single channel and invoke the same callback with each
/// dequeued item; the channel guarantees every enqueued item is delivered to
/// exactly one worker. [`finish()`](Lifecycle::finish) enqueues one shutdown
/// sentinel per worker, so remaining real items drain first (FIFO) and every
/// live worker receives exactly one signal.
///
/// A callback fault ends the worker that hit it via the standard run-loop
/// fault path; sibling workers and the pool's `running` flag are unaffected.
/// No cross-worker ordering is guaranteed when `thread_count > 1`.
///
/// # Example
///
/// ```rust
/// use thread_lifecycle::prelude::*;
/// use std::sync::{Arc, Mutex};
///
/// # fn main() -> Result<()> {
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let queue = WorkQueue::with_config(
///     move |item: u32| {
///         sink.lock().unwrap().push(item);
///         Ok(())
///     },
///     WorkQueueConfig::new("ingest").with_thread_count(3),
/// )?;
///
/// {
///     let queue = queue.scoped()?;
///     for item in 0..8 {
///         queue.put(item)?;
///     }
/// }
///
/// let mut delivered = seen.lock().unwrap().clone();
/// delivered.sort_unstable();
/// assert_eq!(delivered, (0..8).collect::<Vec<_>>());
/// # Ok(())
/// # }
/// ```
pub struct WorkQueue<T: Send + 'static> {
    group: LifecycleGroup,
    sender: Sender<Message<T>>,
    thread_count: usize,
    maxsize: usize,
    name: String,
    join_on_exit: bool,
    log: Arc<dyn LogSink>,
}

impl<T: Send + 'static> WorkQueue<T> {
    /// Creates a single-worker queue with default configuration.
    pub fn new<F>(callback: F) -> Result<Self>
    where
        F: Fn(T) -> Result<()> + Send + Sync + 'static,
    {
        Self::with_config(callback, WorkQueueConfig::default())
    }

    /// Creates a queue with the given configuration.
    pub fn with_config<F>(callback: F, config: WorkQueueConfig) -> Result<Self>
    where
        F: Fn(T) -> Result<()> + Send + Sync + 'static,
    {
        config.validate()?;

        let (sender, receiver) = if config.maxsize > 0 {
            bounded(config.maxsize)
        } else {
            unbounded()
        };
        let callback: ItemCallback<T> = Arc::new(callback);

        // workers watch the gate, a mirror of the pool's running flag
        let gate = Flag::new();

        let mut workers: Vec<Arc<dyn Lifecycle>> = Vec::with_capacity(config.thread_count);
        for index in 0..config.thread_count {
            let mut thread_config = ThreadConfig::new(format!("{}-{}", config.name, index))
                .daemon(config.daemon)
                .with_log(Arc::clone(&config.log));
            thread_config.exception = config.exception.clone();
            workers.push(Arc::new(OwnedThread::with_config(
                dispatch_loop(
                    receiver.clone(),
                    Arc::clone(&callback),
                    gate.clone(),
                    config.timeout,
                ),
                thread_config,
            )));
        }

        let group =
            LifecycleGroup::with_options(workers, config.name.clone(), Arc::clone(&config.log));

        let pool_running = group.running().clone();
        group.running().on_set(move || {
            if pool_running.is_set() {
                gate.set();
            } else {
                gate.clear();
            }
        });

        Ok(Self {
            group,
            sender,
            thread_count: config.thread_count,
            maxsize: config.maxsize,
            name: config.name,
            join_on_exit: config.join_on_exit,
            log: config.log,
        })
    }

    /// Enqueues an item, blocking while a bounded queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::QueueClosed`] once every worker is gone.
    pub fn put(&self, item: T) -> Result<()> {
        self.sender
            .send(Message::Item(item))
            .map_err(|_| LifecycleError::queue_closed(&self.name))
    }

    /// Enqueues an item without blocking.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::QueueFull`] if a bounded queue is at capacity
    /// - [`LifecycleError::QueueClosed`] once every worker is gone
    pub fn try_put(&self, item: T) -> Result<()> {
        self.sender.try_send(Message::Item(item)).map_err(|e| match e {
            TrySendError::Full(_) => LifecycleError::queue_full(&self.name, self.maxsize),
            TrySendError::Disconnected(_) => LifecycleError::queue_closed(&self.name),
        })
    }

    /// Number of messages currently queued (approximate under concurrency).
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    /// Returns true when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// Number of worker threads servicing the queue.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// The queue's print name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The worker lifecycles, in spawn order.
    pub fn workers(&self) -> &[Arc<dyn Lifecycle>] {
        self.group.children()
    }
}

impl<T: Send + 'static> Lifecycle for WorkQueue<T> {
    fn running(&self) -> &Flag {
        self.group.running()
    }

    fn stopped(&self) -> &Flag {
        self.group.stopped()
    }

    fn start(&self) -> Result<()> {
        self.log.debug(&format!("{}: start", self.name));
        self.group.start()
    }

    fn stop(&self) {
        self.log.debug(&format!("{}: stop", self.name));
        self.group.stop();
    }

    /// Enqueues one sentinel per worker, then finishes the group.
    ///
    /// Sentinels queue behind all previously enqueued items, so workers
    /// drain real work before shutting down.
    fn finish(&self) {
        self.log.debug(&format!("{}: finish", self.name));
        for _ in 0..self.thread_count {
            if self.sender.send(Message::Finish).is_err() {
                break;
            }
        }
        self.group.finish();
    }

    fn join(&self, timeout: Option<Duration>) -> Result<()> {
        self.group.join(timeout)
    }

    fn join_on_exit(&self) -> bool {
        self.join_on_exit
    }
}

impl<T: Send + 'static> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.name)
            .field("thread_count", &self.thread_count)
            .field("maxsize", &self.maxsize)
            .field("len", &self.len())
            .field("running", &self.group.running().is_set())
            .finish()
    }
}

/// One worker's dispatch loop: a single long-running callback invocation
/// that polls the shared channel until a sentinel, disconnect, or stop.
fn dispatch_loop<T: Send + 'static>(
    receiver: Receiver<Message<T>>,
    callback: ItemCallback<T>,
    gate: Flag,
    poll: Duration,
) -> impl FnMut(&StopToken) -> Result<()> + Send + 'static {
    move |token: &StopToken| {
        // wait for the whole pool to come up, bailing if this worker is
        // stopped before that ever happens
        while !gate.wait(Some(poll)) {
            if !token.is_running() {
                return Ok(());
            }
        }

        while gate.is_set() && token.is_running() {
            match receiver.recv_timeout(poll) {
                Ok(Message::Item(item)) => callback(item)?,
                Ok(Message::Finish) => return Ok(()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            }
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
    fn test_single_worker_delivers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let queue = WorkQueue::new(move |item: u32| {
            sink.lock().push(item);
            Ok(())
        })
        .unwrap();

        {
            let queue = queue.scoped().unwrap();
            for item in 0..8 {
                queue.put(item).unwrap();
            }
        }

        // a single consumer preserves FIFO order
        assert_eq!(*seen.lock(), (0..8).collect::<Vec<_>>());
        assert!(!queue.running().is_set());
        assert!(queue.stopped().is_set());
    }

    #[test]
    fn test_try_put_full_bounded_queue() {
        let entered = Flag::new();
        let release = Flag::new();
        let entered_worker = entered.clone();
        let release_worker = release.clone();
        let queue = WorkQueue::with_config(
            move |_item: u32| {
                entered_worker.set();
                release_worker.wait(None);
                Ok(())
            },
            WorkQueueConfig::new("small").with_maxsize(1),
        )
        .unwrap();

        queue.start().unwrap();
        assert!(queue.running().wait(Some(Duration::from_secs(5))));

        // first item occupies the worker, second fills the queue
        queue.put(0).unwrap();
        assert!(entered.wait(Some(Duration::from_secs(5))));
        queue.put(1).unwrap();

        let result = queue.try_put(2);
        assert!(matches!(result, Err(LifecycleError::QueueFull { .. })));

        release.set();
        queue.finish();
        queue.join(Some(Duration::from_secs(5))).unwrap();
    }

    #[test]
    fn test_put_after_shutdown_fails() {
        let queue = WorkQueue::new(|_item: u32| Ok(())).unwrap();
        queue.start().unwrap();
        queue.finish();
        queue.join(Some(Duration::from_secs(5))).unwrap();

        // workers are gone, so their receiver clones have been dropped
        let result = queue.put(1);
        assert!(matches!(result, Err(LifecycleError::QueueClosed { .. })));
    }

    #[test]
    fn test_stop_discards_queued_items() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let entered = Flag::new();
        let release = Flag::new();
        let sink = Arc::clone(&seen);
        let entered_worker = entered.clone();
        let release_worker = release.clone();
        let queue = WorkQueue::with_config(
            move |item: u32| {
                entered_worker.set();
                release_worker.wait(None);
                sink.lock().push(item);
                Ok(())
            },
            WorkQueueConfig::new("halting").with_timeout(Duration::from_millis(10)),
        )
        .unwrap();

        queue.start().unwrap();
        queue.put(0).unwrap();
        assert!(entered.wait(Some(Duration::from_secs(5))));
        queue.put(1).unwrap();
        queue.put(2).unwrap();

        queue.stop();
        release.set();
        queue.join(Some(Duration::from_secs(5))).unwrap();

        // the in-flight item completes, the rest are dropped
        assert_eq!(*seen.lock(), vec![0]);
    }

    #[test]
    fn test_zero_thread_count_rejected() {
        let result = WorkQueue::with_config(
            |_item: u32| Ok(()),
            WorkQueueConfig::new("empty").with_thread_count(0),
        );
        assert!(matches!(
            result,
            Err(LifecycleError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_worker_names_derive_from_queue_name() {
        let queue = WorkQueue::with_config(
            |_item: u32| Ok(()),
            WorkQueueConfig::new("ingest").with_thread_count(2),
        )
        .unwrap();
        assert_eq!(queue.thread_count(), 2);
        assert_eq!(queue.workers().len(), 2);
        assert_eq!(queue.name(), "ingest");
    }
}
