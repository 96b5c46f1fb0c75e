//! # Thread Lifecycle
//!
//! Composable start/stop/finish/join lifecycle primitives for background
//! threads, thread groups, and worker-pool queues.
//!
//! ## Features
//!
//! - **Observable flags**: every lifecycle exposes `running` and `stopped`
//!   conditions you can wait on or observe with callbacks
//! - **One run-loop policy**: setup hook, looping mode, and fault routing
//!   behave identically across every thread-backed component
//! - **Two thread forms**: construct [`OwnedThread`] from a callback, or
//!   implement [`Task`] and wrap it in [`TaskThread`]
//! - **Composition**: [`LifecycleGroup`] aggregates many lifecycles into one
//!   that starts in order and stops in reverse order
//! - **Worker pools**: [`WorkQueue`] fans one FIFO queue out to N workers
//!   with sentinel-based cooperative shutdown
//! - **Scoped use**: `scoped()` starts a lifecycle and shuts it down when
//!   the guard drops, with a panic-aware stop-only path
//!
//! ## Quick Start
//!
//! ```rust
//! use thread_lifecycle::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! # fn main() -> Result<()> {
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//!
//! let queue = WorkQueue::with_config(
//!     move |item: u32| {
//!         sink.lock().unwrap().push(item);
//!         Ok(())
//!     },
//!     WorkQueueConfig::new("ingest").with_thread_count(3),
//! )?;
//!
//! {
//!     let queue = queue.scoped()?;
//!     for item in 0..8 {
//!         queue.put(item)?;
//!     }
//! }
//!
//! let mut delivered = seen.lock().unwrap().clone();
//! delivered.sort_unstable();
//! assert_eq!(delivered, (0..8).collect::<Vec<_>>());
//! # Ok(())
//! # }
//! ```
//!
//! ## A Single Background Thread
//!
//! ```rust
//! use thread_lifecycle::prelude::*;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<()> {
//! let ticks = Arc::new(AtomicUsize::new(0));
//! let seen = Arc::clone(&ticks);
//!
//! let ticker = OwnedThread::with_config(
//!     move |token: &StopToken| {
//!         if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 4 {
//!             token.stop();
//!         }
//!         Ok(())
//!     },
//!     ThreadConfig::new("ticker").looping(true),
//! );
//!
//! {
//!     let _ticker = ticker.scoped()?;
//! }
//! assert_eq!(ticks.load(Ordering::SeqCst), 4);
//! assert!(ticker.stopped().is_set());
//! # Ok(())
//! # }
//! ```
//!
//! ## Fault Handling
//!
//! A callback fault never crosses a thread boundary silently: it is handed
//! to the configured handler or logged, and it stops that thread's loop.
//! Nothing is retried automatically.
//!
//! ```rust
//! use thread_lifecycle::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! # fn main() -> Result<()> {
//! let faults = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&faults);
//!
//! let worker = OwnedThread::with_config(
//!     |_token: &StopToken| Err(LifecycleError::other("bad input")),
//!     ThreadConfig::new("fallible")
//!         .with_exception_handler(move |fault| sink.lock().unwrap().push(fault.to_string())),
//! );
//!
//! worker.start()?;
//! worker.join(None)?;
//!
//! assert_eq!(faults.lock().unwrap().as_slice(), ["bad input"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod core;
pub mod group;
pub mod prelude;
pub mod queue;
pub mod thread;

pub use adapter::LifecycleAdapter;
pub use core::{
    FacadeLog, Flag, Lifecycle, LifecycleError, LifecycleExt, LogSink, NullLog, Result, Scope,
};
pub use group::LifecycleGroup;
pub use queue::{WorkQueue, WorkQueueConfig};
pub use thread::{ExceptionHandler, OwnedThread, StopToken, Task, TaskThread, ThreadConfig};
