//! Convenient re-exports for common types and traits

pub use crate::adapter::LifecycleAdapter;
pub use crate::core::{
    FacadeLog, Flag, Lifecycle, LifecycleError, LifecycleExt, LogSink, NullLog, Result, Scope,
};
pub use crate::group::LifecycleGroup;
pub use crate::queue::{ItemCallback, WorkQueue, WorkQueueConfig};
pub use crate::thread::{
    ExceptionHandler, OwnedThread, RunCallback, StopToken, Task, TaskThread, ThreadConfig,
};
