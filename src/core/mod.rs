//! Core types and traits for lifecycle management

pub mod error;
pub mod flag;
pub mod lifecycle;
pub mod log;

pub use error::{LifecycleError, Result};
pub use flag::Flag;
pub use lifecycle::{Lifecycle, LifecycleExt, Scope};
pub use log::{FacadeLog, LogSink, NullLog};
