//! Error types for lifecycle components

/// Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Errors that can occur while managing a lifecycle
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LifecycleError {
    /// The component was started a second time
    #[error("'{name}' has already been started")]
    AlreadyStarted {
        /// Name of the component
        name: String,
    },

    /// Failed to spawn the backing OS thread
    #[error("failed to spawn thread for '{name}': {message}")]
    Spawn {
        /// Name of the component
        name: String,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// `join` gave up waiting for the component to stop
    #[error("timed out joining '{name}' after {timeout_ms}ms")]
    JoinTimeout {
        /// Name of the component
        name: String,
        /// Timeout duration in milliseconds
        timeout_ms: u64,
    },

    /// A callback or thread panicked
    #[error("'{name}' panicked: {message}")]
    Panicked {
        /// Name of the component
        name: String,
        /// Panic message
        message: String,
    },

    /// The queue's workers are gone and no longer accept items
    #[error("queue '{name}' is no longer accepting items")]
    QueueClosed {
        /// Name of the queue
        name: String,
    },

    /// A bounded queue is at capacity
    #[error("queue '{name}' is full: {capacity} items queued")]
    QueueFull {
        /// Name of the queue
        name: String,
        /// Configured capacity
        capacity: usize,
    },

    /// Invalid configuration with parameter
    #[error("invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// General error
    #[error("{0}")]
    Other(String),
}

impl LifecycleError {
    /// Create an already started error
    pub fn already_started(name: impl Into<String>) -> Self {
        LifecycleError::AlreadyStarted { name: name.into() }
    }

    /// Create a spawn error from the underlying IO error
    pub fn spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        LifecycleError::Spawn {
            name: name.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a join timeout error
    pub fn join_timeout(name: impl Into<String>, timeout: std::time::Duration) -> Self {
        LifecycleError::JoinTimeout {
            name: name.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a panicked error
    pub fn panicked(name: impl Into<String>, message: impl Into<String>) -> Self {
        LifecycleError::Panicked {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a queue closed error
    pub fn queue_closed(name: impl Into<String>) -> Self {
        LifecycleError::QueueClosed { name: name.into() }
    }

    /// Create a queue full error
    pub fn queue_full(name: impl Into<String>, capacity: usize) -> Self {
        LifecycleError::QueueFull {
            name: name.into(),
            capacity,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        LifecycleError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LifecycleError::Other(msg.into())
    }
}

/// Extracts a printable message from a `catch_unwind` payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
