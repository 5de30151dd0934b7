//! Error types surfaced by the interceptors and the configuration loader.

use std::error::Error as StdError;
use std::fmt;

/// Boxed error type carried through the interceptor chain.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure raised by an intercepted handler.
///
/// Keeps the concrete type name of the original error next to the boxed
/// error itself, so observers can report *what kind* of failure happened
/// even after it has been type-erased.
pub struct HandlerError {
    type_name: &'static str,
    inner: BoxError,
}

impl HandlerError {
    /// Wrap a concrete error, recording its type name.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<E>(),
            inner: Box::new(error),
        }
    }

    /// Fully qualified type name of the wrapped error.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped error as `E`, if that is its concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Whether the wrapped error is an `E`.
    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }

    /// Unwrap into the boxed error.
    pub fn into_inner(self) -> BoxError {
        self.inner
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("type_name", &self.type_name)
            .field("inner", &self.inner)
            .finish()
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for HandlerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Generic runtime failure produced when the around-hook of a
/// post-operation sees the wrapped call fail.
///
/// The original failure is always available through [`StdError::source`].
#[derive(Debug, thiserror::Error)]
#[error("{}: {}", .source.type_name(), .source)]
pub struct OperationError {
    #[source]
    source: HandlerError,
}

impl OperationError {
    pub fn new(source: HandlerError) -> Self {
        Self { source }
    }

    /// The failure raised by the wrapped call.
    pub fn original(&self) -> &HandlerError {
        &self.source
    }

    pub fn into_original(self) -> HandlerError {
        self.source
    }
}

/// Errors raised while resolving [`LoggingConfig`](crate::LoggingConfig)
/// at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid log level `{0}`: expected one of trace, debug, info, warn, error")]
    InvalidLevel(String),
}
