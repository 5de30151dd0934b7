//! Explicit interceptor chaining around a handler call.
//!
//! A handler is registered with an ordered list of [`Interceptor`]s. On each
//! call the chain hands the first interceptor a [`Next`] capability; calling
//! [`Next::run`] moves on to the following interceptor and, after the last
//! one, to the handler itself. The first registered interceptor is the
//! outermost.
//!
//! # Example
//!
//! ```rust
//! use logging_starter::{HandlerError, InterceptorChain, Invocation, Marker};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! struct Repository;
//!
//! let chain = InterceptorChain::<u64>::new()
//!     .mark(Marker::ModifyingOperation)
//!     .mark(Marker::ExceptionLogging);
//!
//! let invocation = Invocation::new::<Repository>("delete_stale").arg(30u32);
//! let rows = chain
//!     .invoke(&invocation, || async { Ok::<_, HandlerError>(4) })
//!     .await
//!     .unwrap();
//! assert_eq!(rows, 4);
//! # }
//! ```

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::invocation::Invocation;
use crate::operations::{Marker, OperationInterceptor};

/// Result of an intercepted call.
pub type Outcome<T> = Result<T, HandlerError>;

/// A behavior wrapped around handler calls.
///
/// Implementations decide what to do before and after calling
/// [`Next::run`], and whether to call it at all.
///
/// # Examples
///
/// ```rust
/// use logging_starter::{Interceptor, Invocation, Next, Outcome};
/// use tracing::debug;
///
/// struct Timing;
///
/// impl<T: Send + 'static> Interceptor<T> for Timing {
///     async fn intercept(&self, invocation: &Invocation, next: Next<'_, T>) -> Outcome<T> {
///         let started = std::time::Instant::now();
///         let outcome = next.run().await;
///         debug!(method = invocation.method(), elapsed = ?started.elapsed(), "call finished");
///         outcome
///     }
/// }
/// ```
pub trait Interceptor<T>: Send + Sync + 'static {
    fn intercept(
        &self,
        invocation: &Invocation,
        next: Next<'_, T>,
    ) -> impl Future<Output = Outcome<T>> + Send;
}

/// Dyn-compatible form of [`Interceptor`] so a chain can hold mixed types.
trait DynInterceptor<T>: Send + Sync + 'static {
    fn intercept_boxed<'a>(
        &'a self,
        invocation: &'a Invocation,
        next: Next<'a, T>,
    ) -> BoxFuture<'a, Outcome<T>>;
}

struct InterceptorWrapper<I> {
    inner: I,
}

impl<T, I> DynInterceptor<T> for InterceptorWrapper<I>
where
    T: Send + 'static,
    I: Interceptor<T>,
{
    fn intercept_boxed<'a>(
        &'a self,
        invocation: &'a Invocation,
        next: Next<'a, T>,
    ) -> BoxFuture<'a, Outcome<T>> {
        Box::pin(self.inner.intercept(invocation, next))
    }
}

type Call<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Outcome<T>> + Send + 'a>;

/// The remainder of the chain, ending in the handler call.
pub struct Next<'a, T> {
    invocation: &'a Invocation,
    rest: &'a [Arc<dyn DynInterceptor<T>>],
    call: Call<'a, T>,
}

impl<'a, T: Send + 'static> Next<'a, T> {
    /// Proceed with the next interceptor, or the handler when none is left.
    pub fn run(self) -> BoxFuture<'a, Outcome<T>> {
        let Next {
            invocation,
            rest,
            call,
        } = self;
        match rest.split_first() {
            Some((first, rest)) => first.intercept_boxed(
                invocation,
                Next {
                    invocation,
                    rest,
                    call,
                },
            ),
            None => call(),
        }
    }
}

/// Ordered interceptors registered for one handler.
pub struct InterceptorChain<T> {
    interceptors: Vec<Arc<dyn DynInterceptor<T>>>,
}

impl<T: Send + 'static> InterceptorChain<T> {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Append an interceptor. Earlier interceptors wrap later ones.
    pub fn with<I: Interceptor<T>>(mut self, interceptor: I) -> Self {
        self.interceptors
            .push(Arc::new(InterceptorWrapper { inner: interceptor }));
        self
    }

    /// Append the operation logging behavior selected by `marker`.
    pub fn mark(self, marker: Marker) -> Self
    where
        T: crate::Loggable,
    {
        self.with(OperationInterceptor::new(marker))
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Run `call` for `invocation` through every registered interceptor.
    pub fn invoke<'a, F, Fut>(
        &'a self,
        invocation: &'a Invocation,
        call: F,
    ) -> BoxFuture<'a, Outcome<T>>
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Outcome<T>> + Send + 'a,
    {
        let call: Call<'a, T> = Box::new(move || -> BoxFuture<'a, Outcome<T>> { Box::pin(call()) });
        Next {
            invocation,
            rest: &self.interceptors,
            call,
        }
        .run()
    }
}

impl<T: Send + 'static> Default for InterceptorChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for InterceptorChain<T> {
    fn clone(&self) -> Self {
        Self {
            interceptors: self.interceptors.clone(),
        }
    }
}
