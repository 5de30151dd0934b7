//! Entry/exit logging for routed controller handlers.

use tracing::debug;

use crate::chain::{Interceptor, Next, Outcome};
use crate::config::{log_at, LogLevel, LoggingConfig};
use crate::invocation::{BodyArguments, Invocation};
use crate::response::{format_response, Loggable};

/// Logs the body arguments of a routed handler before it runs, and its
/// formatted return value after it returns normally.
///
/// Only handlers that belong to a controller *and* carry a route mapping are
/// logged; every other call passes straight through. A failing handler skips
/// the response line and nothing is logged for the failure.
///
/// # Examples
///
/// ```rust
/// use logging_starter::{
///     HandlerError, InterceptorChain, Invocation, LoggingConfig, RequestMapping,
///     RequestResponseInterceptor,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// struct ItemController;
///
/// let chain = InterceptorChain::<String>::new()
///     .with(RequestResponseInterceptor::new(&LoggingConfig::default()));
///
/// let invocation = Invocation::new::<ItemController>("rename")
///     .controller()
///     .mapping(RequestMapping::Patch)
///     .arg(1u32)
///     .body("new name".to_string());
///
/// let renamed = chain
///     .invoke(&invocation, || async { Ok::<_, HandlerError>("new name".to_string()) })
///     .await
///     .unwrap();
/// assert_eq!(renamed, "new name");
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequestResponseInterceptor {
    level: LogLevel,
}

impl RequestResponseInterceptor {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            level: config.level,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Controller membership and a route mapping are both required.
    pub fn applies_to(invocation: &Invocation) -> bool {
        invocation.is_controller() && invocation.request_mapping().is_some()
    }

    pub(crate) fn log_request(&self, method: &str, body: &BodyArguments) {
        log_at!(
            self.level,
            method = %method,
            args = ?body,
            "Handling HTTP Request: Method={}, Args={:?}",
            method,
            body
        );
    }

    pub(crate) fn log_response(&self, method: &str, formatted: &str) {
        log_at!(
            self.level,
            method = %method,
            "HTTP Response for Method={}: {}",
            method,
            formatted
        );
    }
}

impl<T> Interceptor<T> for RequestResponseInterceptor
where
    T: Loggable + Send + 'static,
{
    async fn intercept(&self, invocation: &Invocation, next: Next<'_, T>) -> Outcome<T> {
        if !Self::applies_to(invocation) {
            debug!(method = invocation.method(), "Handler is not a routed controller method, skipping");
            return next.run().await;
        }

        self.log_request(invocation.method(), &invocation.body_arguments());

        let response = next.run().await?;
        self.log_response(invocation.method(), &format_response(&response));
        Ok(response)
    }
}
