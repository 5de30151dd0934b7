//! Opt-in logging for create/read/update/delete style handlers.
//!
//! Each [`Marker`] selects one behavior. A handler can be registered with
//! several markers; each one then fires on its own trigger.

use tracing::{error, info};

use crate::chain::{Interceptor, Next, Outcome};
use crate::error::{HandlerError, OperationError};
use crate::invocation::Invocation;
use crate::response::Loggable;

/// Selects the logging behavior of an [`OperationInterceptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Before the call: target and arguments.
    Put,
    /// Around the call: arguments before, result after. Failures are
    /// re-raised as [`OperationError`].
    Post,
    /// Only when the call fails: failure type and context. The failure
    /// propagates unchanged.
    ExceptionLogging,
    /// After a normal return: arguments and result, `nothing` when absent.
    Get,
    /// After a normal return: arguments and the affected row count.
    ModifyingOperation,
}

#[derive(Debug, Clone, Copy)]
pub struct OperationInterceptor {
    marker: Marker,
}

impl OperationInterceptor {
    pub fn new(marker: Marker) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> Marker {
        self.marker
    }
}

impl<T> Interceptor<T> for OperationInterceptor
where
    T: Loggable + Send + 'static,
{
    async fn intercept(&self, invocation: &Invocation, next: Next<'_, T>) -> Outcome<T> {
        match self.marker {
            Marker::Put => {
                log_put(invocation);
                next.run().await
            }
            Marker::Post => {
                log_post(invocation);
                match next.run().await {
                    Ok(result) => {
                        info!("Added resource: {:?}", result);
                        Ok(result)
                    }
                    Err(e) => Err(HandlerError::new(OperationError::new(e))),
                }
            }
            Marker::ExceptionLogging => {
                let outcome = next.run().await;
                if let Err(e) = &outcome {
                    log_failure(invocation, e);
                }
                outcome
            }
            Marker::Get => {
                let result = next.run().await?;
                log_read(invocation, &result);
                Ok(result)
            }
            Marker::ModifyingOperation => {
                let result = next.run().await?;
                log_modification(invocation, &result);
                Ok(result)
            }
        }
    }
}

fn log_put(invocation: &Invocation) {
    info!(
        target_type = invocation.target(),
        "Incoming put request processing by {}\nPassed arguments: {:?}",
        invocation.target(),
        invocation.arguments()
    );
}

fn log_post(invocation: &Invocation) {
    info!(
        target_type = invocation.target(),
        "Incoming post request processing by {}\nPassed arguments: {:?}",
        invocation.target(),
        invocation.arguments()
    );
}

fn log_failure(invocation: &Invocation, failure: &HandlerError) {
    info!("{}", failure.type_name());
    error!(
        target_type = invocation.target(),
        error = %failure,
        "Exception at {} while executing {} with arguments: {:?}\nCause: {}",
        invocation.target(),
        invocation.signature(),
        invocation.arguments(),
        failure
    );
}

fn log_read<T: Loggable>(invocation: &Invocation, result: &T) {
    let rendered = if result.is_absent() {
        "nothing".to_string()
    } else {
        format!("{result:?}")
    };
    info!(
        target_type = invocation.target(),
        "Get method is processed by {}, method {}, with arguments {:?} successfully.\nResponse will include {}",
        invocation.target(),
        invocation.signature(),
        invocation.arguments(),
        rendered
    );
}

fn log_modification<T: Loggable>(invocation: &Invocation, result: &T) {
    info!(
        target_type = invocation.target(),
        "Modifying was processed by {}, method {}, with arguments {:?} successfully.\nRows affected: {:?}",
        invocation.target(),
        invocation.signature(),
        invocation.arguments(),
        result
    );
}
