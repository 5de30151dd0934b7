//! # logging-starter
//!
//! Logging interceptors for request handlers: one that logs the body
//! arguments and the formatted response of every routed controller method,
//! and a set of opt-in behaviors for create/read/update/delete handlers.
//!
//! ## Features
//!
//! - **Request/response logging**: body arguments on entry, the formatted
//!   return value (status, headers and JSON body for envelopes) on exit
//! - **Operation markers**: put, post, exception, get and modifying-operation
//!   logging, registered explicitly per handler
//! - **Explicit chaining**: interceptors compose through a `Next` capability,
//!   with no runtime metadata scanning
//! - **axum integration**: [`HttpLoggingLayer`] applies request/response
//!   logging to routed axum handlers
//!
//! ## Quick Start
//!
//! ```rust
//! use logging_starter::{
//!     HandlerError, Invocation, Loggable, LoggingConfig, LoggingStarter, Marker, RequestMapping,
//! };
//! use serde::Serialize;
//!
//! #[derive(Debug, Clone, Serialize)]
//! struct Item {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl Loggable for Item {}
//!
//! struct ItemController;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let starter = LoggingStarter::new(LoggingConfig::default()).expect("enabled by default");
//! let chain = starter.chain::<Item>().mark(Marker::Post);
//!
//! let item = Item { id: 1, name: "x".into() };
//! let invocation = Invocation::new::<ItemController>("create_item")
//!     .controller()
//!     .mapping(RequestMapping::Post)
//!     .body(item.clone());
//!
//! let created = chain
//!     .invoke(&invocation, || async move { Ok::<_, HandlerError>(item) })
//!     .await
//!     .unwrap();
//! assert_eq!(created.id, 1);
//! # }
//! ```

mod body_wrapper;
pub use body_wrapper::BodyCaptureError;

pub mod chain;
pub use chain::{Interceptor, InterceptorChain, Next, Outcome};

pub mod config;
pub use config::{LogLevel, LoggingConfig, LoggingConfigBuilder};

pub mod error;
pub use error::{BoxError, ConfigError, HandlerError, OperationError};

pub mod http;
pub use http::{CapturedBody, HttpLoggingLayer, HttpLoggingService, DEFAULT_BODY_LIMIT};

pub mod invocation;
pub use invocation::{Argument, BodyArguments, Invocation, RequestMapping};

pub mod operations;
pub use operations::{Marker, OperationInterceptor};

pub mod request_response;
pub use request_response::RequestResponseInterceptor;

pub mod response;
pub use response::{format_response, Loggable, ResponseEnvelope};

use tracing::debug;

/// Wires the interceptors from one [`LoggingConfig`].
///
/// Interception is only available when the configuration is enabled;
/// [`LoggingStarter::new`] returns `None` otherwise, and the application
/// registers no interceptors at all. Applications that need different
/// behavior build their own interceptors and register them instead.
#[derive(Debug, Clone)]
pub struct LoggingStarter {
    config: LoggingConfig,
}

impl LoggingStarter {
    pub fn new(config: LoggingConfig) -> Option<Self> {
        if !config.enabled {
            debug!("Logging interceptors disabled by configuration");
            return None;
        }
        debug!(level = %config.level, "Logging interceptors enabled");
        Some(Self { config })
    }

    /// Resolve the configuration from the environment, then wire it.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Ok(Self::new(LoggingConfig::from_env()?))
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    pub fn request_response(&self) -> RequestResponseInterceptor {
        RequestResponseInterceptor::new(&self.config)
    }

    pub fn operation(&self, marker: Marker) -> OperationInterceptor {
        OperationInterceptor::new(marker)
    }

    pub fn http_layer(&self) -> HttpLoggingLayer {
        HttpLoggingLayer::new(&self.config)
    }

    /// A chain that starts with request/response logging. Markers and other
    /// interceptors are appended by the caller.
    pub fn chain<T: Loggable + Send + 'static>(&self) -> InterceptorChain<T> {
        InterceptorChain::new().with(self.request_response())
    }
}
