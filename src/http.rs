//! Tower middleware applying request/response logging to axum routes.
//!
//! The layer treats the router it is mounted on as the controller and every
//! matched route as a mapped handler method. Mount it with
//! [`Router::route_layer`](axum::Router::route_layer) so unmatched requests
//! (the router's fallback) are not logged.
//!
//! The request body is the only body argument (`arg0`). It is buffered
//! before the inner service runs so the entry line can be written first, up
//! to a limit matching axum's `DefaultBodyLimit`. A larger body is forwarded
//! as a stream and left out of the log. The response body is captured while
//! it streams to the client; the exit line is written once the stream
//! completes.
//!
//! Extractor rejections are responses of the inner service too, so a
//! request the handler never saw is still logged with its 4xx response
//! unless [`HttpLoggingLayer::skip_client_errors`] is set.

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures::{future::BoxFuture, stream, StreamExt};
use std::{
    collections::BTreeMap,
    fmt,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, instrument, warn};

use crate::body_wrapper::create_body_capture_stream;
use crate::config::LoggingConfig;
use crate::invocation::{Invocation, RequestMapping};
use crate::request_response::RequestResponseInterceptor;
use crate::response::{format_response, ResponseEnvelope};

/// Target name recorded for routes served through the layer.
const ROUTER_TARGET: &str = "axum::Router";

/// Largest request body buffered for the entry line, in bytes. Same as
/// axum's default extractor limit.
pub const DEFAULT_BODY_LIMIT: usize = 2_097_152;

/// Request or response payload as it appears in the log.
///
/// JSON payloads are kept as JSON values; anything else is kept as text.
#[derive(Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct CapturedBody(serde_json::Value);

impl CapturedBody {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => Self(value),
            Err(_) => Self(serde_json::Value::String(
                String::from_utf8_lossy(bytes).into_owned(),
            )),
        }
    }

    /// Placeholder logged for a request body over the buffering limit.
    pub fn omitted(limit: usize) -> Self {
        Self(serde_json::Value::String(format!(
            "<omitted: body larger than {limit} bytes>"
        )))
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl fmt::Debug for CapturedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Tower layer for request/response logging.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{routing::post, Json, Router};
/// use logging_starter::{HttpLoggingLayer, LoggingConfig};
///
/// async fn create(Json(item): Json<serde_json::Value>) -> Json<serde_json::Value> {
///     Json(item)
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let app: Router = Router::new()
///     .route("/items", post(create))
///     .route_layer(HttpLoggingLayer::new(&LoggingConfig::default()));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
/// axum::serve(listener, app).await.unwrap();
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HttpLoggingLayer {
    settings: Settings,
}

#[derive(Clone, Copy, Debug)]
struct Settings {
    interceptor: RequestResponseInterceptor,
    body_limit: usize,
    skip_client_errors: bool,
}

impl HttpLoggingLayer {
    pub fn new(config: &LoggingConfig) -> Self {
        Self {
            settings: Settings {
                interceptor: RequestResponseInterceptor::new(config),
                body_limit: DEFAULT_BODY_LIMIT,
                skip_client_errors: false,
            },
        }
    }

    /// Largest request body buffered for the entry line. Raise it together
    /// with the router's `DefaultBodyLimit`.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.settings.body_limit = limit;
        self
    }

    /// Leave out the exit line for 4xx responses, such as extractor
    /// rejections produced before the handler runs.
    pub fn skip_client_errors(mut self, skip: bool) -> Self {
        self.settings.skip_client_errors = skip;
        self
    }
}

impl<S> Layer<S> for HttpLoggingLayer {
    type Service = HttpLoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HttpLoggingService {
            inner,
            settings: self.settings,
        }
    }
}

/// Service created by [`HttpLoggingLayer`].
#[derive(Clone, Debug)]
pub struct HttpLoggingService<S> {
    inner: S,
    settings: Settings,
}

impl<S> Service<Request> for HttpLoggingService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    #[instrument(skip_all)]
    fn call(&mut self, request: Request) -> Self::Future {
        // The clone may not be ready; keep the service that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let Settings {
            interceptor,
            body_limit,
            skip_client_errors,
        } = self.settings;

        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_owned())
            .unwrap_or_else(|| request.uri().path().to_owned());
        let method_name = format!("{} {}", request.method(), route);
        let mapping = RequestMapping::from_method(request.method());

        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let (arg0, body) = match buffer_request_body(body, body_limit).await {
                Ok(RequestBody::Buffered(bytes)) => {
                    let arg0 = (!bytes.is_empty()).then(|| CapturedBody::from_bytes(&bytes));
                    (arg0, Body::from(bytes))
                }
                Ok(RequestBody::Oversized(body)) => {
                    debug!(method = %method_name, limit = body_limit, "Request body over limit, not buffered");
                    (Some(CapturedBody::omitted(body_limit)), body)
                }
                Err(e) => {
                    warn!(method = %method_name, error = %e, "Failed to buffer request body");
                    return Ok((StatusCode::BAD_REQUEST, e.to_string()).into_response());
                }
            };

            let invocation = request_invocation(&method_name, mapping, arg0);
            interceptor.log_request(invocation.method(), &invocation.body_arguments());

            let request = Request::from_parts(parts, body);
            let mut response = inner.call(request).await?;

            if skip_client_errors && response.status().is_client_error() {
                debug!(method = %method_name, status = %response.status(), "Exit log skipped for client error");
                return Ok(response);
            }

            let status = response.status().as_u16();
            let headers = convert_headers(response.headers());
            let body = std::mem::replace(response.body_mut(), Body::empty());
            let (body_stream, capture_future) = create_body_capture_stream(body);
            *response.body_mut() = body_stream;
            debug!(method = %method_name, "Response body capture stream created");

            tokio::spawn(async move {
                let formatted = match capture_future.await {
                    Ok(captured) => format_response(&ResponseEnvelope {
                        status,
                        headers,
                        body: CapturedBody::from_bytes(&captured),
                    }),
                    Err(e) => format!("Error serializing response: {e}"),
                };
                interceptor.log_response(&method_name, &formatted);
            });

            Ok(response)
        })
    }
}

enum RequestBody {
    Buffered(Bytes),
    /// Over the limit: the chunks read so far followed by the unread rest.
    Oversized(Body),
}

/// Buffer `body` while it stays within `limit` bytes.
async fn buffer_request_body(body: Body, limit: usize) -> Result<RequestBody, axum::Error> {
    let mut chunks = body.into_data_stream();
    let mut buffer = BytesMut::new();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if buffer.len() + chunk.len() > limit {
            let read = stream::iter([Ok::<_, axum::Error>(buffer.freeze()), Ok(chunk)]);
            return Ok(RequestBody::Oversized(Body::from_stream(read.chain(chunks))));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(RequestBody::Buffered(buffer.freeze()))
}

fn request_invocation(
    method_name: &str,
    mapping: RequestMapping,
    arg0: Option<CapturedBody>,
) -> Invocation {
    let invocation = Invocation::with_target(ROUTER_TARGET, method_name)
        .controller()
        .mapping(mapping);
    match arg0 {
        Some(body) => invocation.body(body),
        None => invocation,
    }
}

/// Convert an axum `HeaderMap` to name -> values, in name order.
fn convert_headers(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut result = BTreeMap::new();
    for (name, value) in headers {
        result
            .entry(name.as_str().to_owned())
            .or_insert_with(Vec::new)
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    result
}
