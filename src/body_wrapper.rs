//! Response body capture for the exit log line.
//!
//! The body keeps streaming to the client untouched; a copy of every chunk
//! is relayed to a future that resolves to the full body once the stream
//! ends.

use axum::body::{Body, Bytes, HttpBody};
use bytes::BytesMut;
use futures::{Future, StreamExt};
use http_body_util::BodyExt;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::error;

/// Error type for body capture operations
#[derive(Debug, thiserror::Error)]
pub enum BodyCaptureError {
    #[error("body stream error: {0}")]
    Stream(String),
}

pub(crate) type CaptureFuture = Pin<Box<dyn Future<Output = Result<Bytes, BodyCaptureError>> + Send>>;

/// Split `body` into a pass-through body and a future resolving to the
/// captured bytes.
///
/// The future resolves when the returned body is finished or dropped, and
/// fails with the first stream error seen.
pub(crate) fn create_body_capture_stream<B>(body: B) -> (Body, CaptureFuture)
where
    B: HttpBody<Data = Bytes, Error = axum::Error> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    let capture_stream = body.into_data_stream().map(move |result| {
        let relayed = match &result {
            Ok(chunk) => Ok(chunk.clone()),
            Err(e) => {
                error!(error = %e, "Stream error during response body capture");
                Err(BodyCaptureError::Stream(e.to_string()))
            }
        };
        // The receiver is gone only if nobody waits for the capture anymore.
        let _ = tx.send(relayed);
        result
    });

    let captured: CaptureFuture = Box::pin(async move {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = rx.recv().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok::<_, BodyCaptureError>(buffer.freeze())
    });

    (Body::from_stream(capture_stream), captured)
}
