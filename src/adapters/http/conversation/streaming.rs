//! Chunked plain-text streaming for message replies.
//!
//! The accumulator writes fragments into a [`ChannelSink`]; the receiving
//! half becomes the response body, so every fragment is flushed to the
//! client as its own chunk. The body ends when the sink is dropped, or
//! errors (connection abort, no terminating chunk) if the sink is aborted.

use std::io;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream;
use tokio::sync::mpsc;

use crate::ports::{FragmentSink, SinkClosed};

/// Fragments buffered between the accumulator and the connection.
pub const FRAGMENT_BUFFER: usize = 32;

type BodyItem = Result<String, io::Error>;

/// Sink that forwards fragments into a response body.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<BodyItem>,
}

#[async_trait]
impl FragmentSink for ChannelSink {
    async fn emit(&self, fragment: &str) -> Result<(), SinkClosed> {
        self.tx
            .send(Ok(fragment.to_string()))
            .await
            .map_err(|_| SinkClosed)
    }

    async fn abort(&self, reason: &str) {
        let err = io::Error::new(io::ErrorKind::Other, reason.to_string());
        let _ = self.tx.send(Err(err)).await;
    }
}

/// Creates a sink and the body it feeds.
pub fn fragment_channel() -> (ChannelSink, Body) {
    let (tx, rx) = mpsc::channel::<BodyItem>(FRAGMENT_BUFFER);

    let body_stream = stream::unfold(rx, |mut rx| async move {
        let item = rx.recv().await?;
        Some((item, rx))
    });

    (ChannelSink { tx }, Body::from_stream(body_stream))
}

/// Wraps a fragment body in a 200 response configured for incremental
/// plain-text delivery.
pub struct StreamingText(pub Body);

impl IntoResponse for StreamingText {
    fn into_response(self) -> Response {
        let mut response = Response::new(self.0);
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        // nginx and similar proxies otherwise hold the body until it ends
        headers.insert("x-accel-buffering", HeaderValue::from_static("no"));

        response
    }
}
