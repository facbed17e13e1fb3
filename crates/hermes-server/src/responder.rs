//! The concrete responder.
//!
//! One [`BasicResponder`] exists per request. It owns the one-shot reply
//! channel back to the connection task; the first `send_*` call claims it
//! and every later attempt to write headers is logged and dropped. Writes
//! to a connection that has already gone away are dropped silently.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use hermes_core::{BodyProducer, BoxError, ChunkResponder, HttpError, HttpResponder};

use crate::body::ResponseBody;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

/// Capacity of the producer channel: one in-flight chunk, so `next_chunk`
/// is only pulled when the transport has accepted the previous one.
const PRODUCER_BUFFER: usize = 1;

enum ResponderState {
    Fresh(oneshot::Sender<Response<ResponseBody>>),
    HeadersSent,
}

/// Responder implementation backed by the connection task's reply channel.
pub struct BasicResponder {
    state: Mutex<ResponderState>,
    keep_alive: bool,
    runtime: Handle,
}

impl BasicResponder {
    /// Creates the responder for one request.
    pub(crate) fn new(
        reply: oneshot::Sender<Response<ResponseBody>>,
        keep_alive: bool,
        runtime: Handle,
    ) -> Self {
        Self {
            state: Mutex::new(ResponderState::Fresh(reply)),
            keep_alive,
            runtime,
        }
    }

    /// Whether the request asked for a persistent connection.
    #[must_use]
    pub(crate) fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Whether no response head has been written yet.
    #[must_use]
    pub(crate) fn is_fresh(&self) -> bool {
        matches!(&*self.state.lock(), ResponderState::Fresh(_))
    }

    /// Claims the reply channel and ships `response`.
    ///
    /// Returns `false` (and logs) when headers were already sent. A closed
    /// connection is not an error: the response is dropped silently.
    fn respond(&self, response: Response<ResponseBody>) -> bool {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, ResponderState::HeadersSent) {
            ResponderState::Fresh(reply) => {
                if reply.send(response).is_err() {
                    tracing::debug!("Connection closed before the response could be written");
                }
                true
            }
            prev => {
                *state = prev;
                tracing::warn!("Response headers already sent; dropping additional response");
                false
            }
        }
    }

    fn respond_full(
        &self,
        status: StatusCode,
        extra_headers: Option<HeaderMap>,
        content_type: &'static str,
        data: Bytes,
    ) {
        let mut response = Response::new(ResponseBody::full(data.clone()));
        *response.status_mut() = status;
        if let Some(extra) = extra_headers {
            response.headers_mut().extend(extra);
        }
        let headers = response.headers_mut();
        if !headers.contains_key(CONTENT_TYPE) && !data.is_empty() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
        self.respond(response);
    }
}

impl HttpResponder for BasicResponder {
    fn send_status(&self, status: StatusCode) {
        self.respond_full(status, None, TEXT_PLAIN, Bytes::new());
    }

    fn send_string(&self, status: StatusCode, body: &str) {
        self.respond_full(
            status,
            None,
            TEXT_PLAIN,
            Bytes::copy_from_slice(body.as_bytes()),
        );
    }

    fn send_string_with_headers(&self, status: StatusCode, body: &str, headers: HeaderMap) {
        self.respond_full(
            status,
            Some(headers),
            TEXT_PLAIN,
            Bytes::copy_from_slice(body.as_bytes()),
        );
    }

    fn send_json(&self, status: StatusCode, value: serde_json::Value) {
        match serde_json::to_vec(&value) {
            Ok(data) => self.respond_full(status, None, APPLICATION_JSON, Bytes::from(data)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize JSON response");
                self.respond_full(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    TEXT_PLAIN,
                    Bytes::new(),
                );
            }
        }
    }

    fn send_chunk_start(
        &self,
        status: StatusCode,
        headers: Option<HeaderMap>,
    ) -> Box<dyn ChunkResponder> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut response = Response::new(ResponseBody::chunked(rx));
        *response.status_mut() = status;
        if let Some(extra) = headers {
            response.headers_mut().extend(extra);
        }
        response
            .headers_mut()
            .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        if self.respond(response) {
            Box::new(ChunkWriter { sender: Some(tx) })
        } else {
            Box::new(ChunkWriter { sender: None })
        }
    }

    fn send_content(
        &self,
        status: StatusCode,
        producer: Box<dyn BodyProducer>,
        headers: HeaderMap,
    ) {
        let (tx, rx) = mpsc::channel(PRODUCER_BUFFER);
        let mut response = Response::new(ResponseBody::producer(rx));
        *response.status_mut() = status;
        response.headers_mut().extend(headers);
        response
            .headers_mut()
            .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        if self.respond(response) {
            // The pull loop may block in user code, so it lives on the
            // blocking pool; the bounded channel supplies backpressure.
            self.runtime
                .spawn_blocking(move || run_producer(producer, &tx));
        }
    }
}

/// The framework-owned producer loop.
fn run_producer(mut producer: Box<dyn BodyProducer>, tx: &mpsc::Sender<Result<Bytes, BoxError>>) {
    loop {
        match producer.next_chunk() {
            Ok(data) if data.is_empty() => {
                if let Err(e) = producer.finished() {
                    tracing::error!(error = %e, "Body producer finished() failed");
                }
                return;
            }
            Ok(data) => {
                if tx.blocking_send(Ok(data)).is_err() {
                    let cause: BoxError = Box::new(HttpError::disconnect(
                        "connection closed while streaming response body",
                    ));
                    producer.handle_error(Some(&cause));
                    return;
                }
            }
            Err(cause) => {
                producer.handle_error(Some(&cause));
                let _ = tx.blocking_send(Err(cause));
                return;
            }
        }
    }
}

/// Chunked-body writer handed back by `send_chunk_start`.
struct ChunkWriter {
    sender: Option<mpsc::UnboundedSender<Bytes>>,
}

impl ChunkResponder for ChunkWriter {
    fn send_chunk(&mut self, data: Bytes) -> Result<(), BoxError> {
        let Some(sender) = &self.sender else {
            return Err(Box::new(HttpError::internal(
                "chunked response was never started",
            )));
        };
        sender.send(data).map_err(|_| {
            Box::new(HttpError::disconnect(
                "connection closed while writing chunk",
            )) as BoxError
        })
    }

    fn close(&mut self) -> Result<(), BoxError> {
        // Dropping the sender makes the body yield its clean terminator.
        self.sender = None;
        Ok(())
    }
}
