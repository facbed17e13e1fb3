//! The response surface handed to handlers.
//!
//! A responder moves through the states `Fresh` → `HeadersSent` →
//! (`Open` | `Closed`), and the transitions are monotone: the first `send_*`
//! call wins, and any later attempt to write headers is a programming error
//! that is logged and dropped rather than surfaced to the client.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::body::BodyProducer;
use crate::error::BoxError;

/// Sends the response for one request.
///
/// Implemented by the server crate; handlers only ever see `&dyn
/// HttpResponder`. All methods are callable from blocking code: the
/// implementation queues writes onto the connection without requiring the
/// caller to be async.
pub trait HttpResponder: Send + Sync {
    /// Sends an empty-bodied response with the given status.
    ///
    /// Headers are auto-completed with `Content-Length: 0`.
    fn send_status(&self, status: StatusCode);

    /// Sends a UTF-8 text response.
    fn send_string(&self, status: StatusCode, body: &str);

    /// Sends a UTF-8 text response with extra headers.
    ///
    /// A `Connection: close` header here closes the connection after the
    /// response is flushed, regardless of what the request asked for.
    fn send_string_with_headers(&self, status: StatusCode, body: &str, headers: HeaderMap);

    /// Serializes `value` as JSON and sends it with
    /// `Content-Type: application/json`.
    fn send_json(&self, status: StatusCode, value: serde_json::Value);

    /// Writes the response head with `Transfer-Encoding: chunked` and
    /// returns a handle for writing the body chunk by chunk.
    ///
    /// Every chunk is flushed as its own frame; the terminator is written by
    /// [`ChunkResponder::close`].
    fn send_chunk_start(
        &self,
        status: StatusCode,
        headers: Option<HeaderMap>,
    ) -> Box<dyn ChunkResponder>;

    /// Streams a response body pulled from `producer`.
    ///
    /// The framework owns the chunk loop: it repeatedly calls
    /// [`BodyProducer::next_chunk`], only when the transport can accept more
    /// data, until the producer yields an empty buffer, then calls
    /// [`BodyProducer::finished`]. A write failure is reported through
    /// [`BodyProducer::handle_error`] instead.
    fn send_content(&self, status: StatusCode, producer: Box<dyn BodyProducer>, headers: HeaderMap);
}

/// Handle for writing a chunked response body.
///
/// Obtained from [`HttpResponder::send_chunk_start`]. Chunks are framed and
/// flushed in call order; dropping the handle without calling
/// [`close`](ChunkResponder::close) ends the body as if closed.
pub trait ChunkResponder: Send {
    /// Writes and flushes one chunk.
    ///
    /// # Errors
    ///
    /// Fails when the connection is no longer writable.
    fn send_chunk(&mut self, data: Bytes) -> Result<(), BoxError>;

    /// Writes the terminating chunk and completes the response.
    ///
    /// # Errors
    ///
    /// Fails when the connection is no longer writable.
    fn close(&mut self) -> Result<(), BoxError>;
}
