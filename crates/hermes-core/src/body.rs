//! Streaming body contracts.
//!
//! A [`BodyConsumer`] is the sink for an incoming streamed request body; a
//! [`BodyProducer`] is the source for an outgoing streamed response body.
//! Both are synchronous traits driven by the connection pipeline, which
//! guarantees that for any one instance the calls are strictly serialized.

use bytes::Bytes;

use crate::error::BoxError;
use crate::responder::HttpResponder;

/// Sink for the chunks of a streamed request body.
///
/// Returned by a streaming handler at invocation time. The pipeline then
/// calls [`chunk`](Self::chunk) zero or more times in on-wire order, followed
/// by exactly one of [`finished`](Self::finished) or
/// [`handle_error`](Self::handle_error). At most one consumer is active per
/// connection.
///
/// A consumer may write to the responder from `chunk` (for a streaming
/// response) or from `finished` (for a final response). It must not write
/// from `handle_error`; error responses are the exception handler's job.
pub trait BodyConsumer: Send + 'static {
    /// Receives one chunk of the request body.
    ///
    /// # Errors
    ///
    /// An error stops delivery: `handle_error` is invoked with the cause and
    /// no further chunks arrive.
    fn chunk(&mut self, data: Bytes, responder: &dyn HttpResponder) -> Result<(), BoxError>;

    /// Called once after the final chunk has been delivered.
    ///
    /// # Errors
    ///
    /// An error is routed to `handle_error` and then to the exception
    /// handler.
    fn finished(&mut self, responder: &dyn HttpResponder) -> Result<(), BoxError>;

    /// Terminal error notification: a parse failure, a premature disconnect,
    /// or an error returned by `chunk`/`finished`.
    ///
    /// Called exactly once, after which the consumer is dropped. Cleanup
    /// only; implementations must not write a response from here.
    fn handle_error(&mut self, cause: &BoxError);
}

/// Source for the chunks of a streamed response body.
///
/// Handed to [`HttpResponder::send_content`]. The framework pulls chunks
/// under transport backpressure; all calls for one producer are serialized.
pub trait BodyProducer: Send + 'static {
    /// Returns the next chunk, or an empty buffer to signal the end of the
    /// body.
    ///
    /// # Errors
    ///
    /// An error aborts the stream; `handle_error` is invoked with the cause.
    fn next_chunk(&mut self) -> Result<Bytes, BoxError>;

    /// Called once after the final chunk has been written out.
    ///
    /// # Errors
    ///
    /// An error is logged; the response is already complete at that point.
    fn finished(&mut self) -> Result<(), BoxError>;

    /// Terminal error notification: a transport write failure or an error
    /// returned by `next_chunk`.
    ///
    /// `cause` is `None` when the failure has no representable cause.
    fn handle_error(&mut self, cause: Option<&BoxError>);
}
