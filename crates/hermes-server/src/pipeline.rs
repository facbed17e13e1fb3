//! The per-request pipeline.
//!
//! Every parsed request head runs through the same stations: extra pipeline
//! stages, the optional URL rewriter, route resolution, parameter binding,
//! and then one of two pre-wired body paths chosen by the matched handler's
//! dispatch mode: aggregate-then-invoke for buffered handlers,
//! invoke-then-pump for streaming handlers. The wire codec (hyper) flushes
//! response N before parsing request N+1, so per-connection callbacks never
//! overlap.
//!
//! Failures race through a one-shot [`ErrorLatch`]: of the possible failure
//! sources (parser, handler invocation, consumer callback) only the first
//! reaches the exception handler and produces a response; the rest are
//! logged at trace level.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Request, Response};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use hermes_core::{
    default_handle, is_keep_alive, BodyConsumer, BoxError, Dispatch, ExceptionHandler, HttpError,
    HttpRequest, HttpResponder, PipelineStage, UrlRewriter,
};
use hermes_extract::bind_args;
use hermes_router::{ResourceRegistry, RouteError};

use crate::body::ResponseBody;
use crate::responder::BasicResponder;

/// Immutable per-service state shared by every connection.
pub(crate) struct PipelineShared {
    pub(crate) registry: ResourceRegistry,
    pub(crate) rewriter: Option<Arc<dyn UrlRewriter>>,
    pub(crate) stages: Vec<Arc<dyn PipelineStage>>,
    pub(crate) chunk_limit: usize,
    /// Run handler and consumer callbacks on the blocking pool.
    pub(crate) offload: bool,
}

/// One-shot guard: only the first failure of a request lifecycle produces a
/// user-visible response.
#[derive(Clone, Default)]
pub(crate) struct ErrorLatch(Arc<AtomicBool>);

impl ErrorLatch {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Trips the latch; `true` only for the first caller.
    pub(crate) fn trip(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_tripped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handles one request end-to-end.
///
/// Returning `Err` aborts the connection without a response; that is the
/// deliberate outcome for broken inbound streams and for handlers that
/// complete without ever writing.
pub(crate) async fn handle(
    shared: Arc<PipelineShared>,
    request: Request<Incoming>,
) -> Result<Response<ResponseBody>, BoxError> {
    let (mut parts, incoming) = request.into_parts();
    for stage in &shared.stages {
        stage.on_request(&mut parts);
    }

    let keep_alive = is_keep_alive(parts.version, &parts.headers);
    let (reply_tx, reply_rx) = oneshot::channel();
    let responder = Arc::new(BasicResponder::new(reply_tx, keep_alive, Handle::current()));
    let latch = ErrorLatch::new();
    let mut head = HttpRequest::from_parts(parts, Bytes::new());

    // Pre-routing URL rewrite.
    if let Some(rewriter) = &shared.rewriter {
        match rewriter.rewrite(&mut head, responder.as_ref()) {
            Ok(true) => {}
            Ok(false) => {
                drop(responder);
                return match reply_rx.await {
                    Ok(response) => Ok(finalize(&shared, response, !keep_alive)),
                    Err(_) => {
                        let err = HttpError::internal(
                            "URL rewriter stopped the request without writing a response",
                        );
                        Ok(direct_error(&shared, &err))
                    }
                };
            }
            Err(cause) => {
                let err = HttpError::internal_with_source(
                    format!("Error in executing request: {} {}", head.method(), head.uri()),
                    cause,
                );
                return Ok(direct_error(&shared, &err));
            }
        }
    }

    // Route resolution.
    let uri_text = head.uri().to_string();
    let path = head.uri().path().to_string();
    let (dispatch, specs, exception_handler, groups) =
        match shared.registry.resolve(head.method(), &path) {
            Ok(matched) => (
                matched.resource.dispatch.clone(),
                matched.resource.params.clone(),
                Arc::clone(&matched.resource.exception_handler),
                matched.groups,
            ),
            Err(RouteError::NotFound) => {
                return Ok(direct_error(&shared, &HttpError::not_found(uri_text)));
            }
            Err(RouteError::MethodNotAllowed) => {
                return Ok(direct_error(
                    &shared,
                    &HttpError::method_not_allowed(uri_text),
                ));
            }
        };

    // Parameter binding.
    let args = match bind_args(&specs, &groups, head.uri(), head.headers()) {
        Ok(args) => args,
        Err(err) => return Ok(direct_error(&shared, &err)),
    };

    let offload = shared.offload;
    match dispatch {
        Dispatch::Buffered(dispatch_fn) => {
            let body = match aggregate(incoming, shared.chunk_limit).await {
                Ok(body) => body,
                Err(err) => return Ok(direct_error(&shared, &err)),
            };
            let (parts, _) = head.into_parts();
            let request = HttpRequest::from_parts(parts, body);
            let request_on_panic = clone_request(&request);
            let invoke_responder = Arc::clone(&responder);
            let error_responder = Arc::clone(&responder);
            let latch = latch.clone();
            drop(responder);

            // The invocation runs concurrently with the response await so a
            // handler can stream chunks while it is still executing.
            tokio::spawn(async move {
                let outcome = call_user(offload, move || {
                    let result =
                        dispatch_fn(&request, invoke_responder.as_ref() as &dyn HttpResponder, &args);
                    (request, result)
                })
                .await;
                match outcome {
                    Ok((_, Ok(()))) => {}
                    Ok((request, Err(cause))) => dispatch_exception(
                        &latch,
                        exception_handler.as_ref(),
                        &request,
                        error_responder.as_ref(),
                        cause,
                    ),
                    Err(cause) => dispatch_exception(
                        &latch,
                        exception_handler.as_ref(),
                        &request_on_panic,
                        error_responder.as_ref(),
                        cause,
                    ),
                }
            });
        }
        Dispatch::Streaming(dispatch_fn) => {
            let request_on_panic = clone_request(&head);
            let invoke_responder = Arc::clone(&responder);
            let outcome = call_user(offload, move || {
                let result =
                    dispatch_fn(&head, invoke_responder.as_ref() as &dyn HttpResponder, &args);
                (head, result)
            })
            .await;

            match outcome {
                Ok((head, Ok(Some(consumer)))) => {
                    let pump_responder = Arc::clone(&responder);
                    let latch = latch.clone();
                    drop(responder);
                    tokio::spawn(pump_body(
                        incoming,
                        consumer,
                        pump_responder,
                        latch,
                        exception_handler,
                        head,
                        offload,
                    ));
                }
                Ok((_, Ok(None))) => {
                    // Immediate rejection: the handler has already written
                    // its response. Drain the body undelivered and close.
                    drop(responder);
                    tokio::spawn(drain(incoming));
                    return finish(&shared, reply_rx, keep_alive, &latch, true).await;
                }
                Ok((head, Err(cause))) => {
                    dispatch_exception(
                        &latch,
                        exception_handler.as_ref(),
                        &head,
                        responder.as_ref(),
                        cause,
                    );
                    drop(responder);
                }
                Err(cause) => {
                    dispatch_exception(
                        &latch,
                        exception_handler.as_ref(),
                        &request_on_panic,
                        responder.as_ref(),
                        cause,
                    );
                    drop(responder);
                }
            }
        }
    }

    finish(&shared, reply_rx, keep_alive, &latch, false).await
}

/// Aggregates an incoming body up to `limit` bytes.
async fn aggregate(mut incoming: Incoming, limit: usize) -> Result<Bytes, HttpError> {
    let mut buffer = BytesMut::new();
    loop {
        match incoming.frame().await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    if buffer.len() + data.len() > limit {
                        return Err(HttpError::OverLimit { limit });
                    }
                    buffer.extend_from_slice(&data);
                }
            }
            Some(Err(e)) => {
                return Err(HttpError::internal_with_source(
                    "Failed to read request body",
                    Box::new(e),
                ));
            }
            None => return Ok(buffer.freeze()),
        }
    }
}

/// Feeds an incoming body into a consumer, chunk by chunk.
///
/// Exactly one terminal callback is delivered, enforced by
/// [`ConsumerGuard`] rather than left to consumer implementers.
async fn pump_body(
    mut incoming: Incoming,
    consumer: Box<dyn BodyConsumer>,
    responder: Arc<BasicResponder>,
    latch: ErrorLatch,
    exception_handler: Arc<dyn ExceptionHandler>,
    request: HttpRequest,
    offload: bool,
) {
    let mut guard = ConsumerGuard::new(consumer);
    loop {
        match incoming.frame().await {
            Some(Ok(frame)) => {
                let Ok(data) = frame.into_data() else {
                    // Trailer frames carry no body bytes.
                    continue;
                };
                if data.is_empty() {
                    continue;
                }
                let chunk_responder = Arc::clone(&responder);
                let mut moved = guard;
                let outcome = call_user(offload, move || {
                    let result = moved.chunk(data, chunk_responder.as_ref() as &dyn HttpResponder);
                    (moved, result)
                })
                .await;
                match outcome {
                    Ok((returned, Ok(()))) => guard = returned,
                    Ok((mut returned, Err(cause))) => {
                        returned.error(&cause);
                        dispatch_exception(
                            &latch,
                            exception_handler.as_ref(),
                            &request,
                            responder.as_ref(),
                            cause,
                        );
                        return;
                    }
                    Err(cause) => {
                        // The consumer was lost to a panic; its guard
                        // delivered the terminal callback during unwind.
                        dispatch_exception(
                            &latch,
                            exception_handler.as_ref(),
                            &request,
                            responder.as_ref(),
                            cause,
                        );
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                // Parse error or client disconnect: terminal error to the
                // consumer, nothing further on the wire from our side.
                let cause: BoxError = Box::new(HttpError::disconnect(e.to_string()));
                guard.error(&cause);
                latch.trip();
                tracing::trace!(error = %cause, "Request body stream failed");
                return;
            }
            None => {
                let finish_responder = Arc::clone(&responder);
                let mut moved = guard;
                let outcome = call_user(offload, move || {
                    let result = moved.finished(finish_responder.as_ref() as &dyn HttpResponder);
                    (moved, result)
                })
                .await;
                match outcome {
                    Ok((_, Ok(()))) => {}
                    Ok((mut returned, Err(cause))) => {
                        returned.error(&cause);
                        dispatch_exception(
                            &latch,
                            exception_handler.as_ref(),
                            &request,
                            responder.as_ref(),
                            cause,
                        );
                    }
                    Err(cause) => {
                        dispatch_exception(
                            &latch,
                            exception_handler.as_ref(),
                            &request,
                            responder.as_ref(),
                            cause,
                        );
                    }
                }
                return;
            }
        }
    }
}

/// Reads an incoming body to its end, discarding everything.
async fn drain(mut incoming: Incoming) {
    while let Some(result) = incoming.frame().await {
        if result.is_err() {
            break;
        }
    }
}

/// Runs a user callback inline or on the blocking pool.
///
/// A panic in an offloaded callback surfaces as an `Err` here instead of
/// tearing down the connection task.
async fn call_user<R>(
    offload: bool,
    task: impl FnOnce() -> R + Send + 'static,
) -> Result<R, BoxError>
where
    R: Send + 'static,
{
    if offload {
        match tokio::task::spawn_blocking(task).await {
            Ok(value) => Ok(value),
            Err(e) => Err(Box::new(HttpError::internal(format!(
                "Handler execution failed: {e}"
            )))),
        }
    } else {
        Ok(task())
    }
}

/// Routes a failure through the latch and the exception handler.
pub(crate) fn dispatch_exception(
    latch: &ErrorLatch,
    exception_handler: &dyn ExceptionHandler,
    request: &HttpRequest,
    responder: &BasicResponder,
    cause: BoxError,
) {
    if !latch.trip() {
        tracing::trace!(error = %cause, "Exception after error latch; dropping");
        return;
    }
    tracing::error!(error = %cause, "Exception caught while processing request");

    if let Err(handler_error) = exception_handler.handle(&cause, request, responder) {
        tracing::error!(
            error = %handler_error,
            "Exception handler failed; falling back to default translation"
        );
        default_handle(&cause, request, responder);
        return;
    }
    // A handler that wrote nothing falls through to the default.
    if responder.is_fresh() {
        default_handle(&cause, request, responder);
    }
}

/// Enforces the consumer's terminal contract: at most one of
/// `finished`/`handle_error`, with a disconnect delivered if the pump is
/// dropped mid-stream (runtime shutdown).
struct ConsumerGuard {
    consumer: Option<Box<dyn BodyConsumer>>,
}

impl ConsumerGuard {
    fn new(consumer: Box<dyn BodyConsumer>) -> Self {
        Self {
            consumer: Some(consumer),
        }
    }

    fn chunk(&mut self, data: Bytes, responder: &dyn HttpResponder) -> Result<(), BoxError> {
        match &mut self.consumer {
            Some(consumer) => consumer.chunk(data, responder),
            None => Ok(()),
        }
    }

    /// Delivers `finished`; on success the consumer is released. On failure
    /// it is retained so [`error`](Self::error) reaches the same consumer.
    fn finished(&mut self, responder: &dyn HttpResponder) -> Result<(), BoxError> {
        match &mut self.consumer {
            Some(consumer) => {
                let result = consumer.finished(responder);
                if result.is_ok() {
                    self.consumer = None;
                }
                result
            }
            None => Ok(()),
        }
    }

    fn error(&mut self, cause: &BoxError) {
        if let Some(mut consumer) = self.consumer.take() {
            consumer.handle_error(cause);
        }
    }
}

impl Drop for ConsumerGuard {
    fn drop(&mut self) {
        if self.consumer.is_some() && !std::thread::panicking() {
            let cause: BoxError = Box::new(HttpError::disconnect(
                "connection closed before the body completed",
            ));
            self.error(&cause);
        }
    }
}

/// Awaits the response written through the responder and finalizes it.
async fn finish(
    shared: &PipelineShared,
    reply_rx: oneshot::Receiver<Response<ResponseBody>>,
    keep_alive: bool,
    latch: &ErrorLatch,
    force_close: bool,
) -> Result<Response<ResponseBody>, BoxError> {
    match reply_rx.await {
        Ok(response) => {
            let close = force_close || latch.is_tripped() || !keep_alive;
            Ok(finalize(shared, response, close))
        }
        Err(_) => {
            tracing::debug!("Request ended without a response; closing connection");
            Err(Box::new(HttpError::internal("request ended without a response")) as BoxError)
        }
    }
}

/// Applies response stages and settles the `Connection` header.
fn finalize(
    shared: &PipelineShared,
    response: Response<ResponseBody>,
    close: bool,
) -> Response<ResponseBody> {
    let (mut parts, body) = response.into_parts();
    for stage in &shared.stages {
        stage.on_response(&mut parts);
    }
    if !parts.headers.contains_key(CONNECTION) {
        let value = if close { "close" } else { "keep-alive" };
        parts
            .headers
            .insert(CONNECTION, HeaderValue::from_static(value));
    }
    Response::from_parts(parts, body)
}

/// Logs and finalizes a framework-side error response; these always close
/// the connection.
fn direct_error(shared: &PipelineShared, err: &HttpError) -> Response<ResponseBody> {
    if err.is_user_error() {
        tracing::trace!("{err}");
    } else {
        tracing::error!("{err}");
    }
    finalize(shared, error_response(err), true)
}

/// Builds the plain-text wire form of a framework error.
fn error_response(err: &HttpError) -> Response<ResponseBody> {
    let status = err
        .status()
        .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    let message = err.to_string();
    let data = Bytes::from(message.into_bytes());
    let mut response = Response::new(ResponseBody::full(data.clone()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
    response
}

/// Manual head clone; `http::Request` itself is not `Clone`, and the
/// zero-copy `Bytes` body makes this cheap.
fn clone_request(request: &HttpRequest) -> HttpRequest {
    let mut clone = HttpRequest::new(request.body().clone());
    *clone.method_mut() = request.method().clone();
    *clone.uri_mut() = request.uri().clone();
    *clone.version_mut() = request.version();
    *clone.headers_mut() = request.headers().clone();
    clone
}
