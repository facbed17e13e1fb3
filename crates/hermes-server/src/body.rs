//! The outgoing response body.
//!
//! One type covers all three framing modes the responder produces: a
//! fully-buffered body, a handler-driven chunk stream, and a
//! producer-driven stream. The channel-backed variants poll their
//! `tokio::sync::mpsc` receivers directly, so the type implements
//! [`http_body::Body`] without any stream adapters.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use tokio::sync::mpsc;

use hermes_core::BoxError;

enum BodyKind {
    /// The whole body, known up front. `None` once yielded.
    Full(Option<Bytes>),
    /// Handler-driven chunks; sender dropped (or `close`d) ends the body
    /// with a clean terminator.
    Chunked(mpsc::UnboundedReceiver<Bytes>),
    /// Producer-driven chunks under backpressure; an `Err` item aborts the
    /// connection instead of terminating cleanly.
    Producer(mpsc::Receiver<Result<Bytes, BoxError>>),
}

/// Body type for every response Hermes writes.
pub struct ResponseBody {
    kind: BodyKind,
}

impl ResponseBody {
    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::full(Bytes::new())
    }

    /// A fully-buffered body.
    #[must_use]
    pub fn full(data: Bytes) -> Self {
        Self {
            kind: BodyKind::Full(if data.is_empty() { None } else { Some(data) }),
        }
    }

    /// A handler-driven chunk stream.
    #[must_use]
    pub(crate) fn chunked(receiver: mpsc::UnboundedReceiver<Bytes>) -> Self {
        Self {
            kind: BodyKind::Chunked(receiver),
        }
    }

    /// A producer-driven chunk stream.
    #[must_use]
    pub(crate) fn producer(receiver: mpsc::Receiver<Result<Bytes, BoxError>>) -> Self {
        Self {
            kind: BodyKind::Producer(receiver),
        }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().kind {
            BodyKind::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            BodyKind::Chunked(rx) => match rx.poll_recv(cx) {
                Poll::Ready(Some(data)) => Poll::Ready(Some(Ok(Frame::data(data)))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
            BodyKind::Producer(rx) => match rx.poll_recv(cx) {
                Poll::Ready(Some(Ok(data))) => Poll::Ready(Some(Ok(Frame::data(data)))),
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.kind, BodyKind::Full(None))
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            BodyKind::Full(data) => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            _ => SizeHint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_full_body_yields_once() {
        let body = ResponseBody::full(Bytes::from_static(b"hello"));
        let collected = body.collect().await.expect("collect");
        assert_eq!(collected.to_bytes(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_empty_body_ends_immediately() {
        let body = ResponseBody::empty();
        assert!(body.is_end_stream());
        let collected = body.collect().await.expect("collect");
        assert!(collected.to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_chunked_body_ends_when_sender_drops() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Bytes::from_static(b"a")).expect("send");
        tx.send(Bytes::from_static(b"b")).expect("send");
        drop(tx);

        let body = ResponseBody::chunked(rx);
        let collected = body.collect().await.expect("collect");
        assert_eq!(collected.to_bytes(), Bytes::from_static(b"ab"));
    }

    #[tokio::test]
    async fn test_producer_error_aborts() {
        let (tx, rx) = mpsc::channel(1);
        tx.send(Err("boom".into())).await.expect("send");
        drop(tx);

        let body = ResponseBody::producer(rx);
        assert!(body.collect().await.is_err());
    }
}
