//! Extra processing stages around each request/response exchange.

/// Escape hatch for injecting processing around the framework's pipeline.
///
/// Stages registered through the service builder run in registration order:
/// `on_request` before URL rewriting and routing, `on_response` after the
/// response head is finalized and before it reaches the wire codec.
///
/// Implementations must be safe for concurrent invocation; the framework
/// performs no locking around them.
pub trait PipelineStage: Send + Sync + 'static {
    /// Observes or mutates the request head before routing.
    fn on_request(&self, _head: &mut http::request::Parts) {}

    /// Observes or mutates the response head before it is written.
    fn on_response(&self, _head: &mut http::response::Parts) {}
}
