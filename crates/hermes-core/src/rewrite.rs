//! Pre-routing URL rewriting.

use crate::error::BoxError;
use crate::request::HttpRequest;
use crate::responder::HttpResponder;

/// Rewrites the URL of an incoming request before routing.
///
/// The rewriter sees the request head (the body has not been read yet) and
/// updates the URI in place. It may also answer the request itself, a
/// redirect for instance, and stop further processing by returning
/// `Ok(false)`.
///
/// A rewriter that writes a response and then returns `Ok(true)` leaves the
/// connection in an unspecified state; rewriters should do one or the other.
/// Implementations must be safe for concurrent invocation.
pub trait UrlRewriter: Send + Sync + 'static {
    /// Rewrites `request`'s URI.
    ///
    /// Returns `Ok(true)` to continue processing with the (possibly
    /// updated) URI, or `Ok(false)` to stop after flushing whatever the
    /// rewriter wrote.
    ///
    /// # Errors
    ///
    /// An error fails the request with an internal server error.
    fn rewrite(
        &self,
        request: &mut HttpRequest,
        responder: &dyn HttpResponder,
    ) -> Result<bool, BoxError>;
}
