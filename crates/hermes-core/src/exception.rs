//! Translation of handler failures into responses.

use http::StatusCode;

use crate::error::BoxError;
use crate::request::HttpRequest;
use crate::responder::HttpResponder;

/// Translates an error thrown by a handler or body callback into a response.
///
/// The framework consults the exception handler exactly once per request
/// lifecycle (the first failure wins; later ones are only logged). If the
/// handler returns without having written a response, or returns an error
/// itself, the default translation runs as a final fallback.
///
/// Implementations must be safe for concurrent invocation; the framework
/// performs no locking around them.
///
/// # Example
///
/// ```rust
/// use hermes_core::{default_handle, BoxError, ExceptionHandler, HttpRequest, HttpResponder};
/// use http::StatusCode;
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("redirect elsewhere")]
/// struct SeeOther;
///
/// struct CustomHandler;
///
/// impl ExceptionHandler for CustomHandler {
///     fn handle(
///         &self,
///         cause: &BoxError,
///         request: &HttpRequest,
///         responder: &dyn HttpResponder,
///     ) -> Result<(), BoxError> {
///         if cause.downcast_ref::<SeeOther>().is_some() {
///             responder.send_status(StatusCode::SEE_OTHER);
///             Ok(())
///         } else {
///             default_handle(cause, request, responder);
///             Ok(())
///         }
///     }
/// }
/// ```
pub trait ExceptionHandler: Send + Sync + 'static {
    /// Translates `cause` into a response.
    ///
    /// # Errors
    ///
    /// Returning an error makes the framework fall back to
    /// [`default_handle`].
    fn handle(
        &self,
        cause: &BoxError,
        request: &HttpRequest,
        responder: &dyn HttpResponder,
    ) -> Result<(), BoxError> {
        default_handle(cause, request, responder);
        Ok(())
    }
}

/// The stock translation: a 500 with the cause's message.
pub fn default_handle(cause: &BoxError, _request: &HttpRequest, responder: &dyn HttpResponder) {
    responder.send_string(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("Exception encountered while processing request : {cause}"),
    );
}

/// Exception handler that always applies the default translation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExceptionHandler;

impl ExceptionHandler for DefaultExceptionHandler {}
