//! The framework error model.
//!
//! Routing and binding failures are ordinary values of [`HttpError`], never
//! panics: the router reports `NotFound`/`MethodNotAllowed`, the binder
//! reports `BadRequest`/`Internal`, and the connection pipeline translates
//! each kind into its wire status and log level.
//!
//! Handler and body-callback failures travel as [`BoxError`] so that a custom
//! [`ExceptionHandler`](crate::ExceptionHandler) can downcast to the concrete
//! error type it knows about.

use http::StatusCode;
use thiserror::Error;

/// Boxed error type used for handler and body-callback failures.
///
/// Using the trait object (rather than a closed enum) lets exception
/// handlers recover the concrete error with
/// [`Error::downcast_ref`](std::error::Error).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures produced by the framework itself.
///
/// Each variant maps to a fixed wire effect; see [`HttpError::status`].
/// `Disconnect` has no wire effect at all: it is only ever delivered to a
/// [`BodyConsumer`](crate::BodyConsumer) or
/// [`BodyProducer`](crate::BodyProducer) as the terminal error cause.
#[derive(Error, Debug)]
pub enum HttpError {
    /// No registered pattern matched the request path.
    #[error("Problem accessing: {uri}. Reason: Not Found")]
    NotFound {
        /// The request URI that failed to route.
        uri: String,
    },

    /// A pattern matched the path but none accepted the request method.
    #[error("Problem accessing: {uri}. Reason: Method Not Allowed")]
    MethodNotAllowed {
        /// The request URI that failed to route.
        uri: String,
    },

    /// A request parameter could not be decoded or coerced.
    #[error("Bad request: {message}")]
    BadRequest {
        /// What failed to parse.
        message: String,
    },

    /// A framework-side failure: misconfigured route, rewriter fault, or a
    /// handler invocation that could not run.
    #[error("{message}")]
    Internal {
        /// Description of the failure.
        message: String,
        /// The underlying cause, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// The aggregated request body exceeded the configured memory limit.
    #[error("Aggregated request body exceeds the configured limit of {limit} bytes")]
    OverLimit {
        /// The configured aggregation cap in bytes.
        limit: usize,
    },

    /// The client went away mid-stream. Never written to the wire.
    #[error("Connection closed: {message}")]
    Disconnect {
        /// Description of how the disconnect was observed.
        message: String,
    },
}

impl HttpError {
    /// Builds a `NotFound` for the given request URI.
    pub fn not_found(uri: impl Into<String>) -> Self {
        Self::NotFound { uri: uri.into() }
    }

    /// Builds a `MethodNotAllowed` for the given request URI.
    pub fn method_not_allowed(uri: impl Into<String>) -> Self {
        Self::MethodNotAllowed { uri: uri.into() }
    }

    /// Builds a `BadRequest` with the given message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Builds an `Internal` error with no underlying cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an `Internal` error wrapping a cause.
    pub fn internal_with_source(message: impl Into<String>, source: BoxError) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Builds a `Disconnect` with the given message.
    pub fn disconnect(message: impl Into<String>) -> Self {
        Self::Disconnect {
            message: message.into(),
        }
    }

    /// The wire status for this error, or `None` for `Disconnect`.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::MethodNotAllowed { .. } => Some(StatusCode::METHOD_NOT_ALLOWED),
            Self::BadRequest { .. } => Some(StatusCode::BAD_REQUEST),
            Self::Internal { .. } | Self::OverLimit { .. } => {
                Some(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Disconnect { .. } => None,
        }
    }

    /// Whether this error is the client's fault (400, 404, 405).
    ///
    /// User errors are logged at trace level; everything else logs at error
    /// level.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::MethodNotAllowed { .. } | Self::BadRequest { .. }
        )
    }
}
