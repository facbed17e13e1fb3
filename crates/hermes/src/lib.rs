//! # Hermes
//!
//! **HTTP/1.1 dispatch framework with declarative routes and streaming
//! bodies.**
//!
//! Hermes routes incoming requests to handler methods declared through
//! route metadata (verb set, templated path, parameter bindings) and owns
//! everything around the call: the accept loop, connection lifecycle,
//! request parsing, routing, parameter coercion, response framing and error
//! translation. Request and response bodies can be fully buffered or
//! streamed chunk by chunk in either direction under backpressure.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hermes::prelude::*;
//! use http::StatusCode;
//!
//! struct Greeter;
//!
//! impl HttpHandler for Greeter {
//!     fn base_path(&self) -> &str {
//!         "/api/v1"
//!     }
//!
//!     fn routes(&self) -> Vec<RouteSpec> {
//!         vec![RouteSpec::get("/greet/{name}")
//!             .path_param("name", TargetType::Text)
//!             .buffered(|_request, responder, args| {
//!                 let name = args.text(0).unwrap_or("world");
//!                 responder.send_string(StatusCode::OK, &format!("hello {name}"));
//!                 Ok(())
//!             })]
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = HttpService::builder()
//!         .set_host("127.0.0.1")
//!         .set_port(8080)
//!         .add_http_handler(Greeter)
//!         .build()?;
//!     let addr = service.start()?;
//!     println!("listening on {addr}");
//!     // ...
//!     service.stop()?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

// Re-export the member crates under stable names.
pub use hermes_core as core;
pub use hermes_extract as extract;
pub use hermes_router as router;
pub use hermes_server as server;

/// Convenient imports for service and handler authors.
pub mod prelude {
    pub use hermes_core::{
        default_handle, Args, BodyConsumer, BodyProducer, BoxError, ChunkResponder,
        DefaultExceptionHandler, Dispatch, ExceptionHandler, HandlerContext, HttpError,
        HttpHandler, HttpRequest, HttpResponder, ParamSource, ParamSpec, PipelineStage, RouteSpec,
        TargetType, UrlRewriter,
    };
    pub use hermes_server::{HttpService, HttpServiceBuilder, ServiceState, SslConfig};
}
