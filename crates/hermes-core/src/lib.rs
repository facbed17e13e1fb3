//! Core contracts for the Hermes HTTP dispatch framework.
//!
//! This crate defines everything a handler author sees: the request and
//! responder surfaces, the streaming body contracts, route metadata, and the
//! error model. It deliberately contains no I/O; the server crate owns the
//! sockets and drives these contracts.
//!
//! # Overview
//!
//! A service is assembled from [`HttpHandler`] implementations. Each handler
//! contributes a base path and a set of [`RouteSpec`]s describing the verbs,
//! the templated path, the parameter bindings and the dispatch function for
//! one endpoint:
//!
//! ```rust
//! use hermes_core::{HttpHandler, RouteSpec, TargetType};
//! use http::StatusCode;
//!
//! struct PingHandler;
//!
//! impl HttpHandler for PingHandler {
//!     fn base_path(&self) -> &str {
//!         "/ops/v1"
//!     }
//!
//!     fn routes(&self) -> Vec<RouteSpec> {
//!         vec![RouteSpec::get("/ping")
//!             .query_param("echo", TargetType::Text)
//!             .buffered(|_request, responder, args| {
//!                 let echo = args.text(0).unwrap_or("pong");
//!                 responder.send_string(StatusCode::OK, echo);
//!                 Ok(())
//!             })]
//!     }
//! }
//! ```
//!
//! Endpoints that need the request body chunk-by-chunk return a
//! [`BodyConsumer`] instead; endpoints that stream a response hand a
//! [`BodyProducer`] to the responder. Both contracts are plain synchronous
//! traits; the server feeds them from its own event loop and guarantees the
//! calls for one connection never overlap.

mod body;
mod error;
mod exception;
mod handler;
mod metadata;
mod request;
mod responder;
mod rewrite;
mod stage;

pub use body::{BodyConsumer, BodyProducer};
pub use error::{BoxError, HttpError};
pub use exception::{default_handle, DefaultExceptionHandler, ExceptionHandler};
pub use handler::{HandlerContext, HttpHandler};
pub use metadata::{
    Args, BoundValue, BufferedFn, Dispatch, ParamSource, ParamSpec, RouteSpec, StreamingFn,
    TargetType,
};
pub use request::{is_keep_alive, HttpRequest};
pub use responder::{ChunkResponder, HttpResponder};
pub use rewrite::UrlRewriter;
pub use stage::PipelineStage;
