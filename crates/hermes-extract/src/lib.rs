//! Parameter binding for Hermes.
//!
//! Turns the raw material of a matched request (group bindings, the query
//! string, the header map) into the typed argument vector a handler was
//! declared with. Binding walks the route's
//! [`ParamSpec`](hermes_core::ParamSpec)s in order and produces one
//! [`BoundValue`](hermes_core::BoundValue) each:
//!
//! - **Path** parameters are required; a capture name the pattern never
//!   bound is a server-side misconfiguration and fails the request with an
//!   internal server error. Values are percent-decoded before coercion.
//! - **Query** parameters take every value of the key from the decoded
//!   query string, falling back to the declared default, and finally to the
//!   target's neutral value (nothing for text, zero for integers, empty for
//!   collections).
//! - **Header** parameters take every value of the header in insertion
//!   order, duplicates preserved, with the same default fallback.
//!
//! Coercion failures are the client's fault (`BadRequest`); missing path
//! groups are the server's (`InternalServerError`).

mod binder;
mod coerce;
mod decode;

pub use binder::bind_args;
pub use coerce::{coerce, CoerceError};
pub use decode::{decode_component, query_values};
