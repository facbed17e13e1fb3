//! Route metadata: the declarative description of one endpoint.
//!
//! A [`RouteSpec`] is the framework's replacement for annotation-driven
//! registration: the handler author states the verb set, the templated path
//! and one [`ParamSpec`] per handler argument, then attaches the dispatch
//! function. The first two logical positions of every handler, the request
//! and the responder, are reserved and never described by a `ParamSpec`;
//! argument index 0 is the first *bound* parameter.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::{RouteSpec, TargetType};
//! use http::{Method, StatusCode};
//!
//! let route = RouteSpec::get("/tweets/{id}")
//!     .verb(Method::PUT)
//!     .path_param("id", TargetType::Text)
//!     .buffered(|_request, responder, args| {
//!         let id = args.text(0).unwrap_or_default();
//!         responder.send_string(StatusCode::OK, id);
//!         Ok(())
//!     });
//!
//! assert_eq!(route.path(), "/tweets/{id}");
//! assert_eq!(route.verbs(), [Method::GET, Method::PUT]);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::body::BodyConsumer;
use crate::error::BoxError;
use crate::request::HttpRequest;
use crate::responder::HttpResponder;

/// Where a bound parameter's raw value comes from.
///
/// Exactly one source per parameter, by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// A named capture from the matched path pattern.
    Path,
    /// All values of one key in the decoded query string.
    Query,
    /// All values of one request header, in insertion order.
    Header,
}

/// The type a parameter's raw values are coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    /// A textual scalar; absent binds nothing (`None`).
    Text,
    /// An integer scalar; absent binds `0`.
    Int,
    /// Textual values in arrival order.
    TextList,
    /// Integer values in arrival order.
    IntList,
    /// Deduplicated textual values in lexicographic order.
    TextSortedSet,
    /// Deduplicated integer values in numeric order.
    IntSortedSet,
    /// The raw values, untyped and untouched.
    Raw,
}

/// Declares one bound handler parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Where the raw value comes from.
    pub source: ParamSource,
    /// The capture, query key, or header name.
    pub name: String,
    /// The coercion target.
    pub target: TargetType,
    /// Declared default: a single textual value, wrapped into a singleton
    /// list before coercion for collection targets.
    pub default: Option<String>,
}

impl ParamSpec {
    /// Declares a path parameter.
    pub fn path(name: impl Into<String>, target: TargetType) -> Self {
        Self {
            source: ParamSource::Path,
            name: name.into(),
            target,
            default: None,
        }
    }

    /// Declares a query parameter.
    pub fn query(name: impl Into<String>, target: TargetType) -> Self {
        Self {
            source: ParamSource::Query,
            name: name.into(),
            target,
            default: None,
        }
    }

    /// Declares a header parameter.
    pub fn header(name: impl Into<String>, target: TargetType) -> Self {
        Self {
            source: ParamSource::Header,
            name: name.into(),
            target,
            default: None,
        }
    }

    /// Attaches a default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One coerced argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundValue {
    /// Textual scalar; `None` when the parameter was absent.
    Text(Option<String>),
    /// Integer scalar; `0` when the parameter was absent.
    Int(i64),
    /// Textual values in arrival order.
    TextList(Vec<String>),
    /// Integer values in arrival order.
    IntList(Vec<i64>),
    /// Deduplicated, lexicographically ordered textual values.
    TextSortedSet(BTreeSet<String>),
    /// Deduplicated, numerically ordered integer values.
    IntSortedSet(BTreeSet<i64>),
    /// Raw values, untouched.
    Raw(Vec<String>),
}

/// The bound argument vector for one invocation.
///
/// Indexes follow the order of the route's [`ParamSpec`]s. The typed
/// accessors are lenient: a type mismatch reads as the target's neutral
/// value rather than panicking inside a handler.
#[derive(Debug, Clone, Default)]
pub struct Args(Vec<BoundValue>);

const EMPTY_STRINGS: &[String] = &[];
const EMPTY_INTS: &[i64] = &[];

impl Args {
    /// Wraps a coerced argument vector.
    #[must_use]
    pub fn new(values: Vec<BoundValue>) -> Self {
        Self(values)
    }

    /// Number of bound arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the route declared no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw bound value at `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&BoundValue> {
        self.0.get(idx)
    }

    /// Textual scalar at `idx`, `None` when absent or not textual.
    #[must_use]
    pub fn text(&self, idx: usize) -> Option<&str> {
        match self.0.get(idx) {
            Some(BoundValue::Text(v)) => v.as_deref(),
            _ => None,
        }
    }

    /// Integer scalar at `idx`; `0` when absent or not an integer.
    #[must_use]
    pub fn int(&self, idx: usize) -> i64 {
        match self.0.get(idx) {
            Some(BoundValue::Int(v)) => *v,
            _ => 0,
        }
    }

    /// Ordered textual values at `idx`.
    #[must_use]
    pub fn text_list(&self, idx: usize) -> &[String] {
        match self.0.get(idx) {
            Some(BoundValue::TextList(v)) | Some(BoundValue::Raw(v)) => v,
            _ => EMPTY_STRINGS,
        }
    }

    /// Ordered integer values at `idx`.
    #[must_use]
    pub fn int_list(&self, idx: usize) -> &[i64] {
        match self.0.get(idx) {
            Some(BoundValue::IntList(v)) => v,
            _ => EMPTY_INTS,
        }
    }

    /// Sorted, deduplicated textual values at `idx`.
    #[must_use]
    pub fn text_set(&self, idx: usize) -> Option<&BTreeSet<String>> {
        match self.0.get(idx) {
            Some(BoundValue::TextSortedSet(v)) => Some(v),
            _ => None,
        }
    }

    /// Sorted, deduplicated integer values at `idx`.
    #[must_use]
    pub fn int_set(&self, idx: usize) -> Option<&BTreeSet<i64>> {
        match self.0.get(idx) {
            Some(BoundValue::IntSortedSet(v)) => Some(v),
            _ => None,
        }
    }
}

/// Dispatch function for a handler that receives the fully-buffered request.
pub type BufferedFn =
    Arc<dyn Fn(&HttpRequest, &dyn HttpResponder, &Args) -> Result<(), BoxError> + Send + Sync>;

/// Dispatch function for a streaming handler.
///
/// Invoked with the request head only. Returning `Ok(None)` signals
/// immediate rejection: the handler must already have written a response,
/// and the incoming body is drained without delivering anything.
pub type StreamingFn = Arc<
    dyn Fn(&HttpRequest, &dyn HttpResponder, &Args) -> Result<Option<Box<dyn BodyConsumer>>, BoxError>
        + Send
        + Sync,
>;

/// How the endpoint consumes the request body.
#[derive(Clone)]
pub enum Dispatch {
    /// The body is aggregated (subject to the configured cap) before a
    /// single invocation.
    Buffered(BufferedFn),
    /// The handler is invoked on the request head and returns a
    /// [`BodyConsumer`] fed chunk by chunk.
    Streaming(StreamingFn),
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(_) => f.write_str("Dispatch::Buffered"),
            Self::Streaming(_) => f.write_str("Dispatch::Streaming"),
        }
    }
}

/// The declarative description of one endpoint.
#[derive(Clone)]
pub struct RouteSpec {
    path: String,
    verbs: Vec<Method>,
    params: Vec<ParamSpec>,
    dispatch: Option<Dispatch>,
}

impl RouteSpec {
    /// Starts a route with no verbs; add at least one with
    /// [`verb`](Self::verb).
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            verbs: Vec::new(),
            params: Vec::new(),
            dispatch: None,
        }
    }

    /// Starts a GET route.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::GET)
    }

    /// Starts a POST route.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::POST)
    }

    /// Starts a PUT route.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::PUT)
    }

    /// Starts a DELETE route.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(path).verb(Method::DELETE)
    }

    /// Adds a verb to the route's set.
    #[must_use]
    pub fn verb(mut self, method: Method) -> Self {
        if !self.verbs.contains(&method) {
            self.verbs.push(method);
        }
        self
    }

    /// Appends a parameter spec.
    #[must_use]
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Appends a path parameter.
    #[must_use]
    pub fn path_param(self, name: impl Into<String>, target: TargetType) -> Self {
        self.param(ParamSpec::path(name, target))
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query_param(self, name: impl Into<String>, target: TargetType) -> Self {
        self.param(ParamSpec::query(name, target))
    }

    /// Appends a query parameter with a default.
    #[must_use]
    pub fn query_param_with_default(
        self,
        name: impl Into<String>,
        target: TargetType,
        default: impl Into<String>,
    ) -> Self {
        self.param(ParamSpec::query(name, target).with_default(default))
    }

    /// Appends a header parameter.
    #[must_use]
    pub fn header_param(self, name: impl Into<String>, target: TargetType) -> Self {
        self.param(ParamSpec::header(name, target))
    }

    /// Appends a header parameter with a default.
    #[must_use]
    pub fn header_param_with_default(
        self,
        name: impl Into<String>,
        target: TargetType,
        default: impl Into<String>,
    ) -> Self {
        self.param(ParamSpec::header(name, target).with_default(default))
    }

    /// Attaches a buffered dispatch function.
    #[must_use]
    pub fn buffered<F>(mut self, f: F) -> Self
    where
        F: Fn(&HttpRequest, &dyn HttpResponder, &Args) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.dispatch = Some(Dispatch::Buffered(Arc::new(f)));
        self
    }

    /// Attaches a streaming dispatch function.
    #[must_use]
    pub fn streaming<F>(mut self, f: F) -> Self
    where
        F: Fn(
                &HttpRequest,
                &dyn HttpResponder,
                &Args,
            ) -> Result<Option<Box<dyn BodyConsumer>>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.dispatch = Some(Dispatch::Streaming(Arc::new(f)));
        self
    }

    /// The templated path suffix.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The declared verb set, in declaration order.
    #[must_use]
    pub fn verbs(&self) -> &[Method] {
        &self.verbs
    }

    /// The declared parameter specs, in argument order.
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Decomposes the spec for registration.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Method>, Vec<ParamSpec>, Option<Dispatch>) {
        (self.path, self.verbs, self.params, self.dispatch)
    }
}

impl fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSpec")
            .field("path", &self.path)
            .field("verbs", &self.verbs)
            .field("params", &self.params.len())
            .field("dispatch", &self.dispatch)
            .finish()
    }
}
