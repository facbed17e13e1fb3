//! The parameter binder.

use std::collections::HashMap;

use http::{HeaderMap, Uri};

use hermes_core::{Args, BoundValue, HttpError, ParamSource, ParamSpec};

use crate::coerce::coerce;
use crate::decode::{decode_component, query_values};

/// Binds a matched request's raw values to the route's declared parameters.
///
/// Specs are processed in order; the resulting [`Args`] indexes line up with
/// the route's parameter declarations.
///
/// # Errors
///
/// - `HttpError::Internal` when a path spec names a capture the pattern did
///   not bind (a registration mistake, surfaced at request time exactly
///   like the original).
/// - `HttpError::BadRequest` when decoding or coercion fails.
pub fn bind_args(
    specs: &[ParamSpec],
    groups: &HashMap<String, String>,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<Args, HttpError> {
    let mut values = Vec::with_capacity(specs.len());
    for spec in specs {
        let bound = match spec.source {
            ParamSource::Path => bind_path(spec, groups)?,
            ParamSource::Query => bind_query(spec, uri)?,
            ParamSource::Header => bind_header(spec, headers)?,
        };
        values.push(bound);
    }
    Ok(Args::new(values))
}

fn bind_path(spec: &ParamSpec, groups: &HashMap<String, String>) -> Result<BoundValue, HttpError> {
    let raw = groups.get(&spec.name).ok_or_else(|| {
        HttpError::internal(format!(
            "Could not resolve value for parameter {}",
            spec.name
        ))
    })?;
    let decoded = decode_component(raw).map_err(HttpError::bad_request)?;
    coerce_one(spec, &[decoded])
}

fn bind_query(spec: &ParamSpec, uri: &Uri) -> Result<BoundValue, HttpError> {
    let query = uri.query().unwrap_or("");
    let mut values = query_values(query, &spec.name);
    if values.is_empty() {
        values = default_values(spec);
    }
    coerce_one(spec, &values)
}

fn bind_header(spec: &ParamSpec, headers: &HeaderMap) -> Result<BoundValue, HttpError> {
    let mut values = Vec::new();
    for value in headers.get_all(spec.name.as_str()) {
        let text = value.to_str().map_err(|_| {
            HttpError::bad_request(format!("Header {} is not valid UTF-8", spec.name))
        })?;
        values.push(text.to_string());
    }
    if values.is_empty() {
        values = default_values(spec);
    }
    coerce_one(spec, &values)
}

/// The declared default as a singleton list, or an empty list without one.
fn default_values(spec: &ParamSpec) -> Vec<String> {
    spec.default.clone().into_iter().collect()
}

fn coerce_one(spec: &ParamSpec, values: &[String]) -> Result<BoundValue, HttpError> {
    coerce(spec.target, values).map_err(|e| HttpError::bad_request(e.to_string()))
}
