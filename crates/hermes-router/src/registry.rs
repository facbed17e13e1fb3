//! The resource registry: every registered endpoint, plus route resolution.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use thiserror::Error;

use hermes_core::{Dispatch, ExceptionHandler, HttpHandler, ParamSpec};

use crate::matcher::PathMatcher;
use crate::method_set::MethodSet;
use crate::pattern::{PathPattern, PatternError};

/// Fatal configuration errors detected while building the registry.
///
/// Registration failures abort service construction; nothing is deferred to
/// request time except a path parameter naming a capture the pattern does
/// not define (which the original treats as a request-time 500, and so do
/// we).
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The route's path template failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// The route declared no verbs.
    #[error("Route {path} declares no HTTP verbs")]
    EmptyVerbSet {
        /// The offending template.
        path: String,
    },

    /// The route declared a verb outside GET/POST/PUT/DELETE/HEAD/OPTIONS/PATCH.
    #[error("Route {path} declares unsupported verb {verb}")]
    UnsupportedVerb {
        /// The offending template.
        path: String,
        /// The verb that was rejected.
        verb: Method,
    },

    /// The route has no dispatch function attached.
    #[error("Route {path} has no dispatch function")]
    MissingDispatch {
        /// The offending template.
        path: String,
    },
}

/// Route resolution failure, as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    /// No pattern matched the path.
    NotFound,
    /// A pattern matched the path, but none accepted the verb.
    MethodNotAllowed,
}

/// One registered endpoint.
pub struct Resource {
    /// The full template (handler base path + route suffix).
    pub path: String,
    /// Accepted verbs.
    pub verbs: MethodSet,
    /// Parameter specs in handler-argument order.
    pub params: Vec<ParamSpec>,
    /// The dispatch function and its body-handling mode.
    pub dispatch: Dispatch,
    /// Exception handler consulted for this resource's failures.
    pub exception_handler: Arc<dyn ExceptionHandler>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .field("verbs", &self.verbs)
            .field("params", &self.params.len())
            .field("dispatch", &self.dispatch)
            .finish()
    }
}

/// A resolved route: the resource plus its group bindings.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The selected resource.
    pub resource: &'a Resource,
    /// Named capture → raw matched text (percent-decoded later, at binding).
    pub groups: HashMap<String, String>,
}

/// All registered resources, immutable after service start.
///
/// Built once by walking the handler set; `resolve` is the hot path and
/// takes no locks.
pub struct ResourceRegistry {
    matcher: PathMatcher<usize>,
    resources: Vec<Resource>,
}

impl ResourceRegistry {
    /// Builds the registry from the handler set.
    ///
    /// Every route of every handler becomes one [`Resource`]; the handler's
    /// base path is joined onto each route's suffix with exactly one slash
    /// at the boundary.
    ///
    /// # Errors
    ///
    /// Any [`RegistrationError`] aborts the build.
    pub fn build(
        handlers: &[Arc<dyn HttpHandler>],
        exception_handler: &Arc<dyn ExceptionHandler>,
    ) -> Result<Self, RegistrationError> {
        let mut matcher = PathMatcher::new();
        let mut resources = Vec::new();

        for handler in handlers {
            let base = handler.base_path().to_string();
            for route in handler.routes() {
                let (suffix, verb_list, params, dispatch) = route.into_parts();
                let path = join_paths(&base, &suffix);

                let mut verbs = MethodSet::empty();
                for verb in &verb_list {
                    if !verbs.insert(verb) {
                        return Err(RegistrationError::UnsupportedVerb {
                            path,
                            verb: verb.clone(),
                        });
                    }
                }
                if verbs.is_empty() {
                    return Err(RegistrationError::EmptyVerbSet { path });
                }

                let dispatch = dispatch.ok_or_else(|| RegistrationError::MissingDispatch {
                    path: path.clone(),
                })?;

                let pattern = PathPattern::compile(&path)?;
                matcher.insert(pattern, resources.len());
                resources.push(Resource {
                    path,
                    verbs,
                    params,
                    dispatch,
                    exception_handler: Arc::clone(exception_handler),
                });
            }
        }

        Ok(Self { matcher, resources })
    }

    /// Number of registered resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resolves a request to a resource.
    ///
    /// Candidates are ordered by the matcher's precedence rules; the first
    /// whose verb set contains `method` wins.
    ///
    /// # Errors
    ///
    /// `RouteError::NotFound` when no pattern matches the path,
    /// `RouteError::MethodNotAllowed` when patterns match but none accept
    /// the verb.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, RouteError> {
        let candidates = self.matcher.matches(path);
        if candidates.is_empty() {
            return Err(RouteError::NotFound);
        }

        for candidate in candidates {
            let resource = &self.resources[*candidate.value];
            if resource.verbs.contains(method) {
                return Ok(RouteMatch {
                    resource,
                    groups: candidate.groups,
                });
            }
        }

        Err(RouteError::MethodNotAllowed)
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("resources", &self.resources)
            .finish()
    }
}

/// Joins a handler base path and a route suffix with exactly one `/` at the
/// boundary, leaving every other slash (including doubled ones) untouched.
fn join_paths(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), suffix.starts_with('/')) {
        (true, true) => format!("{base}{}", &suffix[1..]),
        (false, false) => format!("{base}/{suffix}"),
        _ => format!("{base}{suffix}"),
    }
}
