//! Handler declaration surface.

use crate::metadata::RouteSpec;

/// Context passed to handler lifecycle hooks.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    service_name: String,
}

impl HandlerContext {
    /// Creates a context for the named service.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Name of the service this handler is registered with.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

/// A group of related endpoints.
///
/// Implementations contribute a base path and the [`RouteSpec`]s mounted
/// under it. Registration walks every handler once at service build time;
/// the resulting registry is immutable while the service runs.
///
/// `init` runs before the service starts accepting connections and
/// `destroy` runs during shutdown, both in registration order.
pub trait HttpHandler: Send + Sync + 'static {
    /// Path prefix for every route of this handler.
    fn base_path(&self) -> &str {
        ""
    }

    /// The endpoints this handler serves.
    fn routes(&self) -> Vec<RouteSpec>;

    /// Startup hook.
    fn init(&self, _context: &HandlerContext) {}

    /// Shutdown hook.
    fn destroy(&self, _context: &HandlerContext) {}
}
