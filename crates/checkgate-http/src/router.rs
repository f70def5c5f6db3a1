//! Request router.
//!
//! Routes are matched on the exact path. A path that exists under a different
//! method resolves to [`RouteMatch::MethodNotAllowed`] so the service can
//! answer 405 with an `allow` header instead of 404.

use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::dispatch::RouteHandler;

struct Route {
    method: Method,
    path: String,
    handler: Arc<dyn RouteHandler>,
}

/// Outcome of routing one request.
pub enum RouteMatch<'a> {
    /// A handler is registered for this method and path.
    Found(&'a Arc<dyn RouteHandler>),
    /// The path exists, but not for this method.
    MethodNotAllowed(Vec<Method>),
    /// No route has this path.
    NotFound,
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(_) => f.write_str("Found"),
            Self::MethodNotAllowed(allowed) => {
                f.debug_tuple("MethodNotAllowed").field(allowed).finish()
            }
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Method and path routing table.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.routes
                    .iter()
                    .map(|route| format!("{} {}", route.method, route.path)),
            )
            .finish()
    }
}

impl Router {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` and `path`. A later registration for
    /// the same pair replaces the earlier one.
    #[must_use]
    pub fn route(mut self, method: Method, path: &str, handler: impl RouteHandler) -> Self {
        let handler: Arc<dyn RouteHandler> = Arc::new(handler);
        self.routes
            .retain(|route| !(route.method == method && route.path == path));
        self.routes.push(Route {
            method,
            path: path.to_owned(),
            handler,
        });
        self
    }

    /// Register a `GET` route.
    #[must_use]
    pub fn get(self, path: &str, handler: impl RouteHandler) -> Self {
        self.route(Method::GET, path, handler)
    }

    /// Register a `POST` route.
    #[must_use]
    pub fn post(self, path: &str, handler: impl RouteHandler) -> Self {
        self.route(Method::POST, path, handler)
    }

    /// Resolve a request to a handler.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let mut allowed = Vec::new();
        for route in self.routes.iter().filter(|route| route.path == path) {
            if route.method == *method {
                return RouteMatch::Found(&route.handler);
            }
            allowed.push(route.method.clone());
        }

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed(allowed)
        }
    }
}
