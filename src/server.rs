// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Route registration with a queryable route registry
//!
//! axum builds its routing table internally and does not expose which handler was
//! registered under which path template. [`Server`] wraps an [`axum::Router`] and
//! records every registration as a [`RouteInfo`], keyed by a stable handler identity.
//! Each registered handler is wrapped in a route layer that writes its identity into the
//! [`MatchedHandler`] slot of the request, so outer middleware can tell which handler
//! served a request without looking at the concrete URL.
//!
//! Global middleware is kept aside and applied when the router is produced, so it also
//! covers routes registered after the middleware was installed.

use axum::{
    extract::Request,
    handler::Handler,
    http::Method,
    middleware::map_request,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Base identity of a handler
///
/// This is the fully qualified type name of the handler, e.g. `my_app::users::get_user`.
/// Closures defined in the same function share a type name, and one function may be
/// registered more than once, so [`Server`] makes the identity of each registration
/// unique with a `#<n>` suffix when the base is already taken.
pub fn handler_identity<H>(_handler: &H) -> &'static str {
    std::any::type_name::<H>()
}

/// Path a route template is mounted at on the underlying router.
///
/// axum rejects empty paths, so the empty template is served from `/`.
pub fn mount_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// A single route registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// HTTP method the route answers to
    pub method: Method,
    /// Path template as registered, e.g. `/user/{id}`
    pub path: String,
    /// Identity of the handler serving the route
    pub handler: String,
}

/// Append-only list of route registrations, shared between a [`Server`] and anything
/// that needs to inspect its routes.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Arc<RwLock<Vec<RouteInfo>>>,
}

impl RouteRegistry {
    fn push(&self, route: RouteInfo) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }

    /// All registrations, in registration order
    pub fn snapshot(&self) -> Vec<RouteInfo> {
        self.since(0)
    }

    /// Registrations made after the first `offset` ones
    pub fn since(&self, offset: usize) -> Vec<RouteInfo> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes.iter().skip(offset).cloned().collect()
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a route with this method is mounted where `path` would be mounted
    pub fn contains(&self, method: &Method, path: &str) -> bool {
        let mounted = mount_path(path);
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|route| route.method == *method && mount_path(&route.path) == mounted)
    }

    /// `base` if no registration uses it yet, otherwise `base#<n>` for the n-th use
    pub fn unique_identity(&self, base: &str) -> String {
        let taken = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|route| identity_base(&route.handler) == base)
            .count();

        match taken {
            0 => base.to_string(),
            n => format!("{}#{}", base, n + 1),
        }
    }

    /// Whether both handles refer to the same registry
    pub fn same_as(&self, other: &RouteRegistry) -> bool {
        Arc::ptr_eq(&self.routes, &other.routes)
    }
}

/// Identity with any registration suffix removed
pub fn identity_base(identity: &str) -> &str {
    identity
        .split_once('#')
        .map_or(identity, |(base, _)| base)
}

/// Per-request slot filled in with the identity of the handler that matched.
///
/// Instrumentation inserts an empty slot into the request extensions; the route layer of
/// the matched handler fills it. The slot is shared, so the value is visible to the
/// middleware even when the handler panics. Stacked instrumentation shares one slot.
#[derive(Debug, Clone, Default)]
pub struct MatchedHandler(Arc<OnceLock<Arc<str>>>);

impl MatchedHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the matched handler, if any handler was reached
    pub fn get(&self) -> Option<Arc<str>> {
        self.0.get().cloned()
    }

    fn set(&self, identity: Arc<str>) {
        // First match wins
        let _ = self.0.set(identity);
    }
}

type GlobalLayer = Arc<dyn Fn(Router) -> Router + Send + Sync>;

/// Router builder that keeps a registry of its routes
#[derive(Clone, Default)]
pub struct Server {
    router: Router,
    registry: RouteRegistry,
    layers: Vec<GlobalLayer>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a GET handler under a path template
    pub fn get<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::GET, MethodFilter::GET, path, handler)
    }

    /// Register a POST handler under a path template
    pub fn post<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::POST, MethodFilter::POST, path, handler)
    }

    /// Register a PUT handler under a path template
    pub fn put<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::PUT, MethodFilter::PUT, path, handler)
    }

    /// Register a PATCH handler under a path template
    pub fn patch<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::PATCH, MethodFilter::PATCH, path, handler)
    }

    /// Register a DELETE handler under a path template
    pub fn delete<H, T>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(Method::DELETE, MethodFilter::DELETE, path, handler)
    }

    fn add<H, T>(&mut self, method: Method, filter: MethodFilter, path: &str, handler: H) -> &mut Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let identity = self.registry.unique_identity(handler_identity(&handler));
        self.register(method, path, &identity, on(filter, handler))
    }

    /// Register a prepared method router under a path template with an explicit identity.
    ///
    /// The method router should only answer to `method`. Registering two templates under
    /// one identity makes the later template win; see [`RouteRegistry::unique_identity`].
    pub fn register(
        &mut self,
        method: Method,
        path: &str,
        identity: &str,
        route: MethodRouter,
    ) -> &mut Self {
        let stamp: Arc<str> = Arc::from(identity);
        let route = route.route_layer(map_request(move |request: Request| {
            if let Some(slot) = request.extensions().get::<MatchedHandler>() {
                slot.set(stamp.clone());
            }
            async move { request }
        }));

        self.registry.push(RouteInfo {
            method,
            path: path.to_string(),
            handler: identity.to_string(),
        });

        let router = std::mem::take(&mut self.router);
        self.router = router.route(mount_path(path), route);
        self
    }

    /// Install middleware around every route and the fallback.
    ///
    /// Applies to routes registered before and after this call. Middleware installed
    /// first runs outermost.
    pub fn layer_fn<F>(&mut self, apply: F) -> &mut Self
    where
        F: Fn(Router) -> Router + Send + Sync + 'static,
    {
        self.layers.push(Arc::new(apply));
        self
    }

    /// Whether a route with this method is already mounted at `path`
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.registry.contains(method, path)
    }

    /// All registered routes, in registration order
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.registry.snapshot()
    }

    /// Shared handle to the route registry
    pub fn registry(&self) -> RouteRegistry {
        self.registry.clone()
    }

    /// Build the router for the current set of routes and middleware
    pub fn router(&self) -> Router {
        self.layers
            .iter()
            .rev()
            .fold(self.router.clone(), |router, apply| apply(router))
    }

    /// Consume the server and build its router
    pub fn into_router(self) -> Router {
        self.router()
    }
}
