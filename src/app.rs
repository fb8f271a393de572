//! # App Module
//!
//! [`App`] collects routes, handler objects, the view engine and the error
//! hook; [`App::build`] freezes them into a [`Core`] that serves requests.
//!
//! ```
//! use chainrouter::App;
//!
//! let mut app = App::default();
//! app.use_at("/api", |ctx| {
//!     ctx.set("X-Api", "1");
//!     ctx.next();
//! })
//! .get("/api/users/:id", |ctx| {
//!     let id = ctx.params("id").unwrap_or_default().to_string();
//!     ctx.send(id);
//! });
//! let core = app.build().unwrap();
//!
//! let req = http::Request::get("/api/users/7").body(Vec::new()).unwrap();
//! let res = core.handle(req);
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body, b"7");
//! assert_eq!(res.get_header("x-api"), Some("1"));
//! ```
//!
//! Routes run in registration order. The route table is immutable once built;
//! only the context pool is shared mutably between in-flight requests.

use crate::context::{Context, ContextPool};
use crate::dispatcher::next_route;
use crate::error::{ErrorHandler, RouterError};
use crate::metrics::CoreMetrics;
use crate::reflect::{HandlerObject, Reflector};
use crate::response::Response;
use crate::router::{Handler, Route, RouteTable};
use crate::runtime_config::Options;
use crate::view::{discover_view_dir, Layout, MiniJinjaViews, ViewEngine, ViewError};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// State shared read-only by every request
pub(crate) struct Shared {
    pub(crate) routes: RouteTable,
    pub(crate) options: Options,
    pub(crate) views: Option<Arc<dyn ViewEngine>>,
    pub(crate) metrics: CoreMetrics,
    pub(crate) auto_routes: Vec<(&'static str, String)>,
}

/// Route table builder
pub struct App {
    options: Options,
    routes: RouteTable,
    views: Option<Arc<dyn ViewEngine>>,
    templates: HashMap<String, String>,
    reflector: Reflector,
    auto_routes: Vec<(&'static str, String)>,
    error_handler: Option<ErrorHandler>,
    errors: Vec<RouterError>,
}

impl Default for App {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl App {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            options,
            routes: RouteTable::new(),
            views: None,
            templates: HashMap::new(),
            reflector: Reflector::new(),
            auto_routes: Vec::new(),
            error_handler: None,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Registered routes so far
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Register one handler under `verb` and `path`
    ///
    /// Invalid verbs or paths are recorded and reported by [`App::build`].
    pub fn add<F>(&mut self, verb: &str, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.push(verb, path, Arc::new(handler));
        self
    }

    /// Register a chain of handlers, one route each, in order
    ///
    /// An empty chain is recorded as [`RouterError::MissingHandler`].
    pub fn add_chain(&mut self, verb: &str, path: &str, handlers: Vec<Handler>) -> &mut Self {
        if handlers.is_empty() {
            self.errors.push(RouterError::MissingHandler {
                method: verb.to_string(),
                path: path.to_string(),
            });
            return self;
        }
        for handler in handlers {
            self.push(verb, path, handler);
        }
        self
    }

    fn push(&mut self, verb: &str, path: &str, handler: Handler) {
        match Route::new(verb, path, handler) {
            Ok(route) => {
                self.routes.register(route);
            }
            Err(err) => {
                warn!(method = %verb, path = %path, error = %err, "Route rejected");
                self.errors.push(err);
            }
        }
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("GET", path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("POST", path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("PUT", path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("PATCH", path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("DELETE", path, handler)
    }

    pub fn head<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("HEAD", path, handler)
    }

    pub fn options_route<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("OPTIONS", path, handler)
    }

    pub fn connect<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("CONNECT", path, handler)
    }

    pub fn trace<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("TRACE", path, handler)
    }

    /// Any method
    pub fn all<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("ALL", path, handler)
    }

    /// Middleware for every request whose path starts with `prefix`
    pub fn use_at<F>(&mut self, prefix: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("USE", prefix, handler)
    }

    /// Middleware for every request
    pub fn middleware<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.add("USE", "/", handler)
    }

    /// Register a handler object's operations
    ///
    /// Runs `init`, mounts `preload` as `USE prefix`, registers every operation
    /// whose name starts with a verb, then `GET /check` when health checks are
    /// enabled.
    pub fn handle<H: HandlerObject>(&mut self, mut object: H) -> &mut Self {
        object.init();
        let object = Arc::new(object);
        let prefix = object.prefix().to_string();

        let preload = Arc::clone(&object);
        self.add("USE", &prefix, move |ctx| preload.preload(ctx));

        let planned = self.reflector.plan::<H>(&prefix);
        for route in planned {
            let target = Arc::clone(&object);
            let call = route.operation.call;
            let verb = route.verb.as_str();
            self.add(verb, &route.path, move |ctx| call(&*target, ctx));
            self.auto_routes.push((verb, route.path));
        }

        if self.options.health_check {
            self.get("/check", |ctx| {
                ctx.send("ok");
            });
        }
        self
    }

    /// Use `engine` for [`Context::view`] and [`Context::render`]
    pub fn views(&mut self, engine: impl ViewEngine + 'static) -> &mut Self {
        self.views = Some(Arc::new(engine));
        self
    }

    /// In-memory templates added to the view engine at build time
    pub fn templates(&mut self, templates: HashMap<String, String>) -> &mut Self {
        self.templates.extend(templates);
        self
    }

    /// Hook run by [`Core::handle`] when the chain stored an error
    pub fn on_error<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, &anyhow::Error) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    fn resolve_views(&mut self) -> Option<Arc<dyn ViewEngine>> {
        if let Some(views) = self.views.take() {
            return Some(views);
        }
        let dir = self.options.views_dir.clone().or_else(discover_view_dir);
        let has_templates = !self.templates.is_empty();
        if dir.is_none() && !has_templates {
            return None;
        }
        let engine = match dir {
            Some(dir) => {
                debug!(directory = %dir.display(), "Using built-in view engine");
                MiniJinjaViews::new(dir, &self.options.views_ext)
            }
            None => MiniJinjaViews::in_memory(&self.options.views_ext),
        };
        let engine = match &self.options.views_layout {
            Some(layout) => engine.layout(layout.clone()),
            None => engine,
        };
        Some(Arc::new(engine.reload(self.options.debug)))
    }

    /// Freeze the application
    ///
    /// # Errors
    ///
    /// Returns the first registration error, or the view load failure.
    pub fn build(mut self) -> anyhow::Result<Core> {
        if !self.errors.is_empty() {
            let first = self.errors.remove(0);
            return Err(first.into());
        }

        let views = self.resolve_views();
        if let Some(views) = &views {
            views.load().map_err(RouterError::ViewLoad)?;
            if !self.templates.is_empty() {
                views
                    .load_templates(&self.templates)
                    .map_err(RouterError::ViewLoad)?;
            }
        }

        info!(
            routes = self.routes.len(),
            auto_routes = self.auto_routes.len(),
            views = views.is_some(),
            etag = self.options.etag,
            "Router built"
        );

        Ok(Core {
            shared: Arc::new(Shared {
                routes: self.routes,
                options: self.options,
                views,
                metrics: CoreMetrics::new(),
                auto_routes: self.auto_routes,
            }),
            pool: ContextPool::new(),
            error_handler: self.error_handler,
        })
    }
}

/// Immutable, built router
pub struct Core {
    shared: Arc<Shared>,
    pool: ContextPool,
    error_handler: Option<ErrorHandler>,
}

impl Core {
    /// Serve one request end to end
    ///
    /// Acquires a context, runs the chain, invokes the error hook when an
    /// error was stored, then returns the response and releases the context.
    pub fn handle(&self, request: http::Request<Vec<u8>>) -> Response {
        let start = Instant::now();
        let mut ctx = self.acquire(request);
        self.dispatch(&mut ctx);

        if let Some(err) = ctx.take_error() {
            self.shared.metrics.record_error();
            match &self.error_handler {
                Some(handler) => handler(ctx.as_mut(), &err),
                None => debug!(
                    request_id = %ctx.request_id(),
                    error = %err,
                    "Chain halted with an error and no error handler"
                ),
            }
        }

        let options = &self.shared.options;
        if !options.server_name.is_empty() {
            ctx.set("Server", options.server_name.clone());
        }

        let elapsed = start.elapsed();
        if options.debug {
            info!(
                request_id = %ctx.request_id(),
                method = %ctx.method(),
                path = %ctx.path(),
                status = ctx.response().status,
                latency_us = elapsed.as_micros() as u64,
                "Request handled"
            );
        }
        self.shared.metrics.record_request(elapsed);

        let response = std::mem::take(ctx.response_mut());
        self.release(ctx);
        response
    }

    /// Draw a context for `request` from the pool
    pub fn acquire(&self, request: http::Request<Vec<u8>>) -> Box<Context> {
        let mut ctx = self.pool.acquire(request);
        ctx.attach(Arc::clone(&self.shared));
        ctx
    }

    /// Run the chain for an acquired context
    pub fn dispatch(&self, ctx: &mut Context) {
        next_route(ctx);
    }

    /// Return a context to the pool
    pub fn release(&self, ctx: Box<Context>) {
        self.pool.release(ctx);
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.shared.routes
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.shared.options
    }

    #[must_use]
    pub fn metrics(&self) -> &CoreMetrics {
        &self.shared.metrics
    }

    #[must_use]
    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// `(method, path)` of every route derived from a handler object
    #[must_use]
    pub fn auto_routes(&self) -> &[(&'static str, String)] {
        &self.shared.auto_routes
    }

    /// Render a template outside a request
    ///
    /// # Errors
    ///
    /// [`ViewError::NoEngine`] without a view engine, else the engine's error.
    pub fn render_view(
        &self,
        out: &mut dyn io::Write,
        name: &str,
        layout: Layout<'_>,
        data: &serde_json::Value,
    ) -> Result<(), ViewError> {
        match &self.shared.views {
            Some(views) => views.render(out, name, layout, data),
            None => Err(ViewError::NoEngine),
        }
    }

    /// Add in-memory templates to the view engine
    ///
    /// # Errors
    ///
    /// [`ViewError::NoEngine`] without a view engine, else the engine's error.
    pub fn load_templates(&self, templates: &HashMap<String, String>) -> Result<(), ViewError> {
        match &self.shared.views {
            Some(views) => views.load_templates(templates),
            None => Err(ViewError::NoEngine),
        }
    }

    /// Startup banner listing the auto-registered routes
    #[must_use]
    pub fn banner(&self) -> String {
        let mut out = String::from("+ ---- Auto register router ---- +\n");
        for (method, path) in &self.shared.auto_routes {
            out.push_str(&format!("| {method}\t{path}\n"));
        }
        out.push_str("+ ------------------------------ +\n");
        out
    }
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("routes", &self.shared.routes.len())
            .field("options", &self.shared.options)
            .field("views", &self.shared.views.is_some())
            .field("pool_allocated", &self.pool.allocated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpError;

    fn get(uri: &str) -> http::Request<Vec<u8>> {
        http::Request::get(uri).body(Vec::new()).unwrap()
    }

    #[test]
    fn test_build_reports_first_error() {
        let mut app = App::default();
        app.add("FETCH", "/x", |_| {}).get("/bad(/:id", |_| {});
        let err = app.build().unwrap_err();
        assert!(err.to_string().contains("FETCH"), "{err}");
    }

    #[test]
    fn test_empty_chain_is_missing_handler() {
        let mut app = App::default();
        app.add_chain("GET", "/x", Vec::new());
        let err = app.build().unwrap_err();
        let err = err.downcast::<RouterError>().unwrap();
        assert!(matches!(err, RouterError::MissingHandler { .. }));
    }

    #[test]
    fn test_add_chain_registers_one_route_per_handler() {
        let mut app = App::default();
        let first: Handler = Arc::new(|ctx: &mut Context| {
            ctx.write("a");
            ctx.next();
        });
        let second: Handler = Arc::new(|ctx: &mut Context| {
            ctx.write("b");
        });
        app.add_chain("GET", "/ab", vec![first, second]);
        let core = app.build().unwrap();
        assert_eq!(core.routes().len(), 2);
        assert_eq!(core.handle(get("/ab")).body, b"ab");
    }

    #[test]
    fn test_error_handler_and_metrics() {
        let mut app = App::default();
        app.get("/secret", |ctx| ctx.next_with(HttpError::new(403)))
            .on_error(crate::render_http_error);
        let core = app.build().unwrap();
        let res = core.handle(get("/secret"));
        assert_eq!(res.status, 403);
        assert_eq!(res.body, b"Forbidden");
        assert_eq!(core.metrics().error_count(), 1);
        assert_eq!(core.metrics().request_count(), 1);
    }

    #[test]
    fn test_server_name_header() {
        let options = Options {
            server_name: "chainrouter".to_string(),
            ..Options::default()
        };
        let mut app = App::new(options);
        app.get("/", |ctx| {
            ctx.send("home");
        });
        let res = app.build().unwrap().handle(get("/"));
        assert_eq!(res.get_header("server"), Some("chainrouter"));
    }

    #[test]
    fn test_release_returns_context_to_pool() {
        let mut app = App::default();
        app.get("/", |ctx| {
            ctx.send("x");
        });
        let core = app.build().unwrap();
        core.handle(get("/"));
        core.handle(get("/"));
        assert_eq!(core.pool().allocated(), 1);
        assert_eq!(core.pool().idle(), 1);
    }

    #[test]
    fn test_banner_without_auto_routes() {
        let core = App::default().build().unwrap();
        assert_eq!(
            core.banner(),
            "+ ---- Auto register router ---- +\n+ ------------------------------ +\n"
        );
    }
}
