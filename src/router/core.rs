//! Router core module - route entries and the insertion-ordered route table.
//!
//! Matching is a linear scan in registration order. The first route whose
//! method and path both match wins; there is no priority reordering and no
//! backtracking across routes.

use super::pattern::{compile, Matcher};
use crate::context::Context;
use crate::error::RouterError;
use http::Method;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter values captured by a match, positionally aligned with [`Route::params`]
pub type ParamValues = SmallVec<[String; MAX_INLINE_PARAMS]>;

/// A unit of work bound to a route
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Which request methods a route accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    /// `USE` and `ALL` routes
    Any,
    Exact(Method),
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodFilter::Any => f.write_str("*"),
            MethodFilter::Exact(method) => write!(f, "{method}"),
        }
    }
}

/// Parse a registration verb
///
/// Returns the method filter and whether the route is middleware. Verbs are
/// case-sensitive upper-case.
fn parse_verb(verb: &str) -> Result<(MethodFilter, bool), RouterError> {
    let method = match verb {
        "USE" => return Ok((MethodFilter::Any, true)),
        "ALL" | "*" => return Ok((MethodFilter::Any, false)),
        "GET" => Method::GET,
        "HEAD" => Method::HEAD,
        "POST" => Method::POST,
        "PUT" => Method::PUT,
        "PATCH" => Method::PATCH,
        "DELETE" => Method::DELETE,
        "OPTIONS" => Method::OPTIONS,
        "CONNECT" => Method::CONNECT,
        "TRACE" => Method::TRACE,
        other => {
            return Err(RouterError::UnsupportedMethod {
                method: other.to_string(),
            })
        }
    };
    Ok((MethodFilter::Exact(method), false))
}

/// One registered binding of method, path pattern and handler
pub struct Route {
    method: MethodFilter,
    raw_path: String,
    path: String,
    params: Vec<Arc<str>>,
    matcher: Matcher,
    is_middleware: bool,
    is_get: bool,
    handler: Handler,
}

impl Route {
    /// Compile a route
    ///
    /// # Arguments
    ///
    /// * `verb` - `GET`, `POST`, ..., `ALL` (any method) or `USE` (prefix middleware)
    /// * `path` - Route path, e.g. `/users/:id?`
    /// * `handler` - Function invoked when the route is selected
    ///
    /// # Errors
    ///
    /// [`RouterError::UnsupportedMethod`] for unknown verbs and
    /// [`RouterError::InvalidPattern`] when the path does not compile.
    pub fn new(verb: &str, path: &str, handler: Handler) -> Result<Self, RouterError> {
        let (method, is_middleware) = parse_verb(verb)?;
        let compiled = compile(path, is_middleware)?;
        Ok(Self {
            method,
            raw_path: compiled.raw,
            path: compiled.normalized,
            params: compiled.params,
            matcher: compiled.matcher,
            is_middleware,
            is_get: verb == "GET",
            handler,
        })
    }

    #[must_use]
    pub fn method(&self) -> &MethodFilter {
        &self.method
    }

    /// Path as registered
    #[must_use]
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Lower-cased, trailing-slash-trimmed path
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn params(&self) -> &[Arc<str>] {
        &self.params
    }

    #[must_use]
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    #[must_use]
    pub fn is_middleware(&self) -> bool {
        self.is_middleware
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Test the route against a request
    ///
    /// `path` must already be normalized. Returns the captured parameter values
    /// on a match; routes without parameters return an empty list.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> Option<ParamValues> {
        if self.is_middleware {
            return match self.matcher {
                Matcher::Any | Matcher::Slash => Some(ParamValues::new()),
                _ => path.starts_with(self.path.as_str()).then(ParamValues::new),
            };
        }

        let eligible = match &self.method {
            MethodFilter::Any => true,
            MethodFilter::Exact(m) => m == method || (self.is_get && *method == Method::HEAD),
        };
        if !eligible {
            return None;
        }

        match &self.matcher {
            Matcher::Any => return Some(self.wildcard_values(path)),
            Matcher::Slash if path == "/" => return Some(ParamValues::new()),
            Matcher::Pattern(regex) => {
                if let Some(caps) = regex.captures(path) {
                    // A pattern with parameters but no groups is a miss, not an error.
                    if !self.params.is_empty() && caps.len() <= 1 {
                        return None;
                    }
                    return Some(
                        caps.iter()
                            .skip(1)
                            .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
                            .collect(),
                    );
                }
            }
            _ => {}
        }

        (self.path == path).then(ParamValues::new)
    }

    /// Values for an always-match route: `*` captures the whole path after `/`
    fn wildcard_values(&self, path: &str) -> ParamValues {
        self.params
            .iter()
            .map(|name| {
                if name.as_ref() == "*" {
                    path.strip_prefix('/').unwrap_or(path).to_string()
                } else {
                    String::new()
                }
            })
            .collect()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("matcher", &self.matcher.kind())
            .field("is_middleware", &self.is_middleware)
            .finish()
    }
}

/// Result of a successful table lookup
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Position of the route in the table
    pub index: usize,
    pub route: Arc<Route>,
    pub values: ParamValues,
}

/// Append-only, insertion-ordered sequence of routes
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route and return its index
    pub fn register(&mut self, route: Route) -> usize {
        debug!(
            index = self.routes.len(),
            method = %route.method,
            path = %route.path,
            matcher = route.matcher.kind(),
            middleware = route.is_middleware,
            "Route registered"
        );
        self.routes.push(Arc::new(route));
        self.routes.len() - 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arc<Route>> {
        self.routes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }

    /// Find the first route at or after `start` matching the request
    ///
    /// # Arguments
    ///
    /// * `start` - First table index to test
    /// * `method` - Request method
    /// * `path` - Normalized request path
    ///
    /// # Returns
    ///
    /// The matching route, its index and the captured values, or `None`
    #[must_use]
    pub fn find_from(&self, start: usize, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(index, route)| {
                route.matches(method, path).map(|values| RouteMatch {
                    index,
                    route: Arc::clone(route),
                    values,
                })
            })
    }

    /// Find the first matching route in the whole table
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.find_from(0, method, path)
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for (index, route) in self.routes.iter().enumerate() {
            let kind = if route.is_middleware { "use" } else { route.matcher.kind() };
            println!("[route] #{index} {} {} ({kind})", route.method, route.raw_path);
        }
    }
}
