use super::namer::{classify, fix_uri, to_namer, AutoVerb};
use crate::context::Context;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// One named operation of a handler object
pub struct Operation<T> {
    pub name: &'static str,
    pub call: fn(&T, &mut Context),
}

impl<T> Operation<T> {
    #[must_use]
    pub const fn new(name: &'static str, call: fn(&T, &mut Context)) -> Self {
        Self { name, call }
    }
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Operation<T> {}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").field("name", &self.name).finish()
    }
}

/// Self-description of a handler object: its operations in declaration order
///
/// Usually generated by [`crate::routes`].
pub trait Operations: Sized {
    fn operations() -> Vec<Operation<Self>>;
}

/// A structured handler whose operations are registered by name
///
/// # Example
///
/// ```
/// use chainrouter::reflect::{HandlerBase, HandlerObject};
/// use chainrouter::{routes, Context};
///
/// #[derive(Default)]
/// struct Users {
///     base: HandlerBase,
/// }
///
/// #[routes]
/// impl Users {
///     // GET /users
///     pub fn get(&self, ctx: &mut Context) {
///         ctx.send("all users");
///     }
///
///     // GET /users/:id
///     #[op("GetUser_id")]
///     pub fn show(&self, ctx: &mut Context) {
///         let id = ctx.params("id").unwrap_or_default().to_string();
///         ctx.send(id);
///     }
/// }
///
/// impl HandlerObject for Users {
///     fn init(&mut self) {
///         self.base.set_prefix("/users");
///     }
///
///     fn prefix(&self) -> &str {
///         self.base.prefix()
///     }
/// }
/// ```
pub trait HandlerObject: Operations + Send + Sync + 'static {
    /// One-time setup, run before any route is registered
    fn init(&mut self) {}

    /// Path prefix every operation is mounted under
    fn prefix(&self) -> &str;

    /// Middleware mounted with `USE prefix`; must call [`Context::next`] to
    /// let the operations run
    fn preload(&self, ctx: &mut Context) {
        ctx.next();
    }
}

/// Embeddable prefix holder for [`HandlerObject`] implementations
#[derive(Debug, Clone, Default)]
pub struct HandlerBase {
    prefix: String,
}

impl HandlerBase {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Route derived from one operation
#[derive(Debug)]
pub struct AutoRoute<T> {
    pub verb: AutoVerb,
    pub path: String,
    pub operation: Operation<T>,
}

/// Maps operation names to verb + path bindings
///
/// Transformed names are memoized, so handler objects sharing operation names
/// only pay for the transform once.
#[derive(Debug, Default)]
pub struct Reflector {
    names: HashMap<String, String>,
}

impl Reflector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized [`to_namer`]
    pub fn transform(&mut self, name: &str) -> &str {
        self.names
            .entry(name.to_string())
            .or_insert_with(|| to_namer(name))
    }

    /// Number of memoized names
    #[must_use]
    pub fn cached(&self) -> usize {
        self.names.len()
    }

    /// Classify every operation of `T` and derive its path under `prefix`
    ///
    /// Operations whose transformed name does not start with a verb token are
    /// skipped.
    pub fn plan<T: Operations>(&mut self, prefix: &str) -> Vec<AutoRoute<T>> {
        let mut routes = Vec::new();
        for operation in T::operations() {
            let transformed = self.transform(operation.name);
            let Some(verb) = classify(transformed) else {
                debug!(
                    operation = operation.name,
                    transformed = %transformed,
                    "Operation skipped: no verb prefix"
                );
                continue;
            };
            let path = fix_uri(prefix, transformed, verb);
            info!(
                method = verb.as_str(),
                path = %path,
                operation = operation.name,
                "Auto-registered route"
            );
            routes.push(AutoRoute {
                verb,
                path,
                operation,
            });
        }
        routes
    }
}
