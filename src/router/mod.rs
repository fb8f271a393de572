//! # Router Module
//!
//! Path compilation and the insertion-ordered route table.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling route paths (`/users/:id?`, `/files/*`) into matchers
//! - Keeping routes in registration order, append-only
//! - Finding the first route at or after a cursor that matches a request
//!
//! ## Architecture
//!
//! 1. **Compilation**: at registration a path is normalized (lower-cased, trailing
//!    slash trimmed) and classified as slash, literal, always-match or regex.
//!    Paths with parameters compile to a regex with one capture group per parameter.
//!
//! 2. **Matching**: the dispatcher asks [`RouteTable::find_from`] for the next
//!    match after its cursor. Middleware (`USE`) routes match any method by path
//!    prefix; other routes need an equal method, an `ALL` route, or a `GET` route
//!    answering a `HEAD` request.
//!
//! ## Example
//!
//! ```rust
//! use chainrouter::router::{Route, RouteTable};
//! use chainrouter::Context;
//! use http::Method;
//! use std::sync::Arc;
//!
//! let mut table = RouteTable::new();
//! let handler = Arc::new(|ctx: &mut Context| {
//!     ctx.send("user");
//! });
//! table.register(Route::new("GET", "/users/:id", handler).unwrap());
//!
//! let m = table.find(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.values.as_slice(), ["42"]);
//! ```

mod core;
mod pattern;

pub use core::{Handler, MethodFilter, ParamValues, Route, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
pub use pattern::{compile, extract_params, normalize_path, pattern_source, CompiledPath, Matcher};
