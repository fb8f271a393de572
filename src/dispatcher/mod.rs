//! # Dispatcher Module
//!
//! Walks the route table for one request and runs the matching handlers.
//!
//! ## Chain Execution
//!
//! Dispatch is a cursor over the insertion-ordered route table. Each step finds
//! the next route after the cursor that matches the request, records the route
//! and its parameter values on the [`crate::Context`], and invokes its handler:
//!
//! - A handler that returns without calling [`crate::Context::next`] ends the chain.
//! - [`crate::Context::next`] clears the matched route and resumes scanning from
//!   the cursor, inside the caller's stack frame. Code after `next()` runs once
//!   the rest of the chain has returned.
//! - [`crate::Context::next_with`] stores an error and halts; no further handler runs.
//!
//! Handlers run synchronously on the request's coroutine.

mod core;

pub use core::{next_route, ChainState};
