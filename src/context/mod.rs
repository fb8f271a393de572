//! # Context Module
//!
//! Per-request state and the pool it is recycled through.
//!
//! [`Context`] is what every handler receives. Besides the request and the
//! response buffer it holds the dispatch cursor and the matched route, so a
//! middleware handler can hand control to the next matching route with
//! [`Context::next`] or stop the chain with [`Context::next_with`].
//!
//! [`ContextPool`] keeps released contexts on a mutex-guarded free-list so the
//! server does not allocate one per request.

mod core;
mod pool;

pub use core::Context;
pub use pool::ContextPool;
