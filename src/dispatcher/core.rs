//! Dispatcher core module - the chain executor.

use crate::context::Context;
use crate::etag;
use crate::router::RouteMatch;
use std::sync::Arc;
use tracing::debug;

/// Where a request's chain currently stands
///
/// ```text
///            find_from(cursor + 1)
/// Scanning ──────────────────────────▶ Executing ── ctx.next() ──▶ Scanning
///    │                                     │
///    │ no route left                       │ ctx.next_with(err)
///    ▼                                     ▼
/// Exhausted                              Halted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Looking for the next matching route
    Scanning,
    /// A matched handler is running
    Executing,
    /// A handler stopped the chain with an error
    Halted,
    /// The cursor reached the end of the table
    Exhausted,
}

/// Advance the cursor to the next matching route and run its handler
///
/// Scanning starts right after the cursor, so a route already visited by this
/// request is never matched again. When the handler calls [`Context::next`]
/// this function re-enters from the new cursor position. Once the table is
/// exhausted and no handler wrote a body, the response becomes a 404 with the
/// standard reason phrase.
pub fn next_route(ctx: &mut Context) {
    let Some(shared) = ctx.shared.clone() else {
        ctx.state = ChainState::Exhausted;
        if ctx.response.is_body_empty() {
            ctx.send_status(404);
        }
        return;
    };

    ctx.state = ChainState::Scanning;
    let start = usize::try_from(ctx.index + 1).unwrap_or(0);

    match shared.routes.find_from(start, &ctx.method, &ctx.path) {
        Some(RouteMatch {
            index,
            route,
            values,
        }) => {
            debug!(
                request_id = %ctx.request_id(),
                method = %ctx.method,
                path = %ctx.path,
                route_index = index,
                route_path = %route.path(),
                params = ?values,
                "Route matched"
            );
            ctx.index = index as isize;
            ctx.route = Some(Arc::clone(&route));
            ctx.values = values;
            ctx.state = ChainState::Executing;

            (route.handler())(ctx);

            if shared.options.etag {
                etag::apply(ctx);
            }
        }
        None => {
            ctx.index = ctx.index.max(shared.routes.len() as isize - 1);
            ctx.state = ChainState::Exhausted;
            if ctx.response.is_body_empty() {
                debug!(
                    request_id = %ctx.request_id(),
                    method = %ctx.method,
                    path = %ctx.path,
                    "No route matched"
                );
                ctx.send_status(404);
                shared.metrics.record_not_found();
            }
        }
    }
}
