use super::core::Context;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// Reuse pool for [`Context`] instances
///
/// The free-list is the only structure shared by concurrent requests. A
/// context is owned by exactly one request between [`ContextPool::acquire`] and
/// [`ContextPool::release`]; release clears every field that refers to the
/// previous request before the instance becomes available again.
///
/// The pool grows on demand and never shrinks.
#[derive(Default)]
pub struct ContextPool {
    free: Mutex<Vec<Box<Context>>>,
    allocated: AtomicUsize,
}

impl ContextPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a context for `request`, allocating when the free-list is empty
    ///
    /// The returned context has its cursor at `-1`, no matched route, no
    /// parameter values and no error.
    pub fn acquire(&self, request: http::Request<Vec<u8>>) -> Box<Context> {
        let recycled = self.free.lock().pop();
        let mut ctx = match recycled {
            Some(ctx) => ctx,
            None => {
                let total = self.allocated.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(allocated = total, "Context pool grew");
                Box::new(Context::new())
            }
        };
        ctx.prepare(request);
        ctx
    }

    /// Clear `ctx` and return it to the free-list
    pub fn release(&self, mut ctx: Box<Context>) {
        ctx.clear();
        self.free.lock().push(ctx);
    }

    /// Number of contexts ever allocated by this pool
    #[must_use]
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Number of contexts waiting on the free-list
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}
