//! Strong ETags for response bodies.
//!
//! Enabled with `Options::etag`. After every handler returns, the dispatcher
//! hashes the body and either sets `ETag` or, when the client's
//! `If-None-Match` already carries the tag, answers 304 with an empty body.

use crate::context::Context;
use sha2::{Digest, Sha256};

/// Compute the tag for a body: `"<len>-<first 8 bytes of sha256, hex>"`
#[must_use]
pub fn compute(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("\"{}-{hex}\"", body.len())
}

/// Tag the response, or turn it into a 304 when the client copy is fresh
pub fn apply(ctx: &mut Context) {
    if ctx.response.body.is_empty() {
        return;
    }
    let tag = compute(&ctx.response.body);
    let fresh = match ctx.header("if-none-match") {
        Some(client) => match client.strip_prefix("W/") {
            Some(weak) => weak == tag,
            None => client.contains(tag.as_str()),
        },
        None => false,
    };

    if fresh {
        ctx.response.status = 304;
        ctx.response.body.clear();
    } else {
        ctx.set("ETag", tag);
    }
}
