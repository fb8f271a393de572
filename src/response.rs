//! Response buffer filled by handlers during dispatch.
//!
//! Handlers never write to the transport directly. They mutate a [`Response`]
//! owned by their [`crate::Context`]; the transport adapter copies it out once
//! the chain has finished.

use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage for the hot path
///
/// Header names use `Arc<str>` so repeated names clone in O(1).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Standard reason phrase for a status code
///
/// Uses the canonical table from the `http` crate. Unknown codes yield `""`.
#[must_use]
pub fn status_text(code: u16) -> &'static str {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("")
}

/// Status, headers and body accumulated for one request
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code (defaults to 200)
    pub status: u16,
    /// Response headers, names kept as registered
    pub headers: HeaderVec,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }
}

impl Response {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
    }

    /// Replace the body
    pub fn set_body(&mut self, body: impl AsRef<[u8]>) {
        self.body.clear();
        self.body.extend_from_slice(body.as_ref());
    }

    /// Append to the body
    pub fn append_body(&mut self, body: impl AsRef<[u8]>) {
        self.body.extend_from_slice(body.as_ref());
    }

    #[inline]
    #[must_use]
    pub fn is_body_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Clear status, headers and body so the buffer can be reused
    pub fn reset(&mut self) {
        self.status = 200;
        self.headers.clear();
        self.body.clear();
    }

    /// Convert into an `http::Response`
    ///
    /// # Errors
    ///
    /// Returns an error when a header name or value is not valid HTTP.
    pub fn into_http(self) -> Result<http::Response<Vec<u8>>, http::Error> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_ref(), value.as_str());
        }
        builder.body(self.body)
    }
}
