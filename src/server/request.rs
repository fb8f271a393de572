//! Conversion from the transport's request into an `http::Request`.

use may_minihttp::Request;
use std::io::Read;
use tracing::{debug, warn};

/// Build an `http::Request<Vec<u8>>` from a raw transport request
///
/// The URI keeps the query string. Headers with names or values `http`
/// rejects are dropped with a warning; an unreadable body becomes empty.
///
/// # Errors
///
/// A method or request target `http` cannot represent. The caller answers
/// 400 without dispatching.
pub fn to_http_request(req: Request) -> Result<http::Request<Vec<u8>>, http::Error> {
    let mut builder = http::Request::builder()
        .method(req.method())
        .uri(req.path());

    let mut header_count = 0usize;
    for header in req.headers() {
        match (
            http::HeaderName::from_bytes(header.name.as_bytes()),
            http::HeaderValue::from_bytes(header.value),
        ) {
            (Ok(name), Ok(value)) => {
                builder = builder.header(name, value);
                header_count += 1;
            }
            _ => warn!(header = %header.name, "Dropping malformed request header"),
        }
    }

    let mut body = Vec::new();
    if let Err(err) = req.body().read_to_end(&mut body) {
        warn!(error = %err, "Failed to read request body");
        body.clear();
    }

    debug!(
        header_count = header_count,
        body_size_bytes = body.len(),
        "Request converted"
    );

    builder.body(body)
}
