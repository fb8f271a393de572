//! Writing a [`crate::Response`] back through the transport.

use crate::response::{status_text, Response as CoreResponse};
use dashmap::DashMap;
use may_minihttp::Response;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Most distinct header lines the process will leak for the transport
pub const MAX_INTERNED_HEADER_LINES: usize = 4096;

/// Header lines handed to the transport, which only accepts `&'static str`
///
/// Each distinct `Name: value` line is leaked once and reused afterwards.
/// Once `capacity` lines exist, new lines are refused and the header is
/// dropped from the response.
pub struct HeaderLines {
    lines: DashMap<String, &'static str>,
    capacity: usize,
    full_warned: AtomicBool,
}

impl HeaderLines {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: DashMap::new(),
            capacity,
            full_warned: AtomicBool::new(false),
        }
    }

    /// Interned `Name: value` line, or `None` when the table is full
    pub fn line(&self, name: &str, value: &str) -> Option<&'static str> {
        let line = format!("{name}: {value}");
        if let Some(existing) = self.lines.get(&line) {
            return Some(*existing);
        }
        // Concurrent inserts may overshoot by a few entries
        if self.lines.len() >= self.capacity {
            if self.full_warned.swap(true, Ordering::Relaxed) {
                debug!(header = name, "Header line table full, dropping header");
            } else {
                warn!(
                    header = name,
                    capacity = self.capacity,
                    "Header line table full, dropping headers with new values"
                );
            }
            return None;
        }
        Some(
            *self
                .lines
                .entry(line.clone())
                .or_insert_with(|| Box::leak(line.into_boxed_str())),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

static HEADER_LINES: Lazy<HeaderLines> = Lazy::new(|| HeaderLines::new(MAX_INTERNED_HEADER_LINES));

/// Interned `Name: value` line from the process-wide table
pub fn header_line(name: &str, value: &str) -> Option<&'static str> {
    HEADER_LINES.line(name, value)
}

/// Number of distinct header lines interned so far
#[must_use]
pub fn interned_header_lines() -> usize {
    HEADER_LINES.len()
}

/// Copy status, headers and body into the transport response
///
/// `Content-Length` is skipped; the transport computes it from the body.
pub fn write_response(res: &mut Response, response: CoreResponse) {
    let reason = match status_text(response.status) {
        "" => "Unknown",
        reason => reason,
    };
    res.status_code(usize::from(response.status), reason);
    for (name, value) in &response.headers {
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        if let Some(line) = header_line(name, value) {
            res.header(line);
        }
    }
    res.body_vec(response.body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etag;

    #[test]
    fn test_header_line_is_interned() {
        let a = header_line("X-Intern-Test", "1").unwrap();
        let b = header_line("X-Intern-Test", "1").unwrap();
        assert_eq!(a, "X-Intern-Test: 1");
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_table_stops_growing_at_capacity() {
        let table = HeaderLines::new(8);
        for n in 0..50 {
            let tag = etag::compute(format!("body {n}").as_bytes());
            let line = table.line("ETag", &tag);
            if n < 8 {
                assert_eq!(line, Some(format!("ETag: {tag}").as_str()));
            } else {
                assert_eq!(line, None);
            }
        }
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn test_known_lines_survive_a_full_table() {
        let table = HeaderLines::new(2);
        let server = table.line("Server", "chainrouter").unwrap();
        table.line("ETag", "\"a\"").unwrap();
        assert_eq!(table.line("ETag", "\"b\""), None);
        assert!(std::ptr::eq(table.line("Server", "chainrouter").unwrap(), server));
    }
}
