//! # Server Module
//!
//! Adapter between `may_minihttp` and [`crate::Core`]: each request is
//! converted into an `http::Request<Vec<u8>>`, run through
//! [`crate::Core::handle`] on the connection's coroutine, and the resulting
//! [`crate::Response`] is written back.
//!
//! ```rust,no_run
//! use chainrouter::server::{AppService, HttpServer};
//! use chainrouter::App;
//! use std::sync::Arc;
//!
//! let mut app = App::default();
//! app.get("/", |ctx| {
//!     ctx.send("hello");
//! });
//! let core = Arc::new(app.build().unwrap());
//! let handle = HttpServer(AppService::new(core)).start("127.0.0.1:8080").unwrap();
//! handle.join().unwrap();
//! ```

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{serve, HttpServer, ServerHandle, DEFAULT_READY_TIMEOUT};
pub use request::to_http_request;
pub use response::{
    header_line, interned_header_lines, write_response, HeaderLines, MAX_INTERNED_HEADER_LINES,
};
pub use service::AppService;
