//! End-to-end requests over a real socket

use chainrouter::server::{
    interned_header_lines, AppService, HttpServer, ServerHandle, MAX_INTERNED_HEADER_LINES,
};
use chainrouter::{etag, render_http_error, App, HttpError, Options};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

mod common;
use common::http::{header, parse_response, send_request};
use common::test_server::setup_may_runtime;

/// Running server, stopped when dropped
struct TestServer {
    handle: Option<ServerHandle>,
    addr: SocketAddr,
}

impl TestServer {
    fn start(app: App) -> Self {
        setup_may_runtime();
        let core = Arc::new(app.build().unwrap());
        // Reserve a free port, then hand it to the server
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let handle = HttpServer(AppService::new(core)).start(addr).unwrap();
        handle.wait_ready().unwrap();
        Self {
            addr: handle.addr(),
            handle: Some(handle),
        }
    }

    fn get(&self, path: &str) -> (u16, Vec<(String, String)>, String) {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        parse_response(&send_request(&self.addr, &raw))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}

fn demo_app() -> App {
    let mut app = App::default();
    app.get("/", |ctx| {
        ctx.send("HOME");
    })
    .use_at("/api", |ctx| {
        ctx.set("X-Api", "1");
        ctx.next();
    })
    .get("/api/items/:id", |ctx| {
        let id = ctx.params("id").unwrap_or_default().to_string();
        ctx.send(format!("item {id}"));
    })
    .post("/api/echo", |ctx| {
        let body = ctx.body().to_vec();
        ctx.send(body);
    })
    .get("/api/teapot", |ctx| {
        ctx.next_with(HttpError::new(418));
    })
    .on_error(render_http_error);
    app
}

#[test]
fn test_route_over_socket() {
    let server = TestServer::start(demo_app());
    let (status, headers, body) = server.get("/api/items/5");
    assert_eq!(status, 200);
    assert_eq!(body, "item 5");
    assert_eq!(header(&headers, "x-api"), Some("1"));
}

#[test]
fn test_not_found_over_socket() {
    let server = TestServer::start(demo_app());
    let (status, _, body) = server.get("/missing");
    assert_eq!(status, 404);
    assert_eq!(body, "Not Found");
}

#[test]
fn test_error_hook_over_socket() {
    let server = TestServer::start(demo_app());
    let (status, _, body) = server.get("/api/teapot");
    assert_eq!(status, 418);
    assert_eq!(body, "I'm a teapot");
}

#[test]
fn test_post_body_over_socket() {
    let server = TestServer::start(demo_app());
    let payload = "ping";
    let raw = format!(
        "POST /api/echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    let (status, _, body) = parse_response(&send_request(&server.addr, &raw));
    assert_eq!(status, 200);
    assert_eq!(body, "ping");
}

#[test]
fn test_malformed_target_is_rejected_before_routing() {
    let server = TestServer::start(demo_app());
    let raw = "POST /a<b> HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    let (status, _, body) = parse_response(&send_request(&server.addr, raw));
    assert_eq!(status, 400);
    assert_eq!(body, "Bad Request");

    // The server keeps answering well-formed requests
    let (status, _, body) = server.get("/");
    assert_eq!(status, 200);
    assert_eq!(body, "HOME");
}

#[test]
fn test_etag_traffic_keeps_header_table_bounded() {
    let options = Options {
        etag: true,
        ..Options::default()
    };
    let mut app = App::new(options);
    app.get("/docs/:n", |ctx| {
        let n = ctx.params("n").unwrap_or_default().to_string();
        ctx.send(format!("document {n}"));
    });
    let server = TestServer::start(app);

    for n in 0..50 {
        let (status, headers, body) = server.get(&format!("/docs/{n}"));
        assert_eq!(status, 200);
        let expected = etag::compute(body.as_bytes());
        assert_eq!(header(&headers, "etag"), Some(expected.as_str()));
    }
    assert!(interned_header_lines() <= MAX_INTERNED_HEADER_LINES);
}
