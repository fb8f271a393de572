//! Integration tests for chain dispatch through `Core::handle`
//!
//! # Test Coverage
//!
//! - Middleware passing control with `next()` and post-processing after it
//! - Handlers that end the chain by not calling `next()`
//! - 404 only when the table is exhausted with an empty body
//! - `next_with` halting the chain and the error hook
//! - Cursor monotonicity and per-route parameter values
//! - HEAD served by GET routes, ETag / 304 handling

use chainrouter::{render_http_error, App, ChainState, Context, HttpError, Options};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

mod common;
use common::requests::{body_str, get, request};

#[test]
fn test_middleware_then_route() {
    let mut app = App::default();
    app.middleware(|ctx| {
        ctx.set("X-Powered-By", "chainrouter");
        ctx.next();
    })
    .get("/hello", |ctx| {
        ctx.send("hello");
    });
    let core = app.build().unwrap();

    let res = core.handle(get("/hello"));
    assert_eq!(res.status, 200);
    assert_eq!(body_str(&res), "hello");
    assert_eq!(res.get_header("x-powered-by"), Some("chainrouter"));
}

#[test]
fn test_handler_without_next_ends_chain() {
    let later = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&later);

    let mut app = App::default();
    app.get("/a", |ctx| {
        ctx.send("first");
    })
    .all("/a", move |ctx| {
        seen.fetch_add(1, Ordering::SeqCst);
        ctx.send("second");
    });
    let core = app.build().unwrap();

    assert_eq!(body_str(&core.handle(get("/a"))), "first");
    assert_eq!(later.load(Ordering::SeqCst), 0);
    // POST skips the GET route and reaches ALL
    assert_eq!(
        body_str(&core.handle(request("POST", "/a", &[], Vec::new()))),
        "second"
    );
}

#[test]
fn test_code_after_next_runs_once_chain_returns() {
    let mut app = App::default();
    app.use_at("/wrap", |ctx| {
        ctx.write("<");
        ctx.next();
        ctx.write(">");
    })
    .get("/wrap/x", |ctx| {
        ctx.write("x");
    });
    let core = app.build().unwrap();
    assert_eq!(body_str(&core.handle(get("/wrap/x"))), "<x>");
}

#[test]
fn test_not_found_when_nothing_written() {
    let mut app = App::default();
    app.middleware(|ctx| ctx.next())
        .get("/known", |ctx| {
            ctx.send("known");
        });
    let core = app.build().unwrap();

    let res = core.handle(get("/unknown"));
    assert_eq!(res.status, 404);
    assert_eq!(body_str(&res), "Not Found");
    assert_eq!(core.metrics().not_found_count(), 1);
}

#[test]
fn test_no_404_when_middleware_wrote_body() {
    let mut app = App::default();
    app.middleware(|ctx| {
        ctx.write("partial");
        ctx.next();
    });
    let core = app.build().unwrap();

    let res = core.handle(get("/nothing/here"));
    assert_eq!(res.status, 200);
    assert_eq!(body_str(&res), "partial");
}

#[test]
fn test_empty_table_is_404() {
    let core = App::default().build().unwrap();
    let res = core.handle(get("/"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_next_with_halts_and_error_hook_renders() {
    let reached = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reached);

    let mut app = App::default();
    app.use_at("/admin", |ctx| {
        if ctx.header("authorization").is_none() {
            ctx.next_with(HttpError::new(401));
            return;
        }
        ctx.next();
    })
    .get("/admin/panel", move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.send("panel");
    })
    .on_error(render_http_error);
    let core = app.build().unwrap();

    let res = core.handle(get("/admin/panel"));
    assert_eq!(res.status, 401);
    assert_eq!(body_str(&res), "Unauthorized");
    assert_eq!(reached.load(Ordering::SeqCst), 0);

    let res = core.handle(request(
        "GET",
        "/admin/panel",
        &[("Authorization", "Bearer t")],
        Vec::new(),
    ));
    assert_eq!(res.status, 200);
    assert_eq!(body_str(&res), "panel");
    assert_eq!(core.metrics().error_count(), 1);
}

#[test]
fn test_next_with_in_middleware_stops_post_processing_chain() {
    let mut app = App::default();
    app.middleware(|ctx| {
        ctx.next();
        // The inner handler halted; a second next() stays a no-op.
        assert_eq!(ctx.state(), ChainState::Halted);
        ctx.next();
    })
    .get("/fail", |ctx| {
        ctx.next_with(anyhow::anyhow!("boom"));
    })
    .all("/fail", |ctx| {
        ctx.send("unreachable");
    })
    .on_error(|ctx, err| {
        ctx.status(500);
        ctx.send(format!("error: {err}"));
    });
    let core = app.build().unwrap();

    let res = core.handle(get("/fail"));
    assert_eq!(res.status, 500);
    assert_eq!(body_str(&res), "error: boom");
}

#[test]
fn test_error_without_hook_leaves_response_alone() {
    let mut app = App::default();
    app.get("/quiet", |ctx| {
        ctx.send("partial");
        ctx.next_with(HttpError::new(500));
    });
    let core = app.build().unwrap();
    let res = core.handle(get("/quiet"));
    assert_eq!(res.status, 200);
    assert_eq!(body_str(&res), "partial");
    assert_eq!(core.metrics().error_count(), 1);
}

#[test]
fn test_cursor_only_moves_forward() {
    let cursors = Arc::new(Mutex::new(Vec::new()));

    let mut app = App::default();
    for _ in 0..3 {
        let cursors = Arc::clone(&cursors);
        app.use_at("/c", move |ctx: &mut Context| {
            cursors.lock().unwrap().push(ctx.cursor());
            ctx.next();
        });
    }
    let core = app.build().unwrap();
    core.handle(get("/c"));
    assert_eq!(*cursors.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_params_are_per_route() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&seen);
    let second = Arc::clone(&seen);

    let mut app = App::default();
    app.get("/p/:first", move |ctx| {
        first
            .lock()
            .unwrap()
            .push((ctx.params("first").map(String::from), ctx.params("second").map(String::from)));
        ctx.next();
    })
    .get("/p/:second", move |ctx| {
        second
            .lock()
            .unwrap()
            .push((ctx.params("first").map(String::from), ctx.params("second").map(String::from)));
        ctx.send("done");
    });
    let core = app.build().unwrap();
    core.handle(get("/p/value"));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (Some("value".to_string()), None),
            (None, Some("value".to_string())),
        ]
    );
}

#[test]
fn test_param_values_come_from_lowercased_path() {
    let mut app = App::default();
    app.get("/users/:UserId", |ctx| {
        let id = ctx.params("UserId").unwrap_or_default().to_string();
        ctx.send(id);
    });
    let core = app.build().unwrap();
    // The request path is lower-cased before matching
    assert_eq!(body_str(&core.handle(get("/Users/ABC"))), "abc");
}

#[test]
fn test_absent_optional_param_reads_empty() {
    let mut app = App::default();
    app.get("/files/:name?", |ctx| {
        let name = ctx.params("name").map(str::to_string);
        let missing = ctx.params("other").is_none();
        ctx.send(format!("{name:?} {missing}"));
    });
    let core = app.build().unwrap();
    assert_eq!(body_str(&core.handle(get("/files/a"))), "Some(\"a\") true");
    assert_eq!(body_str(&core.handle(get("/files"))), "Some(\"\") true");
}

#[test]
fn test_head_served_by_get_route() {
    let mut app = App::default();
    app.get("/page", |ctx| {
        ctx.send("page");
    });
    let core = app.build().unwrap();
    let res = core.handle(request("HEAD", "/page", &[], Vec::new()));
    assert_eq!(res.status, 200);
}

#[test]
fn test_trailing_slash_and_case_insensitive_match() {
    let mut app = App::default();
    app.get("/About", |ctx| {
        ctx.send("about");
    });
    let core = app.build().unwrap();
    assert_eq!(body_str(&core.handle(get("/about/"))), "about");
    assert_eq!(body_str(&core.handle(get("/ABOUT"))), "about");
}

#[test]
fn test_etag_and_not_modified() {
    let options = Options {
        etag: true,
        ..Options::default()
    };
    let mut app = App::new(options);
    app.get("/doc", |ctx| {
        ctx.send("document body");
    });
    let core = app.build().unwrap();

    let first = core.handle(get("/doc"));
    let tag = first.get_header("etag").unwrap().to_string();
    assert_eq!(tag, chainrouter::etag::compute(b"document body"));

    let second = core.handle(request("GET", "/doc", &[("If-None-Match", &tag)], Vec::new()));
    assert_eq!(second.status, 304);
    assert!(second.body.is_empty());

    let weak = format!("W/{tag}");
    let third = core.handle(request("GET", "/doc", &[("If-None-Match", &weak)], Vec::new()));
    assert_eq!(third.status, 304);

    let stale = core.handle(request(
        "GET",
        "/doc",
        &[("If-None-Match", "\"0-0000000000000000\"")],
        Vec::new(),
    ));
    assert_eq!(stale.status, 200);
    assert_eq!(body_str(&stale), "document body");
}

#[test]
fn test_etag_disabled_by_default() {
    let mut app = App::default();
    app.get("/doc", |ctx| {
        ctx.send("document body");
    });
    let res = app.build().unwrap().handle(get("/doc"));
    assert_eq!(res.get_header("etag"), None);
}

#[test]
fn test_read_body_and_json_response() {
    #[derive(serde::Deserialize)]
    struct Pet {
        name: String,
    }

    let mut app = App::default();
    app.post("/pets", |ctx| match ctx.read_body::<Pet>() {
        Ok(pet) => {
            let reply = serde_json::json!({ "created": pet.name });
            if let Err(err) = ctx.json(&reply) {
                ctx.next_with(err);
            }
        }
        Err(err) => ctx.next_with(HttpError::with_message(400, err.to_string())),
    })
    .on_error(render_http_error);
    let core = app.build().unwrap();

    let res = core.handle(request(
        "POST",
        "/pets",
        &[("Content-Type", "application/json")],
        br#"{"name":"rex"}"#.to_vec(),
    ));
    assert_eq!(res.status, 200);
    assert_eq!(res.get_header("content-type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body["created"], "rex");

    let bad = core.handle(request(
        "POST",
        "/pets",
        &[("Content-Type", "application/json")],
        b"{not json".to_vec(),
    ));
    assert_eq!(bad.status, 400);
}
