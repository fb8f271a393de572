//! # chainrouter
//!
//! **chainrouter** is an insertion-ordered HTTP router whose handlers form a
//! chain: every matching route runs in registration order for as long as each
//! handler passes control on with [`Context::next`].
//!
//! ## Overview
//!
//! - Route paths compile to literal, wildcard or regex matchers with required
//!   (`:id`) and optional (`:id?`) parameters.
//! - Matching is first-match in registration order; `USE` routes are prefix
//!   middleware for any method.
//! - A pooled [`Context`] carries the dispatch cursor, the matched route's
//!   parameter values, a deferred error slot and the response being built.
//! - Handler objects register their operations by name: `GetUser_id` on an
//!   object with prefix `/api` becomes `GET /api/user/:id`.
//!
//! ## Architecture
//!
//! - **[`router`]** - path pattern compiler, [`router::Route`] and the ordered [`router::RouteTable`]
//! - **[`context`]** - per-request [`Context`] and the [`ContextPool`]
//! - **[`dispatcher`]** - the cursor-driven chain executor
//! - **[`reflect`]** - handler objects and the operation-name transform
//! - **[`app`]** - the [`App`] builder and the built [`Core`]
//! - **[`view`]** - template engine contract and the `minijinja` engine
//! - **[`server`]** - `may_minihttp` transport adapter
//! - **[`logging`]**, **[`runtime_config`]**, **[`cli`]** - ambient setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may_minihttp)
//!     participant Core as Core::handle
//!     participant Pool as ContextPool
//!     participant Disp as next_route
//!     participant Handler
//!
//!     Client->>Server: GET /api/users/7
//!     Server->>Core: http::Request<Vec<u8>>
//!     Core->>Pool: acquire(request)
//!     Pool-->>Core: Context (cursor = -1)
//!     Core->>Disp: dispatch
//!     Disp->>Disp: find_from(cursor + 1)
//!     Disp->>Handler: USE /api middleware
//!     Handler->>Disp: ctx.next()
//!     Disp->>Disp: find_from(cursor + 1)
//!     Disp->>Handler: GET /api/users/:id
//!     Handler-->>Disp: response written
//!     Disp-->>Core: return
//!     Core->>Core: error hook, metrics
//!     Core->>Pool: release(context)
//!     Core-->>Server: Response
//!     Server-->>Client: 200 OK
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use chainrouter::reflect::{HandlerBase, HandlerObject};
//! use chainrouter::{routes, App, Context};
//!
//! #[derive(Default)]
//! struct Pets {
//!     base: HandlerBase,
//! }
//!
//! #[routes]
//! impl Pets {
//!     pub fn get(&self, ctx: &mut Context) {
//!         ctx.send("all pets");
//!     }
//!
//!     #[op("GetPet_id")]
//!     pub fn show(&self, ctx: &mut Context) {
//!         let id = ctx.params("id").unwrap_or_default().to_string();
//!         ctx.send(format!("pet {id}"));
//!     }
//! }
//!
//! impl HandlerObject for Pets {
//!     fn init(&mut self) {
//!         self.base.set_prefix("/pets");
//!     }
//!     fn prefix(&self) -> &str {
//!         self.base.prefix()
//!     }
//! }
//!
//! let mut app = App::default();
//! app.handle(Pets::default());
//! let core = app.build().unwrap();
//!
//! let res = core.handle(http::Request::get("/pets/pet/3").body(Vec::new()).unwrap());
//! assert_eq!(res.body, b"pet 3");
//! ```

extern crate self as chainrouter;

pub mod app;
pub mod cli;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod etag;
pub mod ids;
pub mod logging;
pub mod metrics;
pub mod reflect;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod view;

pub use app::{App, Core};
pub use chainrouter_macros::routes;
pub use context::{Context, ContextPool};
pub use dispatcher::ChainState;
pub use error::{render_http_error, ErrorHandler, HttpError, RouterError};
pub use ids::RequestId;
pub use response::{status_text, Response};
pub use runtime_config::Options;
