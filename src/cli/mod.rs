//! # CLI Module
//!
//! Command-line interface for the `chainrouter` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! chainrouter serve --addr 0.0.0.0:8080 --views ./views --etag
//! ```
//!
//! Options come from `--config <FILE>` when given, otherwise from the
//! `CHAINR_*` environment variables; `--views`, `--debug` and `--etag`
//! override either source. SIGINT or SIGTERM stops the server.
//!
//! ### `routes`
//!
//! ```bash
//! chainrouter routes
//! ```
//!
//! Prints the auto-registration banner and the full route table in match order.

mod commands;


pub use commands::{resolve_options, run_cli, Cli, Commands};
