//! # Error Module
//!
//! Error types shared by the route table, the application builder and handlers.
//!
//! ## Error Taxonomy
//!
//! - [`RouterError`] - configuration errors raised while the route table is built.
//!   These never reach request handling: [`crate::App::build`] refuses to produce a
//!   [`crate::Core`] when any registration failed.
//! - [`HttpError`] - the conventional per-request error value a handler passes to
//!   [`crate::Context::next_with`]. The core stores it and never renders it; an
//!   [`ErrorHandler`] installed with [`crate::App::on_error`] decides what the client sees.
//! - [`crate::view::ViewError`] - template loading and rendering failures.

use crate::context::Context;
use crate::response::status_text;
use crate::view::ViewError;
use std::fmt;
use std::sync::Arc;

/// Errors raised while registering routes or building the application
#[derive(Debug)]
pub enum RouterError {
    /// A route path produced a pattern the regex engine rejected
    InvalidPattern {
        /// Route path as registered
        path: String,
        /// Generated regular expression source
        pattern: String,
        /// Underlying regex compilation error
        source: regex::Error,
    },
    /// A registration call carried no handler
    MissingHandler { method: String, path: String },
    /// The verb is neither a standard HTTP method nor `USE`/`ALL`
    UnsupportedMethod { method: String },
    /// The view engine failed to load its templates
    ViewLoad(ViewError),
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::InvalidPattern {
                path,
                pattern,
                source,
            } => write!(
                f,
                "invalid path pattern for route '{path}' (compiled as '{pattern}'): {source}"
            ),
            RouterError::MissingHandler { method, path } => {
                write!(f, "missing handler for route {method} {path}")
            }
            RouterError::UnsupportedMethod { method } => {
                write!(f, "unsupported route method '{method}'")
            }
            RouterError::ViewLoad(err) => write!(f, "view engine failed to load: {err}"),
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::InvalidPattern { source, .. } => Some(source),
            RouterError::ViewLoad(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ViewError> for RouterError {
    fn from(err: ViewError) -> Self {
        RouterError::ViewLoad(err)
    }
}

/// An HTTP-flavoured error a handler hands to [`Context::next_with`]
///
/// The message defaults to the standard reason phrase of `code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub code: u16,
    pub message: String,
}

impl HttpError {
    /// Create an error whose message is the standard reason phrase for `code`
    #[must_use]
    pub fn new(code: u16) -> Self {
        Self {
            code,
            message: status_text(code).to_string(),
        }
    }

    /// Create an error with a custom message
    #[must_use]
    pub fn with_message(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Caller-defined translation of a propagated error into a response
///
/// Invoked by [`crate::Core::handle`] after dispatch when a handler stopped the
/// chain with [`Context::next_with`].
pub type ErrorHandler = Arc<dyn Fn(&mut Context, &anyhow::Error) + Send + Sync>;

/// Ready-made [`ErrorHandler`] body
///
/// Writes the status and message of an [`HttpError`]; any other error becomes a
/// 500 with the standard reason phrase.
pub fn render_http_error(ctx: &mut Context, err: &anyhow::Error) {
    match err.downcast_ref::<HttpError>() {
        Some(http_err) => {
            ctx.status(http_err.code);
            ctx.send(http_err.message.as_bytes());
        }
        None => {
            ctx.status(500);
            ctx.send(status_text(500));
        }
    }
}
