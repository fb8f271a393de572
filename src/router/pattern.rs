//! Path pattern compiler.
//!
//! Turns a registered route path into the matcher used at request time:
//!
//! | Path            | Params          | Matcher                          |
//! |-----------------|-----------------|----------------------------------|
//! | `/`             | none            | [`Matcher::Slash`]               |
//! | `/users`        | none            | [`Matcher::Literal`]             |
//! | `*`, `/*`       | `["*"]`         | [`Matcher::Any`]                 |
//! | `/users/:id`    | `["id"]`        | `^/users/([^/]+?)/?$`            |
//! | `/users/:id?`   | `["id"]`        | `^/users(?:/([^/]+?))?/?$`       |
//! | `/files/*`      | `["*"]`         | `^/files/(.*)/?$`                |
//!
//! Literal segments are copied into the regex verbatim. Parameter names keep the
//! casing they were registered with; everything else is matched against the
//! lower-cased path.

use crate::error::RouterError;
use regex::Regex;
use std::sync::Arc;

/// How a route compares its path against the request path
#[derive(Debug, Clone)]
pub enum Matcher {
    /// `*` / `/*`, or a middleware mounted at `/`: matches everything
    Any,
    /// Exactly `/`
    Slash,
    /// Equality with the normalized route path (prefix test for middleware)
    Literal,
    /// Full-string regex match, one capture group per parameter
    Pattern(Regex),
}

impl Matcher {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Matcher::Any => "any",
            Matcher::Slash => "slash",
            Matcher::Literal => "literal",
            Matcher::Pattern(_) => "pattern",
        }
    }
}

/// Output of [`compile`]
#[derive(Debug, Clone)]
pub struct CompiledPath {
    /// Path as registered, with a leading `/` added when missing
    pub raw: String,
    /// Lower-cased path with trailing slashes trimmed (root exempt)
    pub normalized: String,
    /// Parameter names in left-to-right order; `"*"` marks a wildcard capture
    pub params: Vec<Arc<str>>,
    pub matcher: Matcher,
}

/// Normalize a path the way both registration and requests do
///
/// Empty becomes `/`, a leading `/` is added, the path is lower-cased and
/// trailing slashes are removed unless the path is the root.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        out.push('/');
    }
    out.push_str(&path.to_lowercase());
    if out.len() > 1 {
        let trimmed = out.trim_end_matches('/').len();
        out.truncate(trimmed);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Extract parameter names from a route path
///
/// `:name` and `:name?` contribute `name`; any other segment containing `*`
/// contributes the wildcard token `"*"`.
#[must_use]
pub fn extract_params(path: &str) -> Vec<Arc<str>> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                let name: String = name.chars().filter(|c| *c != ':' && *c != '?').collect();
                Some(Arc::from(name))
            } else if segment.contains('*') {
                Some(Arc::from("*"))
            } else {
                None
            }
        })
        .collect()
}

/// Build the regex source for a (normalized) route path
///
/// # Example
///
/// ```
/// use chainrouter::router::pattern_source;
///
/// assert_eq!(pattern_source("/users/:id?"), "^/users(?:/([^/]+?))?/?$");
/// ```
#[must_use]
pub fn pattern_source(path: &str) -> String {
    let mut pattern = String::with_capacity(path.len() + 16);
    pattern.push('^');
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment.starts_with(':') {
            if segment.contains('?') {
                pattern.push_str("(?:/([^/]+?))?");
            } else {
                pattern.push_str("/([^/]+?)");
            }
        } else if let Some((before, after)) = segment.split_once('*') {
            pattern.push('/');
            pattern.push_str(before);
            pattern.push_str("(.*)");
            pattern.push_str(after);
        } else {
            pattern.push('/');
            pattern.push_str(segment);
        }
    }
    pattern.push_str("/?$");
    pattern
}

/// Compile a route path into a [`CompiledPath`]
///
/// Middleware paths never get a regex: they are matched by prefix.
///
/// # Errors
///
/// Returns [`RouterError::InvalidPattern`] when the generated regex does not compile.
pub fn compile(path: &str, middleware: bool) -> Result<CompiledPath, RouterError> {
    let raw = if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    let normalized = normalize_path(&raw);
    let params = extract_params(&raw);

    let is_any = normalized == "/*" || (middleware && normalized == "/");
    let matcher = if is_any {
        Matcher::Any
    } else if normalized == "/" {
        Matcher::Slash
    } else if params.is_empty() || middleware {
        Matcher::Literal
    } else {
        let source = pattern_source(&normalized);
        let regex = Regex::new(&source).map_err(|err| RouterError::InvalidPattern {
            path: raw.clone(),
            pattern: source.clone(),
            source: err,
        })?;
        Matcher::Pattern(regex)
    };

    Ok(CompiledPath {
        raw,
        normalized,
        params,
        matcher,
    })
}
