//! # View Module
//!
//! Narrow contract between handlers and a template engine, plus a
//! [`minijinja`]-backed implementation.
//!
//! Handlers render through [`crate::Context::view`] (default layout) and
//! [`crate::Context::render`] (no layout). A layout is an ordinary template
//! that receives the rendered page as `yield`:
//!
//! ```html
//! <html><body>{{ yield }}</body></html>
//! ```
//!
//! Templates are named by their path relative to the views directory, without
//! the extension: `views/users/show.html` is `users/show`.

use minijinja::{AutoEscape, Environment, Value as TemplateValue};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directories searched when no view engine is configured
pub const DEFAULT_VIEW_DIRS: [&str; 3] = ["./views", "./templates", "./web/views"];

/// Which layout wraps a rendered template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout<'a> {
    /// The engine's configured layout, if any
    Default,
    /// Render the template alone
    None,
    /// A specific layout template
    Named(&'a str),
}

/// Template loading and rendering failures
#[derive(Debug)]
pub enum ViewError {
    /// Templates could not be read or parsed
    Load(String),
    /// No template registered under this name
    NotFound(String),
    /// The template failed while rendering
    Render(String),
    /// Writing the output failed
    Io(io::Error),
    /// Rendering was requested but no view engine is registered
    NoEngine,
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::Load(msg) => write!(f, "template load failed: {msg}"),
            ViewError::NotFound(name) => write!(f, "template '{name}' not found"),
            ViewError::Render(msg) => write!(f, "template render failed: {msg}"),
            ViewError::Io(err) => write!(f, "template output failed: {err}"),
            ViewError::NoEngine => f.write_str("no view engine registered"),
        }
    }
}

impl std::error::Error for ViewError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ViewError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ViewError {
    fn from(err: io::Error) -> Self {
        ViewError::Io(err)
    }
}

/// Contract a template engine fulfils for the router
pub trait ViewEngine: Send + Sync {
    /// Compile all templates eagerly
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Load`] when templates cannot be read or parsed.
    fn load(&self) -> Result<(), ViewError>;

    /// Render `name` with `data` into `out`
    ///
    /// # Errors
    ///
    /// Returns the failure; `out` may hold partial output.
    fn render(
        &self,
        out: &mut dyn io::Write,
        name: &str,
        layout: Layout<'_>,
        data: &Value,
    ) -> Result<(), ViewError>;

    /// Register in-memory templates; names already known are left alone
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Load`] when a template does not parse.
    fn load_templates(&self, templates: &HashMap<String, String>) -> Result<(), ViewError>;
}

/// [`ViewEngine`] backed by `minijinja`
pub struct MiniJinjaViews {
    directory: Option<PathBuf>,
    ext: String,
    layout: Option<String>,
    reload: bool,
    env: RwLock<Environment<'static>>,
    extra: RwLock<BTreeMap<String, String>>,
}

impl MiniJinjaViews {
    /// Engine loading every `*{ext}` file below `directory`
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, ext: &str) -> Self {
        let mut views = Self::in_memory(ext);
        views.directory = Some(directory.into());
        views
    }

    /// Engine without a directory; templates come from [`ViewEngine::load_templates`]
    #[must_use]
    pub fn in_memory(ext: &str) -> Self {
        let ext = if ext.is_empty() || ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        Self {
            directory: None,
            env: RwLock::new(new_environment(&ext)),
            ext,
            layout: None,
            reload: false,
            extra: RwLock::new(BTreeMap::new()),
        }
    }

    /// Default layout used by [`Layout::Default`]
    #[must_use]
    pub fn layout(mut self, name: impl Into<String>) -> Self {
        self.layout = Some(name.into());
        self
    }

    /// Re-read the directory before every render (development only)
    #[must_use]
    pub fn reload(mut self, enabled: bool) -> Self {
        self.reload = enabled;
        self
    }

    #[must_use]
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Read every template file into a fresh environment
    fn build_environment(&self) -> Result<Environment<'static>, ViewError> {
        let mut env = new_environment(&self.ext);
        if let Some(dir) = &self.directory {
            let dir = std::fs::canonicalize(dir)
                .map_err(|e| ViewError::Load(format!("{}: {e}", dir.display())))?;
            let mut files = Vec::new();
            collect_templates(&dir, &self.ext, &mut files)?;
            for path in files {
                let name = template_name(&dir, &path, &self.ext);
                let source = std::fs::read_to_string(&path)
                    .map_err(|e| ViewError::Load(format!("{}: {e}", path.display())))?;
                env.add_template_owned(name, source)
                    .map_err(|e| ViewError::Load(e.to_string()))?;
            }
        }
        for (name, source) in self.extra.read().iter() {
            if env.get_template(name).is_err() {
                env.add_template_owned(name.clone(), source.clone())
                    .map_err(|e| ViewError::Load(e.to_string()))?;
            }
        }
        Ok(env)
    }

    fn render_named(
        env: &Environment<'static>,
        name: &str,
        ctx: &TemplateValue,
    ) -> Result<String, ViewError> {
        let template = env
            .get_template(name)
            .map_err(|_| ViewError::NotFound(name.to_string()))?;
        template
            .render(ctx)
            .map_err(|e| ViewError::Render(e.to_string()))
    }
}

impl ViewEngine for MiniJinjaViews {
    fn load(&self) -> Result<(), ViewError> {
        let env = self.build_environment()?;
        let count = env.templates().count();
        *self.env.write() = env;
        info!(
            directory = ?self.directory,
            ext = %self.ext,
            templates = count,
            "View templates loaded"
        );
        Ok(())
    }

    fn render(
        &self,
        out: &mut dyn io::Write,
        name: &str,
        layout: Layout<'_>,
        data: &Value,
    ) -> Result<(), ViewError> {
        if self.reload {
            self.load()?;
        }
        let env = self.env.read();
        let ctx = TemplateValue::from_serialize(data);
        let page = Self::render_named(&env, name, &ctx)?;

        let layout = match layout {
            Layout::Default => self.layout.as_deref(),
            Layout::None => None,
            Layout::Named(layout) => Some(layout),
        };
        let output = match layout {
            Some(layout) => {
                debug!(template = %name, layout = %layout, "Rendering with layout");
                let mut merged: BTreeMap<String, TemplateValue> = BTreeMap::new();
                if let Value::Object(map) = data {
                    for (key, value) in map {
                        merged.insert(key.clone(), TemplateValue::from_serialize(value));
                    }
                }
                merged.insert("yield".to_string(), TemplateValue::from_safe_string(page));
                Self::render_named(&env, layout, &TemplateValue::from_serialize(&merged))?
            }
            None => page,
        };
        out.write_all(output.as_bytes())?;
        Ok(())
    }

    fn load_templates(&self, templates: &HashMap<String, String>) -> Result<(), ViewError> {
        let mut env = self.env.write();
        let mut extra = self.extra.write();
        for (name, source) in templates {
            if env.get_template(name).is_ok() {
                continue;
            }
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|e| ViewError::Load(e.to_string()))?;
            extra.insert(name.clone(), source.clone());
        }
        Ok(())
    }
}

fn new_environment(ext: &str) -> Environment<'static> {
    let mut env = Environment::new();
    let html = matches!(ext, ".html" | ".htm" | ".xhtml");
    env.set_auto_escape_callback(move |_| if html { AutoEscape::Html } else { AutoEscape::None });
    env
}

fn collect_templates(dir: &Path, ext: &str, files: &mut Vec<PathBuf>) -> Result<(), ViewError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| ViewError::Load(format!("{}: {e}", dir.display())))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_templates(&path, ext, files)?;
        } else if path.to_string_lossy().ends_with(ext) {
            files.push(path);
        }
    }
    Ok(())
}

fn template_name(root: &Path, path: &Path, ext: &str) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    name.strip_suffix(ext).map(str::to_string).unwrap_or(name)
}

/// First of [`DEFAULT_VIEW_DIRS`] that exists
#[must_use]
pub fn discover_view_dir() -> Option<PathBuf> {
    DEFAULT_VIEW_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|dir| dir.is_dir())
}
