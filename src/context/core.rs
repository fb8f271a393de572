use crate::app::Shared;
use crate::dispatcher::{next_route, ChainState};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::response::{status_text, Response};
use crate::router::{normalize_path, ParamValues, Route};
use crate::view::{Layout, ViewError};
use anyhow::{bail, Context as _};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;

/// Per-request state handed to every handler in the chain
///
/// A context is drawn from the [`crate::ContextPool`] when a request arrives and
/// returned to it once the response has been taken. It carries the dispatch
/// cursor, the currently matched route with its parameter values, a deferred
/// error slot, the request and the response being built.
pub struct Context {
    pub(crate) index: isize,
    pub(crate) route: Option<Arc<Route>>,
    pub(crate) values: ParamValues,
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) original_path: String,
    pub(crate) error: Option<anyhow::Error>,
    pub(crate) state: ChainState,
    pub(crate) shared: Option<Arc<Shared>>,
    pub(crate) request: Option<http::Request<Vec<u8>>>,
    pub(crate) response: Response,
    vars: Map<String, Value>,
    request_id: RequestId,
}

impl Context {
    pub(crate) fn new() -> Self {
        Self {
            index: -1,
            route: None,
            values: ParamValues::new(),
            method: Method::GET,
            path: String::from("/"),
            original_path: String::from("/"),
            error: None,
            state: ChainState::Scanning,
            shared: None,
            request: None,
            response: Response::default(),
            vars: Map::new(),
            request_id: RequestId::new(),
        }
    }

    /// Reset for a new request and snapshot its method and path
    pub(crate) fn prepare(&mut self, request: http::Request<Vec<u8>>) {
        self.index = -1;
        self.route = None;
        self.values.clear();
        self.error = None;
        self.state = ChainState::Scanning;
        self.response.reset();
        self.vars.clear();

        self.method = request.method().clone();
        self.original_path.clear();
        self.original_path.push_str(request.uri().path());
        self.path = normalize_path(&self.original_path);
        self.request_id = RequestId::from_header_or_new(
            request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
        );
        self.request = Some(request);
    }

    pub(crate) fn attach(&mut self, shared: Arc<Shared>) {
        self.shared = Some(shared);
    }

    /// Drop every reference held for the previous request
    pub(crate) fn clear(&mut self) {
        self.route = None;
        self.values.clear();
        self.request = None;
        self.error = None;
        self.shared = None;
        self.vars.clear();
        self.response.reset();
    }

    // ----- request state -------------------------------------------------

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Lower-cased request path with trailing slashes trimmed
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request path exactly as received
    #[must_use]
    pub fn original_path(&self) -> &str {
        &self.original_path
    }

    /// Value of a route parameter
    ///
    /// Looks the name up in the matched route's parameter list; wildcard
    /// captures are named `"*"`. An optional parameter absent from the path
    /// reads as `Some("")`, so `None` only means the route has no such name.
    #[must_use]
    pub fn params(&self, name: &str) -> Option<&str> {
        let route = self.route.as_ref()?;
        let position = route.params().iter().position(|p| p.as_ref() == name)?;
        self.values.get(position).map(String::as_str)
    }

    /// All captured parameter values, aligned with the matched route's names
    #[must_use]
    pub fn param_values(&self) -> &[String] {
        &self.values
    }

    /// Route currently executing, if any
    #[must_use]
    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    /// Index of the last route visited, `-1` before dispatch
    #[must_use]
    pub fn cursor(&self) -> isize {
        self.index
    }

    #[must_use]
    pub fn state(&self) -> ChainState {
        self.state
    }

    /// Error stored by [`Context::next_with`]
    #[must_use]
    pub fn error(&self) -> Option<&anyhow::Error> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn request(&self) -> Option<&http::Request<Vec<u8>>> {
        self.request.as_ref()
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    // ----- chain control -------------------------------------------------

    /// Continue the chain with the next matching route
    ///
    /// Clears the current route and parameter values, keeps the cursor and
    /// resumes scanning in the same call stack. Does nothing once the chain
    /// has been halted by [`Context::next_with`].
    pub fn next(&mut self) {
        self.route = None;
        self.values.clear();
        if self.state == ChainState::Halted {
            return;
        }
        next_route(self);
    }

    /// Halt the chain and store `err` for the caller
    pub fn next_with(&mut self, err: impl Into<anyhow::Error>) {
        self.route = None;
        self.values.clear();
        self.error = Some(err.into());
        self.state = ChainState::Halted;
    }

    // ----- request accessors ---------------------------------------------

    /// Request header value (case-insensitive); `referrer` reads `referer`
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = if name.eq_ignore_ascii_case("referrer") {
            "referer"
        } else {
            name
        };
        self.request
            .as_ref()?
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// First query-string value for `name`, URL-decoded
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        let query = self.request.as_ref()?.uri().query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Raw request body
    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.request.as_ref().map_or(&[], |r| r.body().as_slice())
    }

    /// Decode the request body according to its content type
    ///
    /// - `application/json`, `text/plain`: JSON
    /// - `application/x-www-form-urlencoded`: form fields
    /// - anything else with a non-empty query string: query fields
    ///
    /// Form and query fields decode as strings; repeated keys become arrays.
    ///
    /// # Errors
    ///
    /// Fails on malformed input, on a shape that does not fit `T`, and on an
    /// unsupported content type without query fallback.
    pub fn read_body<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let content_type = self
            .header("content-type")
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/json") || content_type.starts_with("text/plain")
        {
            return serde_json::from_slice(self.body()).context("failed to decode JSON body");
        }
        if content_type.starts_with("application/x-www-form-urlencoded") {
            let fields = fields_to_value(url::form_urlencoded::parse(self.body()));
            return serde_json::from_value(fields).context("failed to decode form body");
        }
        if let Some(query) = self
            .request
            .as_ref()
            .and_then(|r| r.uri().query())
            .filter(|q| !q.is_empty())
        {
            let fields = fields_to_value(url::form_urlencoded::parse(query.as_bytes()));
            return serde_json::from_value(fields).context("failed to decode query string");
        }
        bail!("cannot decode body with content type '{content_type}'")
    }

    // ----- response writers ----------------------------------------------

    /// Set a response header
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.response.set_header(name, value);
        self
    }

    /// Set the response status
    pub fn status(&mut self, code: u16) -> &mut Self {
        self.response.status = code;
        self
    }

    /// Replace the response body
    pub fn send(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        self.response.set_body(body);
        self
    }

    /// Append to the response body
    pub fn write(&mut self, body: impl AsRef<[u8]>) -> &mut Self {
        self.response.append_body(body);
        self
    }

    /// Set the status; write its reason phrase when the body is still empty
    pub fn send_status(&mut self, code: u16) -> &mut Self {
        self.response.status = code;
        if self.response.is_body_empty() {
            self.response.set_body(status_text(code));
        }
        self
    }

    /// Serialize `data` as the JSON response body
    ///
    /// # Errors
    ///
    /// Returns the serialization error; the response is left untouched.
    pub fn json<T: Serialize + ?Sized>(&mut self, data: &T) -> serde_json::Result<()> {
        let raw = serde_json::to_vec(data)?;
        self.set("Content-Type", "application/json");
        self.response.body = raw;
        Ok(())
    }

    /// Send `data` wrapped in a JSONP callback (`callback` by default)
    ///
    /// # Errors
    ///
    /// Returns the serialization error.
    pub fn jsonp<T: Serialize + ?Sized>(
        &mut self,
        data: &T,
        callback: Option<&str>,
    ) -> serde_json::Result<()> {
        let raw = serde_json::to_string(data)?;
        let callback = callback.unwrap_or("callback");
        self.set("X-Content-Type-Options", "nosniff");
        self.set("Content-Type", "application/javascript");
        self.send(format!("{callback}({raw});"));
        Ok(())
    }

    /// Send the `{status, result, msg}` envelope
    ///
    /// # Errors
    ///
    /// Returns the serialization error.
    pub fn to_json<T: Serialize + ?Sized>(
        &mut self,
        data: &T,
        err: Option<&dyn Display>,
    ) -> serde_json::Result<()> {
        let result = serde_json::to_value(data)?;
        let envelope = match err {
            Some(err) => json!({ "status": false, "result": result, "msg": err.to_string() }),
            None => json!({ "status": true, "result": result, "msg": "success" }),
        };
        self.json(&envelope)
    }

    /// Redirect with 302 Found
    pub fn redirect(&mut self, location: &str) -> &mut Self {
        self.redirect_with(location, 302)
    }

    /// Redirect with an explicit status code
    pub fn redirect_with(&mut self, location: &str, code: u16) -> &mut Self {
        self.set("Location", location);
        self.status(code)
    }

    // ----- request-local values ------------------------------------------

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    // ----- views ---------------------------------------------------------

    /// Render a template with the default layout into the response body
    ///
    /// Without `data` the request-local values set by [`Context::set_var`] are
    /// the binding. Sets status 500 when rendering fails.
    ///
    /// # Errors
    ///
    /// Returns the view error for the caller to translate.
    pub fn view(&mut self, name: &str, data: Option<&Value>) -> Result<(), ViewError> {
        self.render_with(name, Layout::Default, data)
    }

    /// Render a template without any layout
    ///
    /// # Errors
    ///
    /// Returns the view error for the caller to translate.
    pub fn render(&mut self, name: &str, data: Option<&Value>) -> Result<(), ViewError> {
        self.render_with(name, Layout::None, data)
    }

    fn render_with(
        &mut self,
        name: &str,
        layout: Layout<'_>,
        data: Option<&Value>,
    ) -> Result<(), ViewError> {
        self.set("Content-Type", "text/html");
        let binding: Cow<'_, Value> = match data {
            Some(value) => Cow::Borrowed(value),
            None => Cow::Owned(Value::Object(self.vars.clone())),
        };
        let Some(views) = self.shared.as_ref().and_then(|s| s.views.clone()) else {
            self.send_status(500);
            return Err(ViewError::NoEngine);
        };
        let result = views.render(&mut self.response.body, name, layout, &binding);
        if result.is_err() {
            self.send_status(500);
        }
        result
    }
}

/// Collect decoded key/value pairs into a JSON object, repeated keys as arrays
fn fields_to_value<'a, I>(pairs: I) -> Value
where
    I: Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>,
{
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value.into_owned());
        match map.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn ctx_for(request: http::Request<Vec<u8>>) -> Context {
        let mut ctx = Context::new();
        ctx.prepare(request);
        ctx
    }

    fn get(uri: &str) -> http::Request<Vec<u8>> {
        http::Request::builder().uri(uri).body(Vec::new()).unwrap()
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Login {
        user: String,
        tags: Option<Vec<String>>,
    }

    #[test]
    fn test_prepare_snapshots_path() {
        let ctx = ctx_for(get("/Users/Bob/?x=1"));
        assert_eq!(ctx.path(), "/users/bob");
        assert_eq!(ctx.original_path(), "/Users/Bob/");
        assert_eq!(ctx.cursor(), -1);
        assert_eq!(ctx.method(), Method::GET);
    }

    #[test]
    fn test_header_and_referrer_alias() {
        let req = http::Request::builder()
            .uri("/")
            .header("Referer", "https://example.com")
            .header("X-Token", "abc")
            .body(Vec::new())
            .unwrap();
        let ctx = ctx_for(req);
        assert_eq!(ctx.header("referrer"), Some("https://example.com"));
        assert_eq!(ctx.header("x-token"), Some("abc"));
        assert_eq!(ctx.header("missing"), None);
    }

    #[test]
    fn test_query_decodes() {
        let ctx = ctx_for(get("/search?q=hello%20world&page=2"));
        assert_eq!(ctx.query("q").as_deref(), Some("hello world"));
        assert_eq!(ctx.query("page").as_deref(), Some("2"));
        assert_eq!(ctx.query("none"), None);
    }

    #[test]
    fn test_read_body_json_form_and_query() {
        let json_req = http::Request::builder()
            .uri("/")
            .header("content-type", "application/json; charset=utf-8")
            .body(br#"{"user":"ann"}"#.to_vec())
            .unwrap();
        let login: Login = ctx_for(json_req).read_body().unwrap();
        assert_eq!(login.user, "ann");

        let form_req = http::Request::builder()
            .uri("/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(b"user=bob&tags=a&tags=b".to_vec())
            .unwrap();
        let login: Login = ctx_for(form_req).read_body().unwrap();
        assert_eq!(login.user, "bob");
        assert_eq!(login.tags, Some(vec!["a".to_string(), "b".to_string()]));

        let login: Login = ctx_for(get("/?user=cy")).read_body().unwrap();
        assert_eq!(login.user, "cy");
    }

    #[test]
    fn test_read_body_unsupported_type() {
        let req = http::Request::builder()
            .uri("/")
            .header("content-type", "application/octet-stream")
            .body(vec![1, 2, 3])
            .unwrap();
        let result: anyhow::Result<Login> = ctx_for(req).read_body();
        assert!(result.is_err());
    }

    #[test]
    fn test_send_status_keeps_existing_body() {
        let mut ctx = ctx_for(get("/"));
        ctx.send_status(404);
        assert_eq!(ctx.response().body, b"Not Found");

        ctx.send("custom").send_status(500);
        assert_eq!(ctx.response().status, 500);
        assert_eq!(ctx.response().body, b"custom");
    }

    #[test]
    fn test_send_and_write() {
        let mut ctx = ctx_for(get("/"));
        ctx.write("a").write("b");
        assert_eq!(ctx.response().body, b"ab");
        ctx.send("c");
        assert_eq!(ctx.response().body, b"c");
    }

    #[test]
    fn test_json_helpers() {
        let mut ctx = ctx_for(get("/"));
        ctx.json(&json!({"a": 1})).unwrap();
        assert_eq!(ctx.response().get_header("content-type"), Some("application/json"));
        assert_eq!(ctx.response().body, br#"{"a":1}"#);

        ctx.jsonp(&json!([1]), Some("cb")).unwrap();
        assert_eq!(ctx.response().body, b"cb([1]);");
        assert_eq!(ctx.response().get_header("x-content-type-options"), Some("nosniff"));

        ctx.to_json(&json!(5), None).unwrap();
        let body: Value = serde_json::from_slice(&ctx.response().body).unwrap();
        assert_eq!(body, json!({"status": true, "result": 5, "msg": "success"}));

        let err = crate::HttpError::new(400);
        ctx.to_json(&Value::Null, Some(&err)).unwrap();
        let body: Value = serde_json::from_slice(&ctx.response().body).unwrap();
        assert_eq!(body["status"], json!(false));
        assert_eq!(body["msg"], json!("Bad Request"));
    }

    #[test]
    fn test_redirect() {
        let mut ctx = ctx_for(get("/"));
        ctx.redirect("/login");
        assert_eq!(ctx.response().status, 302);
        assert_eq!(ctx.response().get_header("location"), Some("/login"));
        ctx.redirect_with("/home", 301);
        assert_eq!(ctx.response().status, 301);
    }

    #[test]
    fn test_vars() {
        let mut ctx = ctx_for(get("/"));
        ctx.set_var("name", "ann");
        assert_eq!(ctx.var("name"), Some(&json!("ann")));
        assert_eq!(ctx.var("other"), None);
    }

    #[test]
    fn test_next_with_halts_and_stores_error() {
        let mut ctx = ctx_for(get("/"));
        ctx.next_with(crate::HttpError::new(401));
        assert_eq!(ctx.state(), ChainState::Halted);
        let err = ctx.error().unwrap();
        assert_eq!(err.downcast_ref::<crate::HttpError>().unwrap().code, 401);

        // Halted chains stay halted.
        ctx.next();
        assert_eq!(ctx.state(), ChainState::Halted);
        assert!(ctx.response().is_body_empty());
    }

    #[test]
    fn test_view_without_engine_is_error() {
        let mut ctx = ctx_for(get("/"));
        let err = ctx.view("index", None).unwrap_err();
        assert!(matches!(err, ViewError::NoEngine));
        assert_eq!(ctx.response().status, 500);
    }

    #[test]
    fn test_request_id_from_header() {
        let id = RequestId::new();
        let req = http::Request::builder()
            .uri("/")
            .header("x-request-id", id.to_string())
            .body(Vec::new())
            .unwrap();
        assert_eq!(ctx_for(req).request_id(), id);

        let req = http::Request::builder()
            .uri("/")
            .header("x-request-id", "not-a-ulid")
            .body(Vec::new())
            .unwrap();
        assert_ne!(ctx_for(req).request_id().to_string(), "not-a-ulid");
    }
}
