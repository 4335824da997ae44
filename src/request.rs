//! Inbound request type.

use std::collections::HashMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::{Extensions, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// One HTTP invocation, as described by the host.
///
/// Path parameters arrive already extracted; the router never matches
/// patterns itself. Before the first chain link runs, the raw body is replaced
/// by its JSON parse: [`Request::body`] is `None` for absent or malformed
/// bodies, never an error.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) raw_path: String,
    pub(crate) path_template: String,
    pub(crate) path_params: HashMap<String, String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) is_base64_encoded: bool,
    pub(crate) raw_body: Option<String>,
    pub(crate) body: Option<Value>,
    pub(crate) extensions: Extensions,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder { req: Self::default(), template: None }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.raw_path }
    pub fn path_template(&self) -> &str { &self.path_template }
    pub fn params(&self) -> &HashMap<String, String> { &self.path_params }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// `"<METHOD> <pathTemplate>"`, the exact-match lookup key.
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.path_template)
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/agents/{id}`, `req.param("id")` on `/agents/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.path_params.get(key).map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated query parameter, in order.
    pub fn query_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query.iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The parsed JSON body.
    pub fn body(&self) -> Option<&Value> { self.body.as_ref() }

    /// The raw body, until dispatch replaces it with [`Request::body`].
    pub fn raw_body(&self) -> Option<&str> { self.raw_body.as_deref() }

    /// Deserializes the parsed body into `T`. Absent or mismatched bodies
    /// yield `None`.
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.body.clone()?).ok()
    }

    /// Typed per-request storage. Middleware puts values here for the links
    /// that follow it.
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Replaces the raw body with its best-effort JSON parse.
    pub(crate) fn parse_body(&mut self) {
        let raw = self.raw_body.take();
        self.body = raw.and_then(|raw| parse_json(&raw, self.is_base64_encoded));
    }
}

fn parse_json(raw: &str, base64: bool) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    if base64 {
        let bytes = STANDARD.decode(raw).ok()?;
        return serde_json::from_slice(&bytes).ok();
    }
    serde_json::from_str(raw).ok()
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Builder for [`Request`], used by host adapters and tests.
///
/// ```rust
/// use relay::Request;
/// use http::Method;
///
/// let req = Request::builder()
///     .method(Method::GET)
///     .path("/agents/42")
///     .template("/agents/{id}")
///     .param("id", "42")
///     .build();
/// assert_eq!(req.route_key(), "GET /agents/{id}");
/// ```
pub struct RequestBuilder {
    req: Request,
    template: Option<String>,
}

impl RequestBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.req.method = method;
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.req.raw_path = path.to_owned();
        self
    }

    /// Path template as resolved by the host. Defaults to the raw path.
    pub fn template(mut self, template: &str) -> Self {
        self.template = Some(template.to_owned());
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.req.path_params.insert(name.to_owned(), value.to_owned());
        self
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.req.query.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.req.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.req.raw_body = Some(body.into());
        self
    }

    pub fn base64_encoded(mut self, yes: bool) -> Self {
        self.req.is_base64_encoded = yes;
        self
    }

    pub fn build(mut self) -> Request {
        self.req.path_template = self.template.unwrap_or_else(|| self.req.raw_path.clone());
        self.req
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn parsed(body: &str) -> Request {
        let mut req = Request::builder().body(body).build();
        req.parse_body();
        req
    }

    #[test]
    fn json_body_is_parsed_and_raw_body_consumed() {
        let req = parsed(r#"{"name":"Alice"}"#);
        assert_eq!(req.body(), Some(&json!({ "name": "Alice" })));
        assert_eq!(req.raw_body(), None);
    }

    #[test]
    fn malformed_body_is_absent() {
        assert_eq!(parsed("not json").body(), None);
        assert_eq!(parsed("").body(), None);
    }

    #[test]
    fn absent_body_stays_absent() {
        let mut req = Request::builder().build();
        req.parse_body();
        assert_eq!(req.body(), None);
    }

    #[test]
    fn base64_body_is_decoded_first() {
        let mut req = Request::builder()
            .body(STANDARD.encode(r#"{"n":1}"#))
            .base64_encoded(true)
            .build();
        req.parse_body();
        assert_eq!(req.body(), Some(&json!({ "n": 1 })));

        let mut bad = Request::builder().body("%%%").base64_encoded(true).build();
        bad.parse_body();
        assert_eq!(bad.body(), None);
    }

    #[test]
    fn typed_body() {
        #[derive(Deserialize)]
        struct Agent {
            name: String,
        }
        let req = parsed(r#"{"name":"Alice"}"#);
        assert_eq!(req.json::<Agent>().map(|a| a.name).as_deref(), Some("Alice"));
        assert!(parsed("[1]").json::<Agent>().is_none());
    }

    #[test]
    fn template_defaults_to_raw_path() {
        let req = Request::builder().method(Method::POST).path("/agents").build();
        assert_eq!(req.route_key(), "POST /agents");
    }

    #[test]
    fn lookups() {
        let req = Request::builder()
            .header("Content-Type", "application/json")
            .query("tag", "a")
            .query("tag", "b")
            .build();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.query("tag"), Some("a"));
        assert_eq!(req.query_all("tag").collect::<Vec<_>>(), ["a", "b"]);
    }
}
