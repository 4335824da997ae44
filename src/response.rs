//! Outgoing response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] is exactly what the hosting adapter expects back:
//! `{ statusCode, headers, body }`, with the body already serialized to a
//! string. Build one in your handler and return it, or let the
//! [`Normalizer`](crate::Normalizer) build it for you.

use http::StatusCode;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response in the host's wire shape.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use relay::Response;
/// use http::StatusCode;
///
/// Response::json(r#"{"id":1}"#);
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use relay::Response;
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("Location", "/agents/42")
///     .json(r#"{"id":42}"#);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub(crate) status_code: u16,
    #[serde(serialize_with = "headers_as_map")]
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: String,
}

impl Response {
    /// `200 OK` with `Content-Type: application/json`.
    pub fn json(body: impl Into<String>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with `Content-Type: text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK.as_u16() }
    }

    pub fn status_code(&self) -> u16 { self.status_code }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &str { &self.body }

    /// Exact, case-sensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any entry with the exact same name.
    pub(crate) fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value.to_owned(),
            None => self.headers.push((name.to_owned(), value.to_owned())),
        }
    }
}

fn headers_as_map<S: Serializer>(
    headers: &[(String, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(headers.len()))?;
    for (name, value) in headers {
        map.serialize_entry(name, value)?;
    }
    map.end()
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Headers added
/// later replace earlier ones with the same name.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Raw numeric status; hosts accept codes `http` has no constant for.
    pub fn status_code(mut self, code: u16) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(k, _)| k != name);
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<String>) -> Response {
        self.finish("application/json", body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into())
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        Response { status_code: self.status, headers: self.headers, body: String::new() }
    }

    fn finish(self, content_type: &str, body: String) -> Response {
        let mut response = Response {
            status_code: self.status,
            headers: vec![("Content-Type".to_owned(), content_type.to_owned())],
            body,
        };
        for (name, value) in &self.headers {
            response.set_header(name, value);
        }
        response
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into a [`Response`].
///
/// Implement on your own types to return them directly from handlers or
/// error interceptors.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`StatusCode`] directly: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_host_shape() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("X-Trace", "abc")
            .json(r#"{"ok":true}"#);
        let wire = serde_json::to_value(&res).unwrap();
        assert_eq!(
            wire,
            serde_json::json!({
                "statusCode": 201,
                "headers": { "Content-Type": "application/json", "X-Trace": "abc" },
                "body": r#"{"ok":true}"#,
            })
        );
    }

    #[test]
    fn caller_headers_override_content_type() {
        let res = Response::builder()
            .header("Content-Type", "application/problem+json")
            .json("{}");
        assert_eq!(res.header("Content-Type"), Some("application/problem+json"));
        assert_eq!(res.headers().len(), 1);
    }

    #[test]
    fn header_keys_are_case_sensitive() {
        let res = Response::builder().header("x-a", "1").header("X-A", "2").no_body();
        assert_eq!(res.header("x-a"), Some("1"));
        assert_eq!(res.header("X-A"), Some("2"));
    }

    #[test]
    fn status_only_has_empty_body() {
        let res = StatusCode::NO_CONTENT.into_response();
        assert_eq!(res.status_code(), 204);
        assert!(res.body().is_empty());
    }
}
