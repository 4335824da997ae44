//! Host event and invocation context.
//!
//! The host delivers each invocation as an HTTP API (payload v2) event. It
//! has already resolved the route template and extracted path parameters;
//! [`Event`] is only deserialized and reshaped into a [`Request`].

use std::collections::HashMap;

use http::Method;
use serde::Deserialize;

use crate::error::Error;
use crate::request::Request;

/// An HTTP API payload v2 event.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    /// `"<METHOD> <template>"`, or `$default` for catch-all integrations.
    pub route_key: String,
    pub raw_path: String,
    pub raw_query_string: String,
    pub cookies: Vec<String>,
    pub headers: HashMap<String, String>,
    pub query_string_parameters: Option<HashMap<String, String>>,
    pub path_parameters: Option<HashMap<String, String>>,
    pub request_context: RequestContext,
    pub body: Option<String>,
    pub is_base64_encoded: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestContext {
    pub request_id: String,
    pub http: HttpDescription,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpDescription {
    pub method: String,
    pub path: String,
    pub source_ip: String,
    pub user_agent: String,
}

impl Event {
    /// Decodes the raw invocation payload handed over by the host.
    pub fn from_slice(payload: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(payload)?)
    }
}

impl From<Event> for Request {
    fn from(event: Event) -> Self {
        // The route key's own method wins so `ANY /x` style keys stay intact.
        let (method, template) = match event.route_key.split_once(' ') {
            Some((method, template)) => (method.to_owned(), template.to_owned()),
            None => (event.request_context.http.method.clone(), event.route_key.clone()),
        };
        let method = Method::from_bytes(method.as_bytes()).unwrap_or_default();

        let query = if event.raw_query_string.is_empty() {
            split_joined_values(event.query_string_parameters.unwrap_or_default())
        } else {
            url::form_urlencoded::parse(event.raw_query_string.as_bytes())
                .into_owned()
                .collect()
        };

        let mut headers: Vec<(String, String)> = event.headers.into_iter().collect();
        if !event.cookies.is_empty() {
            headers.push(("cookie".to_owned(), event.cookies.join("; ")));
        }

        let raw_path = if event.raw_path.is_empty() {
            event.request_context.http.path
        } else {
            event.raw_path
        };

        Self {
            method,
            raw_path,
            path_template: template,
            path_params: event.path_parameters.unwrap_or_default(),
            query,
            headers,
            is_base64_encoded: event.is_base64_encoded,
            raw_body: event.body,
            ..Self::default()
        }
    }
}

/// The host joins repeated query values with commas.
fn split_joined_values(params: HashMap<String, String>) -> Vec<(String, String)> {
    params
        .into_iter()
        .flat_map(|(k, v)| {
            v.split(',').map(|part| (k.clone(), part.to_owned())).collect::<Vec<_>>()
        })
        .collect()
}

/// Opaque per-invocation metadata, handed to every link untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Context {
    #[serde(alias = "awsRequestId")]
    pub request_id: String,
    pub function_name: String,
    pub function_version: String,
    pub invoked_function_arn: String,
    pub memory_limit_in_mb: Option<u32>,
    /// Epoch milliseconds after which the host aborts the invocation.
    pub deadline_ms: Option<u64>,
}
