//! Response normalization.
//!
//! Turns an arbitrary success payload or an arbitrary failure into the fixed
//! wire shape. Every body is JSON, every response carries the same default
//! headers, and every error body looks like:
//!
//! ```json
//! { "success": false, "message": "...", "error": <details> }
//! ```
//!
//! With debug mode off, `message` is always `"Internal Server Error"` and
//! `error` is `null`, whatever the failure was.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::config::Config;
use crate::fault::{Fault, is_error_shaped};
use crate::response::Response;

/// Message used for every error body when debug mode is off.
pub const GENERIC_ERROR: &str = "Internal Server Error";

const SUCCESS: &str = "Success";

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

/// Builds normalized responses under one [`Config`].
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    config: Config,
}

impl Normalizer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Normalizes an arbitrary JSON payload.
    ///
    /// The payload is an error if it is error-shaped (a string, a
    /// validation-library array, a `message` + `stack` object) or if
    /// `status` is 400 or above. `status` defaults to 500 for errors and 200
    /// otherwise. `headers` override the defaults on exact key collision.
    ///
    /// ```rust
    /// use relay::{Config, Normalizer};
    /// use serde_json::json;
    ///
    /// let n = Normalizer::new(Config::default());
    /// let res = n.normalize(json!("Something went wrong"), Some(400), &[]);
    /// assert_eq!(res.status_code(), 400);
    /// assert_eq!(res.body(), r#"{"success":false,"message":"Something went wrong"}"#);
    /// ```
    pub fn normalize(&self, payload: Value, status: Option<u16>, headers: &[(&str, &str)]) -> Response {
        let is_error = is_error_shaped(&payload) || status.is_some_and(|s| s >= 400);
        if is_error {
            return self.fault(&Fault::classify(payload), status.unwrap_or(500), headers);
        }
        self.payload(&payload, status.unwrap_or(200), headers)
    }

    /// `200 OK` with `payload` serialized as the body.
    pub fn success<T: Serialize + ?Sized>(&self, payload: &T) -> Response {
        self.payload(payload, 200, &[])
    }

    /// Renders an already-classified fault.
    pub fn fault(&self, fault: &Fault, status: u16, headers: &[(&str, &str)]) -> Response {
        let (message, error) = if self.config.debug {
            (fault.to_string(), fault.details())
        } else {
            (GENERIC_ERROR.to_owned(), Some(Value::Null))
        };
        let body = ErrorBody { success: false, message: &message, error };
        self.format(status, &body, headers)
    }

    /// `{ "message": message }` with the given status. Used for the fixed
    /// responses the dispatcher manufactures itself.
    pub(crate) fn message(&self, status: u16, message: &str) -> Response {
        self.format(status, &json!({ "message": message }), &[])
    }

    fn payload<T: Serialize + ?Sized>(&self, payload: &T, status: u16, headers: &[(&str, &str)]) -> Response {
        match serde_json::to_value(payload) {
            Ok(Value::Null) => self.format(status, &json!({ "message": SUCCESS }), headers),
            Ok(value) => self.format(status, &value, headers),
            Err(e) => self.fault(&Fault::from(e), 500, headers),
        }
    }

    fn format<T: Serialize + ?Sized>(&self, status: u16, body: &T, headers: &[(&str, &str)]) -> Response {
        let body = serde_json::to_string(body).unwrap_or_else(|e| {
            error!("failed to serialize response body: {e}");
            format!(r#"{{"success":false,"message":"{GENERIC_ERROR}"}}"#)
        });
        let mut response = Response {
            status_code: status,
            headers: vec![
                ("Access-Control-Allow-Origin".to_owned(), self.config.cors_origin.clone()),
                ("Content-Type".to_owned(), "application/json".to_owned()),
            ],
            body,
        };
        for (name, value) in headers {
            response.set_header(name, value);
        }
        response
    }
}
