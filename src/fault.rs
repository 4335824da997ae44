//! Classification of everything a chain link can fail with.
//!
//! Handlers fail with arbitrary values: a validation library's array, a
//! structured validation object, a real error, a bare string, or some other
//! JSON blob. [`Fault`] is the closed set of shapes the normalizer knows how
//! to render. Recognizers run in a fixed priority order; whatever none of
//! them claims lands in [`Fault::Opaque`].
//!
//! ```text
//! [{ "constraints": {..} }, ..]                  → Fault::Constraints
//! { "name": "ValidationError", "errors": {..} }  → Fault::Validation
//! { "message": "..", "stack": .. }               → Fault::Error
//! "text"                                         → Fault::Message
//! anything else                                  → Fault::Opaque
//! ```

use std::any::Any;
use std::fmt::Write as _;

use serde_json::{Map, Value};
use thiserror::Error;

/// `name` marker of a structured validation error object.
pub const VALIDATION_ERROR: &str = "ValidationError";

const VALIDATION_FALLBACK: &str = "Validation error";
const UNKNOWN_ERROR: &str = "Unknown error";

/// A failure raised by a chain link, classified by shape.
///
/// The [`Display`](std::fmt::Display) form is the human-readable message the
/// normalizer puts in the response body; [`Fault::details`] is the diagnostic
/// value it exposes in debug mode.
#[derive(Debug, Error)]
pub enum Fault {
    /// First element's `constraints` of a validation-library array.
    #[error("{}", first_constraint(.0))]
    Constraints(Map<String, Value>),

    /// `errors` mapping of a `{ name: "ValidationError", errors }` object.
    #[error("{}", first_error_message(.0))]
    Validation(Map<String, Value>),

    /// A real error: its message and a diagnostic trace.
    #[error("{message}")]
    Error { message: String, trace: String },

    #[error("{0}")]
    Message(String),

    #[error("{}", stringify(.0))]
    Opaque(Value),
}

impl Fault {
    /// Classifies an arbitrary JSON value.
    pub fn classify(value: Value) -> Self {
        if let Some(constraints) = constraints_of(&value) {
            return Self::Constraints(constraints.clone());
        }
        if let Some(errors) = validation_errors_of(&value) {
            return Self::Validation(errors.clone());
        }
        if let Some((message, stack)) = error_parts_of(&value) {
            let trace = match stack {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Self::Error { message: message.to_owned(), trace };
        }
        match value {
            Value::String(s) => Self::Message(s),
            other => Self::Opaque(other),
        }
    }

    /// Wraps a Rust error, keeping its `Debug` form and `source()` chain as
    /// the trace.
    pub fn from_error<E: std::error::Error + 'static>(err: E) -> Self {
        Self::describe(&err)
    }

    fn describe(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = format!("{err:?}");
        let mut source = err.source();
        while let Some(cause) = source {
            let _ = write!(trace, "\ncaused by: {cause}");
            source = cause.source();
        }
        Self::Error { message: err.to_string(), trace }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_owned());
        Self::Error { message, trace: "panic inside a chain link".to_owned() }
    }

    /// Diagnostic value for the `error` field of the body. `None` means the
    /// field is omitted entirely.
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Constraints(map) | Self::Validation(map) => Some(Value::Object(map.clone())),
            Self::Error { trace, .. } => Some(Value::String(trace.clone())),
            Self::Message(_) => None,
            Self::Opaque(value) => Some(value.clone()),
        }
    }
}

/// Whether a payload handed to the normalizer is error-shaped on its own,
/// independent of the status code.
pub(crate) fn is_error_shaped(value: &Value) -> bool {
    value.is_string() || constraints_of(value).is_some() || error_parts_of(value).is_some()
}

// ── Recognizers ───────────────────────────────────────────────────────────────

fn constraints_of(value: &Value) -> Option<&Map<String, Value>> {
    value.as_array()?.first()?.get("constraints")?.as_object()
}

fn validation_errors_of(value: &Value) -> Option<&Map<String, Value>> {
    let obj = value.as_object()?;
    if obj.get("name")?.as_str()? != VALIDATION_ERROR {
        return None;
    }
    obj.get("errors")?.as_object()
}

fn error_parts_of(value: &Value) -> Option<(&str, &Value)> {
    let obj = value.as_object()?;
    Some((obj.get("message")?.as_str()?, obj.get("stack")?))
}

// ── Message derivation ────────────────────────────────────────────────────────

fn first_constraint(constraints: &Map<String, Value>) -> String {
    match constraints.values().next() {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => VALIDATION_FALLBACK.to_owned(),
    }
}

fn first_error_message(errors: &Map<String, Value>) -> String {
    errors
        .values()
        .next()
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or(VALIDATION_FALLBACK)
        .to_owned()
}

fn stringify(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| UNKNOWN_ERROR.to_owned())
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl From<&str> for Fault {
    fn from(s: &str) -> Self {
        Self::Message(s.to_owned())
    }
}

impl From<String> for Fault {
    fn from(s: String) -> Self {
        Self::Message(s)
    }
}

impl From<Value> for Fault {
    fn from(value: Value) -> Self {
        Self::classify(value)
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<serde_json::Error> for Fault {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(err)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for Fault {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::describe(&*err)
    }
}
