//! Runtime configuration.
//!
//! Only the response normalizer consults it. The router hands it over once at
//! construction, so normalization never reads the process environment on the
//! hot path and tests stay deterministic.

use serde::Deserialize;

/// Environment variable that toggles error-detail exposure.
pub const DEBUG_VAR: &str = "DEBUG";

/// Normalizer configuration.
///
/// ```rust
/// use relay::Config;
///
/// let cfg = Config { debug: false, ..Config::default() };
/// assert_eq!(cfg.cors_origin, "*");
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// When `false`, error bodies carry a generic message and a `null` error.
    pub debug: bool,
    /// Value of the `Access-Control-Allow-Origin` default header.
    pub cors_origin: String,
}

impl Config {
    /// Reads `DEBUG` from the environment at call time.
    ///
    /// Debug mode stays on unless the variable is set to a falsy string.
    pub fn from_env() -> Self {
        let raw = std::env::var(DEBUG_VAR).ok();
        Self { debug: debug_enabled(raw.as_deref()), ..Self::default() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { debug: true, cors_origin: "*".to_owned() }
    }
}

/// `None` (unset) means enabled; `""`, `0`, `false`, `no` and `off` disable.
pub(crate) fn debug_enabled(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
    }
}
