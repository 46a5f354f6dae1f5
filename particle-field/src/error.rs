// error.rs - Field errors
//
// The visual side degrades quietly (missing mount, stalled images). These are
// the conditions that can't: bad configuration and a missing or failing DOM.

use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("configuration has no particle sources")]
    NoSources,

    #[error("amountOfParticles must be at least 1")]
    NoParticles,

    #[error("motionAmplitude must be a finite, non-negative number (got {0})")]
    InvalidAmplitude(f64),

    #[error("motionPeriod must be a finite, positive number (got {0})")]
    InvalidPeriod(f64),

    #[error("range `{name}` is invalid: min {min} > max {max} or not finite")]
    InvalidRange { name: &'static str, min: f64, max: f64 },

    #[error("malformed configuration: {0}")]
    Json(String),

    #[error("no global `{0}` object")]
    MissingGlobal(&'static str),

    #[error("animation frame callback is not installed")]
    NoFrameCallback,

    #[error("DOM call failed: {0}")]
    Dom(String),
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::Json(err.to_string())
    }
}

impl From<JsValue> for FieldError {
    fn from(value: JsValue) -> Self {
        match value.as_string() {
            Some(s) => FieldError::Dom(s),
            None => FieldError::Dom(format!("{value:?}")),
        }
    }
}

impl From<FieldError> for JsValue {
    fn from(err: FieldError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}
