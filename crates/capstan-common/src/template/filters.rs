//! Custom filters for manifest templates
//!
//! - `default`: fallback for undefined or none values
//! - `base64_encode`: encode a string for Secret `data`
//! - `required`: fail if value is undefined or none

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{Error, ErrorKind, Value};

/// Default filter - returns fallback if value is undefined or none
///
/// Usage: `{{ value | default("fallback") }}`
pub fn default_filter(value: Value, fallback: Value) -> Value {
    if value.is_undefined() || value.is_none() {
        fallback
    } else {
        value
    }
}

/// Base64 encode filter
///
/// Usage: `{{ value | base64_encode }}`
pub fn base64_encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Required filter - fails if value is undefined or none
///
/// Usage: `{{ value | required }}`
pub fn required(value: Value) -> Result<Value, Error> {
    if value.is_undefined() || value.is_none() {
        Err(Error::new(
            ErrorKind::UndefinedError,
            "required value is missing",
        ))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_replaces_undefined_and_none() {
        let fallback = Value::from(3);
        assert_eq!(default_filter(Value::UNDEFINED, fallback.clone()), fallback);
        assert_eq!(default_filter(Value::from(()), fallback.clone()), fallback);
        assert_eq!(default_filter(Value::from(5), fallback), Value::from(5));
    }

    #[test]
    fn base64_encode_encodes_utf8() {
        assert_eq!(base64_encode("clouds: {}"), "Y2xvdWRzOiB7fQ==");
    }

    #[test]
    fn required_rejects_none() {
        assert!(required(Value::from(())).is_err());
        assert!(required(Value::UNDEFINED).is_err());
        assert_eq!(required(Value::from("x")).unwrap(), Value::from("x"));
    }
}
