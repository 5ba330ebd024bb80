//! Leaf checks used while resolving placeholders

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::value::Value;

/// Render a value for textual substitution.
///
/// Only strings and numbers can be embedded in text. Floats use the
/// shortest representation that round-trips, so `1.0` becomes `"1"`.
/// No exponent form is produced: `1e20` is written out in full.
pub fn coerce_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        other => Err(Error::invalid_scalar(other.type_name())),
    }
}

/// The first match of a key lookup, or a not-found error naming `key`
pub fn require_found<'a>(found: Option<&'a Value>, key: &str) -> Result<&'a Value> {
    found.ok_or_else(|| Error::not_found(key))
}

/// Value of environment variable `name`; empty values are valid
pub fn require_env(env: &dyn Environment, name: &str) -> Result<String> {
    env.var(name).ok_or_else(|| Error::env_not_defined(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::Mapping;
    use std::collections::HashMap;

    #[test]
    fn test_coerce_strings_and_numbers() {
        assert_eq!(coerce_to_string(&"myHome".into()).unwrap(), "myHome");
        assert_eq!(coerce_to_string(&Value::Integer(4)).unwrap(), "4");
        assert_eq!(coerce_to_string(&Value::Integer(-12)).unwrap(), "-12");
        assert_eq!(coerce_to_string(&Value::Float(1.5)).unwrap(), "1.5");
        assert_eq!(coerce_to_string(&Value::Float(2.0)).unwrap(), "2");
    }

    #[test]
    fn test_coerce_floats_without_exponent() {
        assert_eq!(
            coerce_to_string(&Value::Float(1e20)).unwrap(),
            "100000000000000000000"
        );
        assert_eq!(coerce_to_string(&Value::Float(1e-7)).unwrap(), "0.0000001");
        assert_eq!(coerce_to_string(&Value::Float(-0.5)).unwrap(), "-0.5");
    }

    #[test]
    fn test_coerce_rejects_other_types() {
        for value in [
            Value::Null,
            Value::Bool(false),
            Value::Sequence(vec![]),
            Value::Mapping(Mapping::new()),
        ] {
            let err = coerce_to_string(&value).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidScalar);
            assert_eq!(err.cause, Some(format!("Got: {}", value.type_name())));
        }
    }

    #[test]
    fn test_require_found() {
        let value = Value::Bool(true);
        assert_eq!(require_found(Some(&value), "foo").unwrap(), &value);

        let err = require_found(None, "baz").unwrap_err();
        assert_eq!(err.kind.to_string(), "Parameter 'baz' not found.");
    }

    #[test]
    fn test_require_env() {
        let env: HashMap<String, String> = [
            ("host".to_string(), "127.0.0.1".to_string()),
            ("empty".to_string(), String::new()),
        ]
        .into();

        assert_eq!(require_env(&env, "host").unwrap(), "127.0.0.1");
        assert_eq!(require_env(&env, "empty").unwrap(), "");

        let err = require_env(&env, "foo").unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::EnvNotDefined {
                var_name: "foo".into()
            }
        );
    }
}
