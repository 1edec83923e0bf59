//! Per-parameter value transforms applied after renaming.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expression::eval::number_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueTransform {
    /// `true` -> `"1"`, `false` -> `"0"`.
    BooleanToString,
    /// `"1"`/`"true"` -> `true`, `"0"`/`"false"` -> `false`, case-insensitive.
    StringToBoolean,
    UpperCase,
    LowerCase,
    StringToNumber,
}

impl ValueTransform {
    /// Values of any other type, and expression strings, pass through unchanged.
    pub fn apply(&self, value: Value) -> Value {
        if let Value::String(s) = &value {
            if crate::expression::contains_expression(s) {
                return value;
            }
        }
        match (self, value) {
            (ValueTransform::BooleanToString, Value::Bool(b)) => {
                Value::String(if b { "1" } else { "0" }.to_string())
            }
            (ValueTransform::StringToBoolean, Value::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" => Value::Bool(true),
                    "0" | "false" => Value::Bool(false),
                    _ => Value::String(s),
                }
            }
            (ValueTransform::UpperCase, Value::String(s)) => Value::String(s.to_uppercase()),
            (ValueTransform::LowerCase, Value::String(s)) => Value::String(s.to_lowercase()),
            (ValueTransform::StringToNumber, Value::String(s)) => {
                match s.trim().parse::<f64>().ok().and_then(number_value) {
                    Some(n) => n,
                    None => Value::String(s),
                }
            }
            (_, other) => other,
        }
    }

    /// Transform undoing this one on the way back, where one exists.
    pub fn inverse(&self) -> Option<ValueTransform> {
        match self {
            ValueTransform::BooleanToString => Some(ValueTransform::StringToBoolean),
            ValueTransform::StringToBoolean => Some(ValueTransform::BooleanToString),
            ValueTransform::UpperCase | ValueTransform::LowerCase | ValueTransform::StringToNumber => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn booleans_become_flags() {
        assert_eq!(ValueTransform::BooleanToString.apply(json!(true)), json!("1"));
        assert_eq!(ValueTransform::BooleanToString.apply(json!(false)), json!("0"));
        assert_eq!(ValueTransform::BooleanToString.apply(json!("yes")), json!("yes"));
    }

    #[test]
    fn flags_become_booleans() {
        for (input, expected) in [("1", true), ("TRUE", true), ("0", false), ("False", false)] {
            assert_eq!(ValueTransform::StringToBoolean.apply(json!(input)), json!(expected));
        }
        assert_eq!(ValueTransform::StringToBoolean.apply(json!("maybe")), json!("maybe"));
        assert_eq!(ValueTransform::StringToBoolean.apply(json!(1)), json!(1));
    }

    #[test]
    fn expressions_are_never_transformed() {
        assert_eq!(
            ValueTransform::UpperCase.apply(json!("{{1.method}}")),
            json!("{{1.method}}")
        );
        assert_eq!(ValueTransform::UpperCase.apply(json!("post")), json!("POST"));
    }

    #[test]
    fn numbers_from_strings() {
        assert_eq!(ValueTransform::StringToNumber.apply(json!(" 30 ")), json!(30));
        assert_eq!(ValueTransform::StringToNumber.apply(json!("2.5")), json!(2.5));
        assert_eq!(ValueTransform::StringToNumber.apply(json!("n/a")), json!("n/a"));
    }

    #[test]
    fn serialized_names() {
        assert_eq!(
            serde_json::to_value(ValueTransform::BooleanToString).unwrap(),
            json!("booleanToString")
        );
    }
}
