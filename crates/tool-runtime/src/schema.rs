//! Argument validation against a tool's JSON Schema.
//!
//! Only the subset the tools declare is enforced: the top level must be an
//! object, `required` properties must be present and non-null, and declared
//! properties must match their primitive `type`. Undeclared properties are
//! passed through.

use serde_json::{Map, Value};

use crate::tool::ToolError;

/// Validate `args` against `schema` and return the argument object.
///
/// Absent or `null` arguments are treated as `{}`.
pub fn validate_arguments(schema: &Value, args: Option<Value>) -> Result<Map<String, Value>, ToolError> {
    let args = match args {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ToolError::InvalidArgument {
                name: "arguments".into(),
                expected: "object".into(),
            })
        }
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if args.get(name).map_or(true, Value::is_null) {
                return Err(ToolError::MissingArgument(name.to_string()));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, value) in &args {
            if value.is_null() {
                continue;
            }
            let Some(expected) = properties
                .get(name)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !matches_type(expected, value) {
                return Err(ToolError::InvalidArgument {
                    name: name.clone(),
                    expected: expected.to_string(),
                });
            }
        }
    }

    Ok(args)
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

// ── Argument accessors ───────────────────────────────────────────

/// A string argument that validation guaranteed to be present.
pub fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
}

/// An optional string argument. Empty strings count as absent.
pub fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
