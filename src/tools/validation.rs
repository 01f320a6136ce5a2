//! Schema checks: well-formedness at registration, argument validity at dispatch.

use serde_json::Value;

/// Check that a parameter schema is usable for a tool.
///
/// The schema must be a JSON object. When it declares `properties` that must
/// be an object, and every name listed in `required` must be declared there.
pub fn check_schema(schema: &Value) -> Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| format!("schema must be a JSON object, got {}", json_type_name(schema)))?;

    if let Some(schema_type) = obj.get("type").and_then(Value::as_str) {
        if schema_type != "object" {
            return Err(format!("schema type must be 'object', got '{schema_type}'"));
        }
    }

    let properties = match obj.get("properties") {
        None => None,
        Some(Value::Object(props)) => Some(props),
        Some(other) => {
            return Err(format!(
                "'properties' must be an object, got {}",
                json_type_name(other)
            ))
        }
    };

    match obj.get("required") {
        None => {}
        Some(Value::Array(required)) => {
            for field in required {
                let name = field
                    .as_str()
                    .ok_or_else(|| "'required' entries must be strings".to_string())?;
                if !properties.is_some_and(|props| props.contains_key(name)) {
                    return Err(format!("required field '{name}' is not a declared property"));
                }
            }
        }
        Some(other) => {
            return Err(format!(
                "'required' must be an array, got {}",
                json_type_name(other)
            ))
        }
    }

    Ok(())
}

/// Validate tool arguments against a JSON Schema.
///
/// Top-level validation only: object shape, required field presence,
/// property types, and undeclared fields when the schema sets
/// `additionalProperties: false`. Returns the first violation found.
pub fn validate_arguments(args: &Value, schema: &Value) -> Result<(), String> {
    if let Some(schema_type) = schema.get("type").and_then(Value::as_str) {
        if schema_type == "object" && !args.is_object() {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            ));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(format!("missing required field '{name}'"));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (key, value) in obj {
        match properties.and_then(|props| props.get(key)) {
            Some(prop_schema) => {
                if let Some(expected) = prop_schema.get("type").and_then(Value::as_str) {
                    if !value_matches_type(value, expected) {
                        return Err(format!(
                            "field '{}' expected type '{}', got {}",
                            key,
                            expected,
                            json_type_name(value)
                        ));
                    }
                }
            }
            None if closed => return Err(format!("unexpected field '{key}'")),
            None => {}
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
