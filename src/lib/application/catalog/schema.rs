//! Provider-to-model schema translation.
//!
//! Tool servers describe their inputs with JSON Schema decorated for human
//! consumption (`title`, `default`, `$schema`, ...). Function-calling
//! backends only accept a narrow subset, so every parameter schema passes
//! through [`translate`] before it is declared to the model.

use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

/// Keys stripped from property schemas at every depth.
const REJECTED_PROPERTY_KEYS: &[&str] = &[
    "title",
    "default",
    "examples",
    "$schema",
    "$id",
    "additionalProperties",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid schema: expected a JSON object at the top level")]
    NotAnObject,
    #[error("invalid schema: property '{property}' is not a JSON object")]
    InvalidProperty { property: String },
    #[error("invalid schema: 'required' must be a list of property names")]
    InvalidRequired,
    #[error("missing required argument '{argument}'")]
    MissingArgument { argument: String },
    #[error("argument '{argument}' must be of type {expected}")]
    ArgumentType { argument: String, expected: String },
}

/// Converts a provider-form parameter schema into model form.
///
/// Only `type`, `properties` and `required` survive at the top level. The
/// result is always an object schema and translating it again yields the
/// same value.
pub fn translate(provider_schema: &Value) -> Result<Value, SchemaError> {
    let object = provider_schema.as_object().ok_or(SchemaError::NotAnObject)?;

    let mut schema = JsonMap::new();
    schema.insert(
        "type".to_string(),
        object
            .get("type")
            .cloned()
            .unwrap_or_else(|| Value::String("object".to_string())),
    );
    schema.insert(
        "properties".to_string(),
        Value::Object(translate_properties(object.get("properties"))?),
    );
    if let Some(required) = translate_required(object.get("required"))? {
        schema.insert("required".to_string(), required);
    }

    Ok(Value::Object(schema))
}

fn translate_properties(properties: Option<&Value>) -> Result<JsonMap<String, Value>, SchemaError> {
    let Some(properties) = properties else {
        return Ok(JsonMap::new());
    };
    let Some(properties) = properties.as_object() else {
        return Err(SchemaError::InvalidProperty {
            property: "properties".to_string(),
        });
    };

    let mut translated = JsonMap::with_capacity(properties.len());
    for (name, property) in properties {
        let cleaned = translate_property(name, property)?;
        translated.insert(name.clone(), cleaned);
    }
    Ok(translated)
}

fn translate_property(name: &str, property: &Value) -> Result<Value, SchemaError> {
    let object = property.as_object().ok_or_else(|| SchemaError::InvalidProperty {
        property: name.to_string(),
    })?;

    let mut cleaned = JsonMap::with_capacity(object.len());
    for (key, value) in object {
        if REJECTED_PROPERTY_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value = match key.as_str() {
            "properties" => Value::Object(translate_properties(Some(value))?),
            "items" if value.is_object() => translate_property(name, value)?,
            "anyOf" | "oneOf" | "allOf" => translate_branches(name, value)?,
            "required" => match translate_required(Some(value))? {
                Some(required) => required,
                None => continue,
            },
            _ => value.clone(),
        };
        cleaned.insert(key.clone(), value);
    }
    Ok(Value::Object(cleaned))
}

fn translate_branches(name: &str, branches: &Value) -> Result<Value, SchemaError> {
    let Some(branches) = branches.as_array() else {
        return Ok(branches.clone());
    };
    branches
        .iter()
        .map(|branch| match branch {
            Value::Object(_) => translate_property(name, branch),
            other => Ok(other.clone()),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn translate_required(required: Option<&Value>) -> Result<Option<Value>, SchemaError> {
    let Some(required) = required else {
        return Ok(None);
    };
    let names = required.as_array().ok_or(SchemaError::InvalidRequired)?;
    if names.iter().any(|name| !name.is_string()) {
        return Err(SchemaError::InvalidRequired);
    }
    if names.is_empty() {
        return Ok(None);
    }
    Ok(Some(Value::Array(names.clone())))
}

/// Declared primitive kind of a parameter, read from its `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
    Any,
}

impl ParamKind {
    fn from_schema(schema: &Value) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("string") => ParamKind::String,
            Some("integer") => ParamKind::Integer,
            Some("number") => ParamKind::Number,
            Some("boolean") => ParamKind::Boolean,
            Some("array") => ParamKind::Array,
            Some("object") => ParamKind::Object,
            Some("null") => ParamKind::Null,
            _ => ParamKind::Any,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            // Models routinely emit 5.0 for integer parameters.
            ParamKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().map(|n| n.fract() == 0.0).unwrap_or(false)
            }
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Array => value.is_array(),
            ParamKind::Object => value.is_object(),
            ParamKind::Null => value.is_null(),
            ParamKind::Any => true,
        }
    }

    fn label(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
            ParamKind::Null => "null",
            ParamKind::Any => "any",
        }
    }
}

/// Checks call arguments against a model-form schema before dispatch.
///
/// Required arguments must be present and every declared argument must match
/// its primitive type. Undeclared arguments pass through untouched; the tool
/// server remains the authority on anything finer grained.
pub fn validate_arguments(
    schema: &Value,
    arguments: &JsonMap<String, Value>,
) -> Result<(), SchemaError> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !arguments.contains_key(name) {
                return Err(SchemaError::MissingArgument {
                    argument: name.to_string(),
                });
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (name, value) in arguments {
        let Some(property) = properties.get(name) else {
            continue;
        };
        let kind = ParamKind::from_schema(property);
        if !kind.accepts(value) {
            return Err(SchemaError::ArgumentType {
                argument: name.clone(),
                expected: kind.label().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> JsonMap<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn strips_titles_and_keeps_type_semantics() {
        let provider = json!({
            "type": "object",
            "title": "Args",
            "properties": {"path": {"type": "string", "title": "Path"}},
            "required": ["path"]
        });

        let translated = translate(&provider).expect("translates");

        assert_eq!(
            translated,
            json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            })
        );
    }

    #[test]
    fn translation_is_idempotent() {
        let provider = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "title": "delete_directoryArguments",
            "additionalProperties": false,
            "properties": {
                "path": {"type": "string", "title": "Path", "description": "Directory"},
                "recursive": {"type": "boolean", "title": "Recursive", "default": false},
                "options": {
                    "type": "object",
                    "title": "Options",
                    "properties": {"depth": {"type": "integer", "title": "Depth"}},
                    "required": ["depth"]
                },
                "tags": {"type": "array", "items": {"type": "string", "title": "Tag"}}
            },
            "required": ["path"]
        });

        let once = translate(&provider).expect("first pass");
        let twice = translate(&once).expect("second pass");

        assert_eq!(once, twice);
        assert_eq!(once["properties"]["path"]["description"], "Directory");
        assert!(once["properties"]["recursive"].get("default").is_none());
        assert!(once["properties"]["options"]["properties"]["depth"].get("title").is_none());
        assert_eq!(once["properties"]["options"]["required"], json!(["depth"]));
        assert_eq!(once["properties"]["tags"]["items"], json!({"type": "string"}));
        assert!(once.get("additionalProperties").is_none());
    }

    fn schema_shapes() -> Vec<(&'static str, Value)> {
        vec![
            (
                "nested objects",
                json!({
                    "type": "object",
                    "title": "MoveArgs",
                    "properties": {
                        "source": {
                            "type": "object",
                            "title": "Source",
                            "properties": {
                                "path": {"type": "string", "title": "Path"},
                                "meta": {
                                    "type": "object",
                                    "additionalProperties": true,
                                    "properties": {"owner": {"type": "string", "default": "root"}},
                                    "required": ["owner"]
                                }
                            },
                            "required": ["path"]
                        }
                    },
                    "required": ["source"]
                }),
            ),
            (
                "array items",
                json!({
                    "type": "object",
                    "properties": {
                        "tags": {"type": "array", "title": "Tags", "items": {"type": "string", "title": "Tag"}},
                        "points": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "title": "Point",
                                "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
                                "required": ["x", "y"]
                            }
                        }
                    },
                    "required": ["points"]
                }),
            ),
            (
                "empty required",
                json!({
                    "type": "object",
                    "properties": {
                        "verbose": {"type": "boolean", "default": false},
                        "filter": {"type": "object", "properties": {}, "required": []}
                    },
                    "required": []
                }),
            ),
            (
                "type arrays",
                json!({
                    "type": "object",
                    "properties": {
                        "limit": {"type": ["integer", "null"], "title": "Limit"},
                        "ids": {"type": ["array", "null"], "items": {"type": "integer", "examples": [1]}}
                    },
                    "required": ["limit"]
                }),
            ),
            (
                "anyOf properties",
                json!({
                    "$schema": "http://json-schema.org/draft-07/schema#",
                    "properties": {
                        "timeout": {
                            "title": "Timeout",
                            "anyOf": [{"type": "number", "title": "Seconds"}, {"type": "null"}],
                            "default": null
                        },
                        "target": {
                            "oneOf": [
                                {"type": "string", "title": "Url"},
                                {"type": "object", "properties": {"host": {"type": "string", "title": "Host"}}}
                            ]
                        }
                    }
                }),
            ),
        ]
    }

    fn non_empty_required(schema: &Value) -> Option<&Value> {
        schema
            .get("required")
            .filter(|required| required.as_array().is_some_and(|names| !names.is_empty()))
    }

    fn assert_property_preserved(label: &str, name: &str, provider: &Value, cleaned: &Value) {
        let context = format!("{label}: {name}");
        assert_eq!(provider.get("type"), cleaned.get("type"), "{context}");
        assert_eq!(non_empty_required(provider), cleaned.get("required"), "{context}");
        for key in REJECTED_PROPERTY_KEYS {
            assert!(cleaned.get(*key).is_none(), "{context} kept '{key}'");
        }
        if let Some(nested) = provider.get("properties") {
            assert_properties_preserved(label, nested, &cleaned["properties"]);
        }
        if let Some(items) = provider.get("items").filter(|items| items.is_object()) {
            assert_property_preserved(label, name, items, &cleaned["items"]);
        }
        for key in ["anyOf", "oneOf", "allOf"] {
            let Some(branches) = provider.get(key).and_then(Value::as_array) else {
                continue;
            };
            let cleaned_branches = cleaned[key].as_array().expect("branches kept");
            assert_eq!(branches.len(), cleaned_branches.len(), "{context}");
            for (branch, cleaned_branch) in branches.iter().zip(cleaned_branches) {
                assert_property_preserved(label, name, branch, cleaned_branch);
            }
        }
    }

    fn assert_properties_preserved(label: &str, provider: &Value, translated: &Value) {
        let provider = provider.as_object().cloned().unwrap_or_default();
        let translated = translated.as_object().expect("properties object");
        assert_eq!(
            provider.keys().collect::<Vec<_>>(),
            translated.keys().collect::<Vec<_>>(),
            "{label}"
        );
        for (name, property) in &provider {
            assert_property_preserved(label, name, property, &translated[name]);
        }
    }

    #[test]
    fn translation_is_idempotent_across_shapes() {
        for (label, provider) in schema_shapes() {
            let once = translate(&provider).unwrap_or_else(|err| panic!("{label}: {err}"));
            let twice = translate(&once).unwrap_or_else(|err| panic!("{label}: {err}"));
            assert_eq!(once, twice, "{label}");
        }
    }

    #[test]
    fn translation_preserves_required_and_types_across_shapes() {
        for (label, provider) in schema_shapes() {
            let translated = translate(&provider).unwrap_or_else(|err| panic!("{label}: {err}"));

            let expected_type = provider.get("type").cloned().unwrap_or(json!("object"));
            assert_eq!(translated["type"], expected_type, "{label}");
            assert_eq!(non_empty_required(&provider), translated.get("required"), "{label}");
            assert_properties_preserved(label, &provider["properties"], &translated["properties"]);
        }
    }

    #[test]
    fn missing_properties_and_required_yield_empty_object_schema() {
        let translated = translate(&json!({"title": "NoArgs"})).expect("translates");
        assert_eq!(translated, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn leaves_input_untouched() {
        let provider = json!({"type": "object", "title": "Args", "properties": {}});
        let before = provider.clone();
        let _ = translate(&provider).expect("translates");
        assert_eq!(provider, before);
    }

    #[test]
    fn rejects_non_mapping_schema() {
        assert_eq!(translate(&json!(["type"])), Err(SchemaError::NotAnObject));
        assert_eq!(
            translate(&json!({"properties": {"a": true}})),
            Err(SchemaError::InvalidProperty {
                property: "a".into()
            })
        );
        assert_eq!(
            translate(&json!({"required": "a"})),
            Err(SchemaError::InvalidRequired)
        );
    }

    #[test]
    fn validates_required_and_types() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
            "required": ["a", "b"]
        });

        assert!(validate_arguments(&schema, &args(json!({"a": 5, "b": 6}))).is_ok());
        assert!(validate_arguments(&schema, &args(json!({"a": 5.0, "b": 6}))).is_ok());
        assert_eq!(
            validate_arguments(&schema, &args(json!({"a": 5}))),
            Err(SchemaError::MissingArgument {
                argument: "b".into()
            })
        );
        assert_eq!(
            validate_arguments(&schema, &args(json!({"a": "five", "b": 6}))),
            Err(SchemaError::ArgumentType {
                argument: "a".into(),
                expected: "integer".into()
            })
        );
    }
}
