//! Recursive descent over raw feature data
//!
//! Raw data comes in three shapes: a shorthand scalar (string or boolean)
//! standing for an experience, an object whose keys are `xp`, `options` or
//! child feature names, or anything else, which is rejected.

use crate::error::{FoxError, FoxResult};
use crate::types::{ExperienceDescriptor, FeatureNode, OptionValue, OptionsMap};
use serde_json::{Map, Value};
use tracing::debug;

const XP_KEY: &str = "xp";
const OPTIONS_KEY: &str = "options";

/// What a key of a feature object stands for
enum NodeEntry<'a> {
    Experience(&'a Value),
    Options(&'a Value),
    Child(&'a str, &'a Value),
}

impl<'a> NodeEntry<'a> {
    fn classify(key: &'a str, value: &'a Value) -> Self {
        match key {
            XP_KEY => NodeEntry::Experience(value),
            OPTIONS_KEY => NodeEntry::Options(value),
            _ => NodeEntry::Child(key, value),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

/// Parse a feature node. `path` is only used for error reporting.
pub fn parse_feature_node(raw: &Value, path: &str) -> FoxResult<FeatureNode> {
    let mut node = FeatureNode::default();
    match raw {
        Value::String(_) | Value::Bool(_) => {
            node.xp = parse_experience(raw, path)?;
        }
        Value::Object(entries) => {
            for (key, value) in entries {
                match NodeEntry::classify(key, value) {
                    NodeEntry::Experience(value) => {
                        node.xp = parse_experience(value, path)?;
                    }
                    NodeEntry::Options(value) => {
                        node.options = parse_options(value, path);
                    }
                    NodeEntry::Child(name, value) => {
                        let child = parse_feature_node(value, &child_path(path, name))?;
                        node.children.insert(name.to_string(), child);
                    }
                }
            }
        }
        other => {
            return Err(FoxError::NotAnObject {
                path: path.to_string(),
                found: kind_of(other),
            });
        }
    }
    Ok(node)
}

/// Parse an experience descriptor, applying the normalization rules:
/// `active` must be one of `available` (else the first available, or none),
/// and `prompt` is dropped unless it is available.
pub fn parse_experience(raw: &Value, path: &str) -> FoxResult<ExperienceDescriptor> {
    match raw {
        Value::String(name) => Ok(ExperienceDescriptor::single(name.as_str())),
        Value::Bool(_) => Ok(ExperienceDescriptor::default()),
        Value::Object(fields) => parse_experience_fields(fields, path),
        other => Err(FoxError::InvalidExperience {
            path: path.to_string(),
            reason: format!("expected object, string or boolean, found {}", kind_of(other)),
        }),
    }
}

fn parse_experience_fields(fields: &Map<String, Value>, path: &str) -> FoxResult<ExperienceDescriptor> {
    let available = match fields.get("available") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(name.clone()),
                other => Err(FoxError::InvalidExperience {
                    path: path.to_string(),
                    reason: format!("'available' entries must be strings, found {}", kind_of(other)),
                }),
            })
            .collect::<FoxResult<Vec<_>>>()?,
        Some(other) => {
            return Err(FoxError::InvalidExperience {
                path: path.to_string(),
                reason: format!("'available' must be an array, found {}", kind_of(other)),
            });
        }
    };

    let member = |key: &str| -> Option<String> {
        fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|name| available.iter().any(|candidate| candidate == name))
            .map(str::to_string)
    };

    let active = member("active").or_else(|| available.first().cloned());
    let prompt = member("prompt");

    Ok(ExperienceDescriptor {
        available,
        active,
        prompt,
    })
}

/// Options pass through when given an object; anything else yields an empty
/// map. Only scalar values are kept.
pub fn parse_options(raw: &Value, path: &str) -> OptionsMap {
    let Value::Object(entries) = raw else {
        return OptionsMap::new();
    };

    let mut options = OptionsMap::new();
    for (key, value) in entries {
        let option = match value {
            Value::Bool(flag) => OptionValue::Flag(*flag),
            Value::Number(number) => OptionValue::Number(number.clone()),
            Value::String(text) => OptionValue::Text(text.clone()),
            other => {
                debug!(
                    feature = path,
                    option = key.as_str(),
                    kind = kind_of(other),
                    "Dropping non-scalar feature option"
                );
                continue;
            }
        };
        options.insert(key.clone(), option);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_active_forced_to_first_available() {
        let xp = parse_experience(
            &json!({ "available": ["a", "b"], "active": "zzz" }),
            "feature",
        )
        .unwrap();
        assert_eq!(xp.active.as_deref(), Some("a"));

        let xp = parse_experience(&json!({ "available": ["a", "b"], "active": null }), "").unwrap();
        assert_eq!(xp.active.as_deref(), Some("a"));

        let xp = parse_experience(&json!({ "available": ["a", "b"], "active": "b" }), "").unwrap();
        assert_eq!(xp.active.as_deref(), Some("b"));
    }

    #[test]
    fn test_empty_available_has_no_active() {
        let xp = parse_experience(&json!({ "active": "anything" }), "").unwrap();
        assert!(xp.available.is_empty());
        assert_eq!(xp.active, None);
        assert_eq!(xp.prompt, None);
    }

    #[test]
    fn test_prompt_kept_only_when_available() {
        let xp = parse_experience(
            &json!({ "available": ["x", "y"], "prompt": "y" }),
            "",
        )
        .unwrap();
        assert_eq!(xp.prompt.as_deref(), Some("y"));

        let xp = parse_experience(
            &json!({ "available": ["x", "y"], "prompt": "something" }),
            "",
        )
        .unwrap();
        assert_eq!(xp.prompt, None);
    }

    #[test]
    fn test_shorthand_experiences() {
        assert_eq!(
            parse_experience(&json!("override"), "").unwrap(),
            ExperienceDescriptor::single("override")
        );
        assert_eq!(
            parse_experience(&json!(false), "").unwrap(),
            ExperienceDescriptor::default()
        );
    }

    #[test]
    fn test_invalid_experience_shapes() {
        for raw in [json!(["not valid"]), json!(null), json!(3)] {
            assert!(matches!(
                parse_experience(&raw, "child"),
                Err(FoxError::InvalidExperience { .. })
            ));
        }
        assert!(parse_experience(&json!({ "available": "a" }), "").is_err());
        assert!(parse_experience(&json!({ "available": ["a", 1] }), "").is_err());
    }

    #[test]
    fn test_non_object_options_become_empty() {
        assert!(parse_options(&json!(true), "").is_empty());
        assert!(parse_options(&json!("yes"), "").is_empty());
        assert!(parse_options(&json!([1, 2]), "").is_empty());
    }

    #[test]
    fn test_options_keep_scalars() {
        let options = parse_options(
            &json!({ "limit": 5, "label": "gold", "enabled": true, "nested": { "a": 1 } }),
            "",
        );
        assert_eq!(options.len(), 3);
        assert_eq!(options["limit"].as_f64(), Some(5.0));
        assert_eq!(options["label"].as_str(), Some("gold"));
        assert_eq!(options["enabled"].as_bool(), Some(true));
    }

    #[test]
    fn test_error_carries_nested_path() {
        let err = parse_feature_node(&json!({ "a": { "b": { "c": [1] } } }), "").unwrap_err();
        assert_eq!(err.path(), "a.b.c");
        assert!(matches!(err, FoxError::NotAnObject { found: "array", .. }));
    }
}
