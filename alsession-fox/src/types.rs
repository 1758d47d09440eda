//! Feature tree data model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the experience every unconfigured feature falls back to
pub const DEFAULT_EXPERIENCE: &str = "default";

/// Available and active experiences of one feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceDescriptor {
    pub available: Vec<String>,
    /// Always a member of `available`; `None` only when `available` is empty
    pub active: Option<String>,
    /// Experience the user should be offered; always a member of `available`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl ExperienceDescriptor {
    /// Single available experience which is also active
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            available: vec![name.clone()],
            active: Some(name),
            prompt: None,
        }
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.available.iter().any(|candidate| candidate == name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.as_deref() == Some(name)
    }
}

impl Default for ExperienceDescriptor {
    fn default() -> Self {
        Self::single(DEFAULT_EXPERIENCE)
    }
}

/// Scalar option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Number(serde_json::Number),
    Text(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Number(value) => value.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Flag(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Number(value.into())
    }
}

/// Option switches of one feature
pub type OptionsMap = BTreeMap<String, OptionValue>;

/// One node of the feature tree
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeatureNode {
    pub xp: ExperienceDescriptor,
    pub options: OptionsMap,
    /// Child features by name, serialized alongside `xp` and `options`
    #[serde(flatten)]
    pub children: BTreeMap<String, FeatureNode>,
}

impl FeatureNode {
    pub fn child(&self, name: &str) -> Option<&FeatureNode> {
        self.children.get(name)
    }

    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// True if the option is present and set to `true`
    pub fn is_enabled(&self, name: &str) -> bool {
        self.option(name)
            .and_then(OptionValue::as_bool)
            .unwrap_or(false)
    }
}
