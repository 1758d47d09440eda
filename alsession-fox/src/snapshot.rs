//! Parsed feature tree with total path lookups

use crate::error::FoxResult;
use crate::parser::parse_feature_node;
use crate::types::{ExperienceDescriptor, FeatureNode, OptionsMap};
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

static DEFAULT_NODE: LazyLock<FeatureNode> = LazyLock::new(FeatureNode::default);

/// Something that names a feature: a dotted string or pre-split segments.
/// An empty path names the root.
pub trait FeaturePath {
    fn segments(&self) -> Vec<&str>;
}

impl FeaturePath for str {
    fn segments(&self) -> Vec<&str> {
        if self.is_empty() {
            Vec::new()
        } else {
            self.split('.').collect()
        }
    }
}

impl FeaturePath for String {
    fn segments(&self) -> Vec<&str> {
        self.as_str().segments()
    }
}

impl FeaturePath for [&str] {
    fn segments(&self) -> Vec<&str> {
        self.to_vec()
    }
}

impl<const N: usize> FeaturePath for [&str; N] {
    fn segments(&self) -> Vec<&str> {
        self.to_vec()
    }
}

impl FeaturePath for [String] {
    fn segments(&self) -> Vec<&str> {
        self.iter().map(String::as_str).collect()
    }
}

impl FeaturePath for Vec<String> {
    fn segments(&self) -> Vec<&str> {
        self.as_slice().segments()
    }
}

/// Feature tree of one account
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FoxSnapshot {
    root: FeatureNode,
}

impl FoxSnapshot {
    /// Parse raw feature data. `null` yields an unconfigured tree; any other
    /// non-object, non-shorthand value is rejected.
    pub fn new(raw: &Value) -> FoxResult<Self> {
        let root = match raw {
            Value::Null => FeatureNode::default(),
            raw => parse_feature_node(raw, "")?,
        };
        Ok(Self { root })
    }

    pub fn from_root(root: FeatureNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &FeatureNode {
        &self.root
    }

    /// Feature at `path`, or the default node if any segment is missing
    pub fn get_feature<P: FeaturePath + ?Sized>(&self, path: &P) -> &FeatureNode {
        path.segments()
            .into_iter()
            .try_fold(&self.root, |node, segment| node.child(segment))
            .unwrap_or(&DEFAULT_NODE)
    }

    pub fn get_feature_experience<P: FeaturePath + ?Sized>(&self, path: &P) -> &ExperienceDescriptor {
        &self.get_feature(path).xp
    }

    pub fn get_feature_options<P: FeaturePath + ?Sized>(&self, path: &P) -> &OptionsMap {
        &self.get_feature(path).options
    }
}
