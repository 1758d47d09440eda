//! FOX: features, options and experiences
//!
//! Feature availability for an account is described as a tree. Every node
//! carries an experience descriptor (`xp`), an options map and any number of
//! named child features. [`FoxSnapshot`] parses raw JSON into that tree and
//! answers path lookups; lookups never fail, unconfigured paths yield the
//! default node.

pub mod error;
pub mod parser;
pub mod snapshot;
pub mod types;

pub use error::{FoxError, FoxResult};
pub use parser::{parse_experience, parse_feature_node, parse_options};
pub use snapshot::{FeaturePath, FoxSnapshot};
pub use types::*;
